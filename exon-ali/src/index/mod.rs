pub mod nt4;
pub mod tile;
