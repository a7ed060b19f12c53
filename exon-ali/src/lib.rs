//! # exon-ali
//!
//! Crude-to-fine alignment of cDNA (or genomic) probes against a genome
//! stored 2 bits per base.
//!
//! - **Genome store**: one `.nt4` file per chromosome, unpacked on demand
//! - **Crude search**: exact 16-mer tile hits, lumped into exons and genes
//! - **Fine alignment**: banded Smith-Waterman per exon, stitched and
//!   scored the cDNA way
//! - **Batch drivers**: named, listed, all, starting-at and resumable runs
//!   writing an append-only report
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use exon_ali::align::{align_probe, AlignOpt};
//! use exon_ali::index::nt4;
//! use exon_ali::io::report::ConsoleReport;
//!
//! let genomes = nt4::load_dir("nt4").unwrap();
//! let mut sink = ConsoleReport::console();
//! let probe = b"ACGTTGCAAGGCTTACGATCGGATCCATGCAAGTTCGATCGG";
//! let n = align_probe("probe1", probe, &genomes, &AlignOpt::default(), &mut sink).unwrap();
//! println!("{} alignments", n);
//! ```
//!
//! ## Modules
//!
//! - [`io`]: FASTA probes and the report sink
//! - [`index`]: `.nt4` genome store and the probe tile hash
//! - [`align`]: scan, lump, filter, fine alignment, per-probe driver
//! - [`batch`]: multi-probe drivers
//! - [`util`]: DNA packing, reverse complement and friends

pub mod align;
pub mod batch;
pub mod index;
pub mod io;
pub mod util;
