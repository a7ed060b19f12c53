//! Base codes and 2-bit packing shared by the genome store and the tile index.

/// Bases per packed 32-bit word, which is also the tile size.
pub const TILE_SIZE: usize = 16;
/// `log2(TILE_SIZE)`.
pub const TILE_SHIFT: usize = 4;

pub const T_BASE_VAL: u8 = 0;
pub const C_BASE_VAL: u8 = 1;
pub const A_BASE_VAL: u8 = 2;
pub const G_BASE_VAL: u8 = 3;

/// 2-bit code of an unambiguous base, `None` for N and anything else.
#[inline]
pub fn nt_val(b: u8) -> Option<u8> {
    match b.to_ascii_uppercase() {
        b'T' | b'U' => Some(T_BASE_VAL),
        b'C' => Some(C_BASE_VAL),
        b'A' => Some(A_BASE_VAL),
        b'G' => Some(G_BASE_VAL),
        _ => None,
    }
}

/// Like [`nt_val`] but ambiguous bases pack as T.
#[inline]
pub fn nt_val_no_n(b: u8) -> u8 {
    nt_val(b).unwrap_or(T_BASE_VAL)
}

#[inline]
pub fn val_to_nt(v: u8) -> u8 {
    match v & 0x3 {
        T_BASE_VAL => b'T',
        C_BASE_VAL => b'C',
        A_BASE_VAL => b'A',
        _ => b'G',
    }
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq {
        let up = b.to_ascii_uppercase();
        let nb = match up {
            b'A' | b'C' | b'G' | b'T' | b'N' => up,
            b'U' => b'T',
            _ => b'N',
        };
        out.push(nb);
    }
    out
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        out.push(complement(b));
    }
    out
}

/// Pack up to 16 bases into a word, first base in the top two bits.
/// Shorter input is left-aligned with the tail bits zero.
#[inline]
pub fn pack_dna16(dna: &[u8]) -> u32 {
    let mut out = 0u32;
    for i in 0..TILE_SIZE {
        out <<= 2;
        if let Some(&b) = dna.get(i) {
            out |= nt_val_no_n(b) as u32;
        }
    }
    out
}

/// Append bases `from..to` (word-relative, `to <= 16`) of a packed word.
#[inline]
pub fn unpack_word_into(word: u32, from: usize, to: usize, out: &mut Vec<u8>) {
    for i in from..to {
        let shift = 2 * (TILE_SIZE - 1 - i);
        out.push(val_to_nt((word >> shift) as u8));
    }
}
