use std::fmt::Write as _;

const NEG_INF: i32 = i32::MIN / 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwParams {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    /// Half-width of the band around the expected diagonal.
    pub band_width: usize,
}

impl Default for SwParams {
    fn default() -> Self {
        Self { match_score: 2, mismatch_penalty: 3, gap_open: 5, gap_extend: 2, band_width: 16 }
    }
}

/// Local alignment of `query[query_start..query_end]` against
/// `reference[ref_start..ref_end]`. `ops` holds one `M`, `I` or `D` per
/// column, `I` consuming query only and `D` reference only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwResult {
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub ref_start: usize,
    pub ref_end: usize,
    pub ops: Vec<u8>,
    pub nm: u32,
}

impl SwResult {
    fn empty() -> Self {
        Self { score: 0, query_start: 0, query_end: 0, ref_start: 0, ref_end: 0, ops: Vec::new(), nm: 0 }
    }

    pub fn cigar(&self) -> String {
        ops_to_cigar(&self.ops)
    }
}

/// Banded affine-gap local alignment around the main diagonal.
pub fn banded_sw(query: &[u8], reference: &[u8], p: SwParams) -> SwResult {
    banded_sw_diag(query, reference, 0, p, &mut SwBuffer::new())
}

/// DP scratch space reused across calls; only cells inside the band are kept.
#[derive(Debug, Default)]
pub struct SwBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
}

impl SwBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, size: usize) {
        self.h.clear();
        self.e.clear();
        self.f.clear();
        self.h.resize(size, 0);
        self.e.resize(size, NEG_INF);
        self.f.resize(size, NEG_INF);
    }
}

/// Row-major band storage: row `i` keeps columns
/// `i + lo ..= i + lo + width - 1`.
struct Band {
    lo: isize,
    width: usize,
}

impl Band {
    #[inline]
    fn cell(&self, i: usize, j: usize) -> Option<usize> {
        let k = j as isize - i as isize - self.lo;
        if k < 0 || k >= self.width as isize {
            None
        } else {
            Some(i * self.width + k as usize)
        }
    }
}

#[inline]
fn subst(q: u8, r: u8, p: &SwParams) -> i32 {
    if q == r && q != b'N' {
        p.match_score
    } else {
        -p.mismatch_penalty
    }
}

#[derive(Clone, Copy)]
enum State {
    H,
    E,
    F,
}

/// Banded local alignment with the band centred on `ref_index - query_index
/// == center`.
pub fn banded_sw_diag(
    query: &[u8],
    reference: &[u8],
    center: isize,
    p: SwParams,
    buf: &mut SwBuffer,
) -> SwResult {
    let m = query.len();
    let n = reference.len();
    if m == 0 || n == 0 {
        return SwResult::empty();
    }

    let band = Band { lo: center - p.band_width as isize, width: 2 * p.band_width + 1 };
    buf.reset((m + 1) * band.width);
    let open = p.gap_open + p.gap_extend;

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=m {
        let j_lo = (i as isize + band.lo).max(1);
        let j_hi = (i as isize + band.lo + band.width as isize - 1).min(n as isize);
        if j_lo > j_hi {
            continue;
        }
        for j in j_lo as usize..=j_hi as usize {
            let Some(c) = band.cell(i, j) else { continue };

            let (up_h, up_e) = band.cell(i - 1, j).map_or((0, NEG_INF), |u| (buf.h[u], buf.e[u]));
            let e = (up_h - open).max(up_e - p.gap_extend);

            let (left_h, left_f) = band.cell(i, j - 1).map_or((0, NEG_INF), |l| (buf.h[l], buf.f[l]));
            let f = (left_h - open).max(left_f - p.gap_extend);

            let diag_h = band.cell(i - 1, j - 1).map_or(0, |d| buf.h[d]);
            let val = (diag_h + subst(query[i - 1], reference[j - 1], &p)).max(e).max(f).max(0);

            buf.h[c] = val;
            buf.e[c] = e;
            buf.f[c] = f;

            if val > best_score {
                best_score = val;
                best_i = i;
                best_j = j;
            }
        }
    }

    if best_score <= 0 {
        return SwResult::empty();
    }

    let h_at = |i: usize, j: usize| band.cell(i, j).map_or(0, |c| buf.h[c]);
    let e_at = |i: usize, j: usize| band.cell(i, j).map_or(NEG_INF, |c| buf.e[c]);
    let f_at = |i: usize, j: usize| band.cell(i, j).map_or(NEG_INF, |c| buf.f[c]);

    // backtrack from best cell, following gap states so long gaps come out whole
    let mut ops: Vec<u8> = Vec::new();
    let mut i = best_i;
    let mut j = best_j;
    let mut state = State::H;
    while i > 0 && j > 0 {
        match state {
            State::H => {
                let h_here = h_at(i, j);
                if h_here == 0 {
                    break;
                }
                if h_here == h_at(i - 1, j - 1) + subst(query[i - 1], reference[j - 1], &p) {
                    ops.push(b'M');
                    i -= 1;
                    j -= 1;
                } else if h_here == e_at(i, j) {
                    state = State::E;
                } else if h_here == f_at(i, j) {
                    state = State::F;
                } else {
                    break;
                }
            }
            State::E => {
                ops.push(b'I');
                if e_at(i, j) == h_at(i - 1, j) - open {
                    state = State::H;
                }
                i -= 1;
            }
            State::F => {
                ops.push(b'D');
                if f_at(i, j) == h_at(i, j - 1) - open {
                    state = State::H;
                }
                j -= 1;
            }
        }
    }
    // a gap never starts a local alignment
    while matches!(ops.last(), Some(b'I' | b'D')) {
        match ops.pop() {
            Some(b'I') => i += 1,
            _ => j += 1,
        }
    }
    ops.reverse();

    let query_start = i;
    let ref_start = j;
    let mut nm = 0u32;
    let (mut qi, mut rj) = (query_start, ref_start);
    for &op in &ops {
        match op {
            b'M' => {
                if query[qi] != reference[rj] {
                    nm += 1;
                }
                qi += 1;
                rj += 1;
            }
            b'I' => {
                nm += 1;
                qi += 1;
            }
            _ => {
                nm += 1;
                rj += 1;
            }
        }
    }

    SwResult { score: best_score, query_start, query_end: best_i, ref_start, ref_end: best_j, ops, nm }
}

pub fn ops_to_cigar(ops: &[u8]) -> String {
    let mut cigar = String::new();
    let Some(&first) = ops.first() else { return cigar };
    let mut cur = first;
    let mut len = 1usize;
    for &op in &ops[1..] {
        if op == cur {
            len += 1;
        } else {
            let _ = write!(&mut cigar, "{}{}", len, cur as char);
            cur = op;
            len = 1;
        }
    }
    let _ = write!(&mut cigar, "{}{}", len, cur as char);
    cigar
}
