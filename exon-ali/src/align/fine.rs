//! Base-level refinement of a crude gene.
//!
//! The gene's crude exons anchor banded Smith-Waterman runs inside a padded
//! genomic window; the resulting blocks are stitched into one spliced
//! alignment and scored the cDNA way (matches minus mismatches minus
//! log-sized gap penalties), so a perfect hit scores the probe length.

use anyhow::Result;

use super::lump::{CrudeExon, CrudeGene};
use super::sw::{banded_sw_diag, ops_to_cigar, SwBuffer, SwParams};
use crate::index::nt4::PackedGenome;
use crate::util::dna;

/// Bases of genome added on each side of a crude gene before refining it.
pub const DEFAULT_FLANK: usize = 250;
/// A block needs at least this many net matches worth of SW score.
const MIN_BLOCK_MATCHES: i32 = 12;

/// One gapped piece of a fine alignment, in absolute coordinates
/// (probe coordinates are on the strand that was aligned).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliBlock {
    pub probe_start: usize,
    pub probe_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub ops: Vec<u8>,
}

impl AliBlock {
    /// Drop leading columns until the block starts at or after both minimums
    /// on a match column. Returns false if nothing is left.
    fn trim_front(&mut self, probe_min: usize, target_min: usize) -> bool {
        let mut k = 0;
        while k < self.ops.len()
            && (self.probe_start < probe_min || self.target_start < target_min || self.ops[k] != b'M')
        {
            match self.ops[k] {
                b'M' => {
                    self.probe_start += 1;
                    self.target_start += 1;
                }
                b'I' => self.probe_start += 1,
                _ => self.target_start += 1,
            }
            k += 1;
        }
        self.ops.drain(..k);
        !self.ops.is_empty()
    }

    pub fn cigar(&self) -> String {
        ops_to_cigar(&self.ops)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineAlignment {
    pub blocks: Vec<AliBlock>,
    pub score: i32,
    pub probe_start: usize,
    pub probe_end: usize,
    pub target_start: usize,
    pub target_end: usize,
}

impl FineAlignment {
    /// Score as a percentage of a perfect score for a probe of `probe_len`.
    pub fn percent_of(&self, probe_len: usize) -> f64 {
        if probe_len == 0 {
            return 0.0;
        }
        self.score as f64 * 100.0 / probe_len as f64
    }
}

/// Number of binary digits needed for `x`; zero for `x <= 0`.
pub fn digits_base_two(x: i64) -> i64 {
    if x <= 0 {
        return 0;
    }
    64 - x.leading_zeros() as i64
}

/// Penalty for a gap of `h_gap` genome and `n_gap` probe bases.
///
/// Roughly logarithmic in the gap, so introns cost little, with surcharges
/// for introns past 100kb and for jumping backwards.
pub fn cdna_gap_penalty(mut h_gap: i64, mut n_gap: i64) -> i64 {
    let mut acc = 2;
    if h_gap > 100_000 {
        acc += (h_gap - 100_000) / 3000;
        if h_gap > 500_000 {
            acc += (h_gap - 500_000) / 2000;
        }
    }
    if h_gap < 0 {
        h_gap *= -8;
        if h_gap > 48 {
            h_gap *= h_gap;
        }
    }
    if n_gap < 0 {
        acc -= n_gap;
        n_gap = 0;
    }
    acc + digits_base_two(h_gap + n_gap)
}

/// cDNA score of stitched blocks; `hay` starts at genome position `hay_start`.
fn score_blocks(blocks: &[AliBlock], needle: &[u8], hay: &[u8], hay_start: usize) -> i32 {
    let mut score: i64 = 0;
    let mut prev: Option<&AliBlock> = None;
    for b in blocks {
        if let Some(pb) = prev {
            let h_gap = b.target_start as i64 - pb.target_end as i64;
            let n_gap = b.probe_start as i64 - pb.probe_end as i64;
            if h_gap != 0 || n_gap != 0 {
                score -= cdna_gap_penalty(h_gap, n_gap);
            }
        }
        let (mut p, mut t) = (b.probe_start, b.target_start - hay_start);
        let (mut run_h, mut run_n) = (0i64, 0i64);
        for &op in &b.ops {
            if op == b'M' {
                if run_h + run_n > 0 {
                    score -= cdna_gap_penalty(run_h, run_n);
                    run_h = 0;
                    run_n = 0;
                }
                let (nb, hb) = (needle[p], hay[t]);
                if nb == b'N' || hb == b'N' {
                    // neither helps nor hurts
                } else if nb == hb {
                    score += 1;
                } else {
                    score -= 1;
                }
                p += 1;
                t += 1;
            } else if op == b'I' {
                run_n += 1;
                p += 1;
            } else {
                run_h += 1;
                t += 1;
            }
        }
        prev = Some(b);
    }
    score as i32
}

/// Refine `gene` into a base-level alignment of `probe` (given on the
/// forward strand) against `genome`. `None` when nothing usable aligns.
pub fn find_fine_alignment(
    probe: &[u8],
    gene: &CrudeGene,
    genome: &PackedGenome,
    flank: usize,
    sw: SwParams,
    buf: &mut SwBuffer,
) -> Result<Option<FineAlignment>> {
    let win_start = (gene.target_start as usize).saturating_sub(flank);
    let win_end = (gene.target_end as usize + flank).min(genome.base_count);
    if win_end <= win_start || probe.is_empty() {
        return Ok(None);
    }
    let hay = genome.unpack(win_start, win_end - win_start)?;

    let rc_probe;
    let needle: &[u8] = if gene.is_rc {
        rc_probe = dna::revcomp(probe);
        &rc_probe
    } else {
        probe
    };

    let mut anchors: Vec<CrudeExon> = gene.exons.clone();
    anchors.sort_unstable_by_key(|e| (e.probe_start, e.target_start));
    anchors.retain(|e| (e.probe_end as usize) <= needle.len() && (e.target_end as usize) <= win_end);

    let pad = sw.band_width as i64;
    let mut blocks: Vec<AliBlock> = Vec::with_capacity(anchors.len());
    for (ix, a) in anchors.iter().enumerate() {
        let (a_ps, a_pe) = (a.probe_start as usize, a.probe_end as usize);
        let p_lo = if ix > 0 { (anchors[ix - 1].probe_end as usize).min(a_ps) } else { 0 };
        let p_hi = anchors
            .get(ix + 1)
            .map_or(needle.len(), |n| n.probe_start as usize)
            .clamp(a_pe, needle.len());

        let t_lo = (a.target_start as i64 - (a_ps - p_lo) as i64 - pad).max(win_start as i64) as usize;
        let t_hi = (a.target_end as i64 + (p_hi - a_pe) as i64 + pad).min(win_end as i64) as usize;
        if t_hi <= t_lo {
            continue;
        }
        let center = (a.target_start as usize - t_lo) as isize - (a_ps - p_lo) as isize;

        let query = &needle[p_lo..p_hi];
        let reference = &hay[t_lo - win_start..t_hi - win_start];
        let res = banded_sw_diag(query, reference, center, sw, buf);
        if res.score < MIN_BLOCK_MATCHES * sw.match_score {
            continue;
        }
        blocks.push(AliBlock {
            probe_start: p_lo + res.query_start,
            probe_end: p_lo + res.query_end,
            target_start: t_lo + res.ref_start,
            target_end: t_lo + res.ref_end,
            ops: res.ops,
        });
    }

    blocks.sort_by_key(|b| (b.probe_start, b.target_start));
    let mut stitched: Vec<AliBlock> = Vec::with_capacity(blocks.len());
    for mut b in blocks {
        let keep = match stitched.last() {
            Some(prev) => b.trim_front(prev.probe_end, prev.target_end),
            None => !b.ops.is_empty(),
        };
        if keep {
            stitched.push(b);
        }
    }
    let (Some(first), Some(last)) = (stitched.first(), stitched.last()) else {
        return Ok(None);
    };

    let score = score_blocks(&stitched, needle, &hay, win_start);
    if score <= 0 {
        return Ok(None);
    }
    Ok(Some(FineAlignment {
        probe_start: first.probe_start,
        probe_end: last.probe_end,
        target_start: stitched.iter().map(|b| b.target_start).min().unwrap_or(first.target_start),
        target_end: stitched.iter().map(|b| b.target_end).max().unwrap_or(last.target_end),
        score,
        blocks: stitched,
    }))
}
