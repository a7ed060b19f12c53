use super::scan::CrudeHit;
use crate::util::dna::TILE_SIZE;

/// Hits within this many bases of each other's diagonal share an exon.
const DIAG_SLOP: i64 = 2;
/// How far past the current exon end the next hit may start.
const HIT_GAP: i64 = 48;
/// Overlap allowed between consecutive exons of a gene.
const EXON_OVERLAP: i64 = 10;

/// Span limits for merging exons into genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LumpParams {
    /// Largest target gap (intron) between consecutive exons.
    pub max_intron: i64,
    /// Largest probe gap between consecutive exons.
    pub max_probe_gap: i64,
}

impl Default for LumpParams {
    fn default() -> Self {
        Self { max_intron: 25_000, max_probe_gap: 64 }
    }
}

/// A run of hits on one diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrudeExon {
    pub probe_start: u32,
    pub probe_end: u32,
    pub target_start: u32,
    pub target_end: u32,
    pub hit_count: u32,
}

impl CrudeExon {
    fn founded_by(hit: &CrudeHit) -> Self {
        Self {
            probe_start: hit.probe_offset,
            probe_end: hit.probe_offset + TILE_SIZE as u32,
            target_start: hit.target_offset,
            target_end: hit.target_offset + TILE_SIZE as u32,
            hit_count: 1,
        }
    }

    /// `target - probe` at the exon start.
    #[inline]
    pub fn diagonal(&self) -> i64 {
        self.target_start as i64 - self.probe_start as i64
    }
}

/// A run of exons that looks like one transcript's genomic span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudeGene {
    /// Index of the chromosome in the loaded genome set.
    pub target: usize,
    pub is_rc: bool,
    pub probe_start: u32,
    pub probe_end: u32,
    pub target_start: u32,
    pub target_end: u32,
    pub score: i64,
    pub exons: Vec<CrudeExon>,
}

#[inline]
fn within(x: i64, lo: i64, hi: i64) -> bool {
    lo <= x && x <= hi
}

/// Lump hits that sit within two bases of one diagonal and within 48 bases
/// of each other into exons.
///
/// `hits` must be sorted by (target, probe). Each pass founds an exon at the
/// first unlumped hit and greedily absorbs compatible later hits; passes
/// repeat until every hit belongs to an exon.
pub fn lump_hits(hits: &[CrudeHit]) -> Vec<CrudeExon> {
    let mut lumped = vec![false; hits.len()];
    let mut exons = Vec::new();
    let mut first_free = 0usize;

    loop {
        while first_free < hits.len() && lumped[first_free] {
            first_free += 1;
        }
        if first_free == hits.len() {
            break;
        }
        let founder = &hits[first_free];
        lumped[first_free] = true;
        let mut exon = CrudeExon::founded_by(founder);
        let diag = founder.probe_offset as i64 - founder.target_offset as i64;

        for i in first_free + 1..hits.len() {
            if lumped[i] {
                continue;
            }
            let p = hits[i].probe_offset as i64;
            let t = hits[i].target_offset as i64;
            let p_end = exon.probe_end as i64;
            let t_end = exon.target_end as i64;
            if within(p - t, diag - DIAG_SLOP, diag + DIAG_SLOP)
                && within(p, p_end - DIAG_SLOP, p_end + HIT_GAP)
                && within(t, t_end - DIAG_SLOP, t_end + HIT_GAP)
            {
                lumped[i] = true;
                exon.probe_end = exon.probe_end.max(hits[i].probe_offset + TILE_SIZE as u32);
                exon.target_end = exon.target_end.max(hits[i].target_offset + TILE_SIZE as u32);
                exon.hit_count += 1;
            } else if t > t_end + HIT_GAP {
                // target-sorted: nothing further can reach this exon
                break;
            }
        }
        exons.push(exon);
    }
    exons
}

#[inline]
pub fn sort_exons(exons: &mut [CrudeExon]) {
    exons.sort_unstable_by_key(|e| (e.target_start, e.probe_start));
}

/// Lump exons into genes allowing intron-sized target gaps, and score them.
///
/// `exons` must be sorted by (target start, probe start). A gene scores the
/// square of each member's hit count plus one per member exon.
pub fn lump_exons(
    exons: &[CrudeExon],
    target: usize,
    is_rc: bool,
    params: LumpParams,
) -> Vec<CrudeGene> {
    let mut lumped = vec![false; exons.len()];
    let mut genes = Vec::new();
    let mut first_free = 0usize;

    loop {
        while first_free < exons.len() && lumped[first_free] {
            first_free += 1;
        }
        if first_free == exons.len() {
            break;
        }
        let founder = exons[first_free];
        lumped[first_free] = true;
        let mut last_diag = founder.diagonal();
        let mut gene = CrudeGene {
            target,
            is_rc,
            probe_start: founder.probe_start,
            probe_end: founder.probe_end,
            target_start: founder.target_start,
            target_end: founder.target_end,
            score: hit_score(&founder),
            exons: vec![founder],
        };

        for i in first_free + 1..exons.len() {
            if lumped[i] {
                continue;
            }
            let ex = &exons[i];
            let t = ex.target_start as i64;
            let p = ex.probe_start as i64;
            let t_end = gene.target_end as i64;
            let p_end = gene.probe_end as i64;
            if within(t, t_end - EXON_OVERLAP, t_end + params.max_intron)
                && within(p, p_end - EXON_OVERLAP, p_end + params.max_probe_gap)
                && ex.diagonal() >= last_diag - DIAG_SLOP
            {
                lumped[i] = true;
                gene.target_end = gene.target_end.max(ex.target_end);
                gene.probe_end = gene.probe_end.max(ex.probe_end);
                gene.score += hit_score(ex);
                gene.exons.push(*ex);
                last_diag = ex.diagonal();
            } else if t > t_end + params.max_intron {
                break;
            }
        }
        gene.score += gene.exons.len() as i64;
        genes.push(gene);
    }
    genes
}

#[inline]
fn hit_score(exon: &CrudeExon) -> i64 {
    let n = exon.hit_count as i64;
    n * n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::scan::sort_hits;

    fn hit(p: u32, t: u32) -> CrudeHit {
        CrudeHit { probe_offset: p, target_offset: t }
    }

    fn exon(ps: u32, pe: u32, ts: u32, te: u32, n: u32) -> CrudeExon {
        CrudeExon { probe_start: ps, probe_end: pe, target_start: ts, target_end: te, hit_count: n }
    }

    #[test]
    fn collinear_hits_form_one_exon() {
        let hits: Vec<CrudeHit> = (0..12).map(|k| hit(16 * k, 10_000 + 16 * k)).collect();
        let exons = lump_hits(&hits);
        assert_eq!(exons, vec![exon(0, 192, 10_000, 10_192, 12)]);
    }

    #[test]
    fn off_diagonal_hit_starts_new_exon() {
        let mut hits = vec![hit(0, 1000), hit(16, 1016), hit(40, 1032), hit(32, 1032)];
        sort_hits(&mut hits);
        let exons = lump_hits(&hits);
        assert_eq!(exons.len(), 2);
        assert_eq!(exons[0], exon(0, 48, 1000, 1048, 3));
        assert_eq!(exons[1], exon(40, 56, 1032, 1048, 1));
    }

    #[test]
    fn distant_hit_on_same_diagonal_splits() {
        let hits = vec![hit(0, 0), hit(16, 16), hit(200, 200)];
        let exons = lump_hits(&hits);
        assert_eq!(exons.len(), 2);
        assert_eq!(exons[1], exon(200, 216, 200, 216, 1));
    }

    #[test]
    fn later_pass_picks_up_skipped_hits() {
        // two interleaved diagonals: both runs need their own pass
        let mut hits = Vec::new();
        for k in 0..4u32 {
            hits.push(hit(16 * k, 5000 + 16 * k));
            hits.push(hit(300 + 16 * k, 5008 + 16 * k));
        }
        sort_hits(&mut hits);
        let exons = lump_hits(&hits);
        assert_eq!(exons.len(), 2);
        assert!(exons.iter().all(|e| e.hit_count == 4));
    }

    #[test]
    fn exons_respect_diagonal_and_window() {
        let mut hits = Vec::new();
        let mut x: u32 = 99;
        for _ in 0..300 {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let t = ((x >> 8) % 4000) & !15;
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let p = (x >> 8) % 400;
            hits.push(hit(p, t));
        }
        sort_hits(&mut hits);
        hits.dedup();
        let exons = lump_hits(&hits);
        let total: u32 = exons.iter().map(|e| e.hit_count).sum();
        assert_eq!(total as usize, hits.len());
        for e in &exons {
            assert!(e.hit_count > 0);
            assert!(e.probe_end >= e.probe_start + TILE_SIZE as u32);
            assert!(e.target_end >= e.target_start + TILE_SIZE as u32);
            // the exon's last hit sits within two of the founding diagonal
            let end_diag = (e.probe_end as i64 - e.target_end as i64) - (e.probe_start as i64 - e.target_start as i64);
            assert!(end_diag.abs() <= DIAG_SLOP);
        }
    }

    #[test]
    fn single_hit_and_single_exon_are_fixed_points() {
        let exons = lump_hits(&[hit(7, 64)]);
        assert_eq!(exons, vec![exon(7, 23, 64, 80, 1)]);

        let one = exon(0, 192, 10_000, 10_192, 12);
        let genes = lump_exons(&[one], 0, false, LumpParams::default());
        assert_eq!(genes.len(), 1);
        let g = &genes[0];
        assert_eq!((g.probe_start, g.probe_end, g.target_start, g.target_end), (0, 192, 10_000, 10_192));
        assert_eq!(g.score, 144 + 1);
        assert_eq!(g.exons, vec![one]);
    }

    #[test]
    fn exons_across_an_intron_join_one_gene() {
        let exons = vec![
            exon(0, 96, 1000, 1096, 6),
            exon(96, 160, 3000, 3064, 4),
            exon(160, 240, 20_000, 20_080, 5),
        ];
        let genes = lump_exons(&exons, 3, true, LumpParams::default());
        assert_eq!(genes.len(), 1);
        let g = &genes[0];
        assert!(g.is_rc);
        assert_eq!(g.target, 3);
        assert_eq!((g.target_start, g.target_end), (1000, 20_080));
        assert_eq!((g.probe_start, g.probe_end), (0, 240));
        assert_eq!(g.score, 36 + 16 + 25 + 3);
    }

    #[test]
    fn gene_breaks_on_long_intron_or_probe_gap() {
        let params = LumpParams::default();
        let long_intron = vec![exon(0, 96, 0, 96, 6), exon(96, 160, 30_000, 30_064, 4)];
        assert_eq!(lump_exons(&long_intron, 0, false, params).len(), 2);

        let probe_gap = vec![exon(0, 96, 0, 96, 6), exon(200, 260, 500, 560, 4)];
        assert_eq!(lump_exons(&probe_gap, 0, false, params).len(), 2);

        let genomic = LumpParams { max_intron: 200, max_probe_gap: 200 };
        let short = vec![exon(0, 96, 0, 96, 6), exon(200, 260, 250, 310, 4)];
        assert_eq!(lump_exons(&short, 0, false, genomic).len(), 1);
        assert_eq!(lump_exons(&long_intron, 0, false, genomic).len(), 2);
    }

    #[test]
    fn diagonal_may_not_step_back() {
        // second exon would need the probe to run ahead of the target
        let exons = vec![exon(0, 96, 1000, 1096, 6), exon(140, 200, 1100, 1160, 4)];
        let genes = lump_exons(&exons, 0, false, LumpParams::default());
        assert_eq!(genes.len(), 2);
    }

    #[test]
    fn genes_satisfy_gap_bounds() {
        let mut exons = Vec::new();
        let mut x: u32 = 5;
        for _ in 0..200 {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let ts = (x >> 4) % 200_000;
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let ps = (x >> 8) % 2000;
            let len = 16 + (x >> 20) % 100;
            exons.push(exon(ps, ps + len, ts, ts + len, 1 + len / 16));
        }
        sort_exons(&mut exons);
        let params = LumpParams::default();
        let genes = lump_exons(&exons, 0, false, params);
        let members: usize = genes.iter().map(|g| g.exons.len()).sum();
        assert_eq!(members, exons.len());
        for g in &genes {
            for pair in g.exons.windows(2) {
                let t_gap = pair[1].target_start as i64 - pair[0].target_end as i64;
                let p_gap = pair[1].probe_start as i64 - pair[0].probe_end as i64;
                assert!((-EXON_OVERLAP..=params.max_intron).contains(&t_gap));
                assert!((-EXON_OVERLAP..=params.max_probe_gap).contains(&p_gap));
            }
        }
    }
}
