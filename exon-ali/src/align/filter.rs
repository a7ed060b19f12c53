use super::lump::CrudeGene;

/// What `filter_poor_genes` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Dropped whole score levels from the bottom.
    ByScore,
    /// Half or more tie for the best score; the list was cut in half blindly.
    Plateau,
}

pub fn sort_by_score(genes: &mut [CrudeGene]) {
    genes.sort_by(|a, b| b.score.cmp(&a.score));
}

/// Number of genes, in a score-sorted list, scoring above `cutoff`.
pub fn count_better(genes: &[CrudeGene], cutoff: i64) -> usize {
    genes.iter().position(|g| g.score <= cutoff).unwrap_or(genes.len())
}

/// Sort by score and drop at least half of the list, worst first.
///
/// Whole score levels are dropped so ties survive or go together. When the
/// median already ties the best score that is impossible, and the list is
/// simply cut to its top half. At least one gene always survives.
pub fn filter_poor_genes(genes: &mut Vec<CrudeGene>) -> FilterOutcome {
    if genes.len() <= 1 {
        return FilterOutcome::ByScore;
    }
    sort_by_score(genes);
    let half = genes.len() / 2;
    let best = genes[0].score;

    if genes[half].score == best {
        genes.truncate(half.max(1));
        return FilterOutcome::Plateau;
    }

    let mut keep = genes.len();
    while keep > half {
        let worst = genes[keep - 1].score;
        keep = count_better(&genes[..keep], worst);
    }
    genes.truncate(keep);
    FilterOutcome::ByScore
}

/// Final cut once every chromosome and strand is in: keep genes scoring
/// above a tenth of the best.
pub fn apply_global_cutoff(genes: &mut Vec<CrudeGene>) {
    if genes.is_empty() {
        return;
    }
    sort_by_score(genes);
    let best = genes[0].score;
    let worst = genes[genes.len() - 1].score;
    if best > worst {
        let keep = count_better(genes, best / 10);
        genes.truncate(keep);
    }
}
