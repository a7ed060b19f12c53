//! Crude-to-fine alignment of one probe against a packed genome.
//!
//! Per chromosome and strand: exact 16-mer hits from the probe's tile hash
//! ([`scan`]) are lumped into diagonal runs and then into gene-sized
//! clusters ([`lump`]), trimmed by score ([`filter`]) and finally refined
//! base by base ([`fine`], [`sw`]).

pub mod filter;
pub mod fine;
pub mod lump;
pub mod scan;
pub mod sw;

use anyhow::Result;
use std::time::Instant;

pub use fine::{find_fine_alignment, FineAlignment, DEFAULT_FLANK};
pub use lump::{CrudeExon, CrudeGene, LumpParams};
pub use scan::{CrudeHit, MAX_HITS_AT_ONCE};
pub use sw::{SwBuffer, SwParams};

use crate::index::nt4::PackedGenome;
use crate::index::tile::FastProber;
use crate::io::report::{summary_line, HitLine, ReportSink};
use crate::util::dna;

/// What kind of sequence is being aligned, which sets how far apart
/// exons of one gene may lie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AlignMode {
    /// cDNA against genome: introns up to 25kb, small probe gaps.
    #[default]
    Cdna,
    /// Genomic against genome: both sides stay close.
    Genomic,
}

impl AlignMode {
    pub fn lump_params(self) -> LumpParams {
        match self {
            AlignMode::Cdna => LumpParams::default(),
            AlignMode::Genomic => LumpParams { max_intron: 200, max_probe_gap: 200 },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AlignOpt {
    pub mode: AlignMode,
    /// Hit cap per strand scan; twice this is the gene capacity per probe.
    pub max_hits: usize,
    /// Genome added around a crude gene before fine alignment.
    pub flank: usize,
    pub sw: SwParams,
    pub threads: usize,
}

impl Default for AlignOpt {
    fn default() -> Self {
        Self {
            mode: AlignMode::Cdna,
            max_hits: MAX_HITS_AT_ONCE,
            flank: DEFAULT_FLANK,
            sw: SwParams::default(),
            threads: 1,
        }
    }
}

/// Crude genes of one probe strand on one chromosome.
pub fn find_crude_genes(
    prober: &FastProber,
    genome: &PackedGenome,
    target_ix: usize,
    is_rc: bool,
    opt: &AlignOpt,
    sink: &mut dyn ReportSink,
) -> Result<Vec<CrudeGene>> {
    let mut scanned = scan::scan(prober, genome, opt.max_hits);
    if scanned.truncated {
        sink.warn(&format!("Too many hits, only taking first {}", opt.max_hits))?;
    }
    scan::sort_hits(&mut scanned.hits);
    let mut exons = lump::lump_hits(&scanned.hits);
    lump::sort_exons(&mut exons);
    let genes = lump::lump_exons(&exons, target_ix, is_rc, opt.mode.lump_params());
    log::debug!(
        "{} {}: {} hits, {} exons, {} genes",
        genome.name,
        if is_rc { '-' } else { '+' },
        scanned.hits.len(),
        exons.len(),
        genes.len()
    );
    Ok(genes)
}

/// Align one probe against every chromosome and report the results.
///
/// Emits one line per gene that survives fine alignment and then the
/// summary line with a blank line after it. Returns the number of
/// alignments reported.
pub fn align_probe(
    name: &str,
    probe: &[u8],
    genomes: &[PackedGenome],
    opt: &AlignOpt,
    sink: &mut dyn ReportSink,
) -> Result<usize> {
    let start = Instant::now();
    let probe = dna::normalize_seq(probe);
    let rc_probe = dna::revcomp(&probe);
    let probers = [(false, FastProber::build(&probe)), (true, FastProber::build(&rc_probe))];

    let max_genes = 2 * opt.max_hits;
    let mut genes: Vec<CrudeGene> = Vec::with_capacity(max_genes);
    'chromes: for (target_ix, genome) in genomes.iter().enumerate() {
        for (is_rc, prober) in &probers {
            let Some(prober) = prober else { continue };
            let mut found = find_crude_genes(prober, genome, target_ix, *is_rc, opt, sink)?;
            found.truncate(max_genes - genes.len());
            genes.extend(found);

            if max_genes - genes.len() < opt.max_hits {
                if filter::filter_poor_genes(&mut genes) == filter::FilterOutcome::Plateau {
                    sink.warn("Bunches of genes, all scoring the same. Program is throwing out half out of necessity.")?;
                }
                if max_genes - genes.len() < opt.max_hits {
                    sink.warn("Too many genes. Moving on to the next.")?;
                    break 'chromes;
                }
            }
        }
    }

    filter::apply_global_cutoff(&mut genes);

    let mut buf = SwBuffer::new();
    let mut count = 0usize;
    for gene in &genes {
        let genome = &genomes[gene.target];
        let Some(ali) = find_fine_alignment(&probe, gene, genome, opt.flank, opt.sw, &mut buf)? else {
            continue;
        };
        let line = HitLine {
            probe: name,
            probe_start: ali.probe_start,
            probe_end: ali.probe_end,
            target: &genome.name,
            target_start: ali.target_start,
            target_end: ali.target_end,
            crude_score: gene.score,
            fine_score: ali.score,
            is_rc: gene.is_rc,
        };
        sink.report(&line.to_string())?;
        count += 1;
    }

    sink.report(&summary_line(count, name, start.elapsed().as_secs_f64()))?;
    sink.report("")?;
    Ok(count)
}
