//! Drivers that pick which probes to align and feed them through
//! [`align_probe`], one `Blasting` header per probe.
//!
//! With more than one thread, probes are aligned a chunk at a time on a
//! private rayon pool; each probe reports into its own buffer and the
//! buffers are replayed in input order, so the report reads the same as a
//! single-threaded run.

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::align::{align_probe, AlignOpt};
use crate::index::nt4::PackedGenome;
use crate::io::fasta::{self, FastaRecord, ProbeSource};
use crate::io::report::{self, blasting_line, MemoryReport, ReportSink};

/// Probes read ahead per thread when aligning in parallel.
const PROBES_PER_THREAD: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub probes: usize,
    pub alignments: usize,
}

enum Job {
    Probe(usize, FastaRecord),
    Missing(String),
}

pub struct Batch<'a> {
    genomes: &'a [PackedGenome],
    opt: AlignOpt,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Batch<'a> {
    pub fn new(genomes: &'a [PackedGenome], opt: AlignOpt) -> Result<Self> {
        let pool = if opt.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(opt.threads)
                    .build()
                    .context("failed to build thread pool")?,
            )
        } else {
            None
        };
        Ok(Self { genomes, opt, pool })
    }

    fn chunk_size(&self) -> usize {
        if self.pool.is_some() {
            self.opt.threads * PROBES_PER_THREAD
        } else {
            1
        }
    }

    fn run_job(&self, job: &Job, sink: &mut dyn ReportSink) -> Result<(usize, usize)> {
        match job {
            Job::Probe(ix, rec) => {
                sink.report(&blasting_line(*ix, &rec.id, rec.seq.len()))?;
                let n = align_probe(&rec.id, &rec.seq, self.genomes, &self.opt, sink)?;
                Ok((1, n))
            }
            Job::Missing(name) => {
                sink.warn(&format!("Couldn't find cdna {}", name))?;
                Ok((0, 0))
            }
        }
    }

    fn run_jobs(&self, jobs: &[Job], sink: &mut dyn ReportSink, stats: &mut BatchStats) -> Result<()> {
        let mut add = |(probes, alignments): (usize, usize)| {
            stats.probes += probes;
            stats.alignments += alignments;
        };
        match &self.pool {
            None => {
                for job in jobs {
                    add(self.run_job(job, sink)?);
                }
            }
            Some(pool) => {
                let done: Vec<Result<(MemoryReport, (usize, usize))>> = pool.install(|| {
                    jobs.par_iter()
                        .map(|job| {
                            let mut mem = MemoryReport::new();
                            let counts = self.run_job(job, &mut mem)?;
                            Ok((mem, counts))
                        })
                        .collect()
                });
                for r in done {
                    let (mem, counts) = r?;
                    mem.replay_into(sink)?;
                    add(counts);
                }
            }
        }
        Ok(())
    }

    /// Align probes from `src`, numbering them from `first_ix`, until the
    /// source ends or `limit` probes are done.
    pub fn run_source(
        &self,
        src: &mut dyn ProbeSource,
        first_ix: usize,
        limit: Option<usize>,
        sink: &mut dyn ReportSink,
    ) -> Result<BatchStats> {
        let mut stats = BatchStats::default();
        let mut ix = first_ix;
        let mut left = limit.unwrap_or(usize::MAX);
        let mut jobs = Vec::with_capacity(self.chunk_size());
        loop {
            jobs.clear();
            while jobs.len() < self.chunk_size() && left > 0 {
                let Some(rec) = src.next_probe()? else { break };
                jobs.push(Job::Probe(ix, rec));
                ix += 1;
                left -= 1;
            }
            if jobs.is_empty() {
                break;
            }
            self.run_jobs(&jobs, sink, &mut stats)?;
            log::info!("{} probes aligned, {} alignments", stats.probes, stats.alignments);
        }
        Ok(stats)
    }

    /// Align the named probes, warning about names not in `fa_path`.
    pub fn run_named(&self, fa_path: impl AsRef<Path>, names: &[String], sink: &mut dyn ReportSink) -> Result<BatchStats> {
        let db = fasta::load_by_name(fa_path)?;
        let jobs: Vec<Job> = names
            .iter()
            .enumerate()
            .map(|(i, name)| match db.get(name) {
                Some(rec) => Job::Probe(i + 1, rec.clone()),
                None => Job::Missing(name.clone()),
            })
            .collect();
        let mut stats = BatchStats::default();
        for chunk in jobs.chunks(self.chunk_size()) {
            self.run_jobs(chunk, sink, &mut stats)?;
        }
        Ok(stats)
    }

    /// Align the probes listed one per line in `list_path` (first word of
    /// each non-blank line). An unknown name is fatal.
    pub fn run_list(
        &self,
        list_path: impl AsRef<Path>,
        fa_path: impl AsRef<Path>,
        sink: &mut dyn ReportSink,
    ) -> Result<BatchStats> {
        let list_path = list_path.as_ref();
        let names = read_name_list(list_path)?;
        let db = fasta::load_by_name(fa_path)?;
        let mut jobs = Vec::with_capacity(names.len());
        for (i, name) in names.into_iter().enumerate() {
            let Some(rec) = db.get(&name) else {
                bail!("Couldn't find cdna {}", name);
            };
            jobs.push(Job::Probe(i + 1, rec.clone()));
        }
        let mut stats = BatchStats::default();
        for chunk in jobs.chunks(self.chunk_size()) {
            self.run_jobs(chunk, sink, &mut stats)?;
        }
        Ok(stats)
    }

    /// Every probe in `fa_path`.
    pub fn run_all(&self, fa_path: impl AsRef<Path>, sink: &mut dyn ReportSink) -> Result<BatchStats> {
        let mut src = fasta::open_fasta(fa_path)?;
        self.run_source(&mut src, 1, None, sink)
    }

    /// Probes from the 1-based `start_ix` on, at most `count` of them.
    pub fn run_starting(
        &self,
        fa_path: impl AsRef<Path>,
        start_ix: usize,
        count: Option<usize>,
        sink: &mut dyn ReportSink,
    ) -> Result<BatchStats> {
        let start_ix = start_ix.max(1);
        sink.warn(&format!("Starting at {}", start_ix))?;
        sink.report("")?;
        let mut src = fasta::open_fasta(fa_path)?;
        for skipped in 0..start_ix - 1 {
            if src.next_probe()?.is_none() {
                bail!("Can't seek to {}, there's only {}", start_ix, skipped + 1);
            }
        }
        self.run_source(&mut src, start_ix, count, sink)
    }

    /// Probes after the last one with a summary line in `report_path`.
    /// With no summary line yet, starts from the first probe.
    pub fn run_resume(
        &self,
        report_path: impl AsRef<Path>,
        fa_path: impl AsRef<Path>,
        sink: &mut dyn ReportSink,
    ) -> Result<BatchStats> {
        let last = report::last_probe_reported(report_path)?;
        let mut src = fasta::open_fasta(fa_path)?;
        let mut next_ix = 1;
        match last {
            Some(last) => {
                sink.warn(&format!("Resuming after {}", last))?;
                sink.report("")?;
                loop {
                    let Some(rec) = src.next_probe()? else {
                        bail!("Couldn't find {} in cDNA database", last);
                    };
                    next_ix += 1;
                    if rec.id == last {
                        break;
                    }
                }
            }
            None => {
                sink.warn("Nothing reported yet, resuming at the start")?;
                sink.report("")?;
            }
        }
        self.run_source(&mut src, next_ix, None, sink)
    }
}

/// First word of every non-blank line.
pub fn read_name_list(path: &Path) -> Result<Vec<String>> {
    let f = std::fs::File::open(path).with_context(|| format!("cannot open name list '{}'", path.display()))?;
    let mut names = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if let Some(word) = line.split_whitespace().next() {
            names.push(word.to_string());
        }
    }
    Ok(names)
}
