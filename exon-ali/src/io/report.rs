//! Report lines shared by the console and the persisted report file.
//!
//! The report file is append-only and its text is what `resume` scans, so
//! the line formats here must not drift.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Prefix for warnings in the report.
pub const WARNING_PREFIX: &str = "###";

/// Destination for report lines and warnings.
pub trait ReportSink {
    fn report(&mut self, line: &str) -> Result<()>;
    fn warn(&mut self, msg: &str) -> Result<()>;
}

/// Stdout plus, when opened in append mode, the report file.
pub struct ConsoleReport {
    file: Option<File>,
}

impl ConsoleReport {
    /// Console only.
    pub fn console() -> Self {
        Self { file: None }
    }

    /// Console and `path`, appending.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open report file '{}'", path.display()))?;
        Ok(Self { file: Some(file) })
    }

    fn emit(&mut self, prefix: &str, line: &str) -> Result<()> {
        if let Some(f) = self.file.as_mut() {
            writeln!(f, "{}{}", prefix, line)?;
            f.flush()?;
        }
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}{}", prefix, line)?;
        out.flush()?;
        Ok(())
    }
}

impl ReportSink for ConsoleReport {
    fn report(&mut self, line: &str) -> Result<()> {
        self.emit("", line)
    }

    fn warn(&mut self, msg: &str) -> Result<()> {
        self.emit(WARNING_PREFIX, msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Line(String),
    Warning(String),
}

/// Buffers events so parallel work can be replayed in input order.
#[derive(Debug, Default)]
pub struct MemoryReport {
    pub events: Vec<ReportEvent>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replay_into(&self, sink: &mut dyn ReportSink) -> Result<()> {
        for ev in &self.events {
            match ev {
                ReportEvent::Line(l) => sink.report(l)?,
                ReportEvent::Warning(w) => sink.warn(w)?,
            }
        }
        Ok(())
    }

    /// All events rendered the way they appear in a report file.
    pub fn lines(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|ev| match ev {
                ReportEvent::Line(l) => l.clone(),
                ReportEvent::Warning(w) => format!("{}{}", WARNING_PREFIX, w),
            })
            .collect()
    }
}

impl ReportSink for MemoryReport {
    fn report(&mut self, line: &str) -> Result<()> {
        self.events.push(ReportEvent::Line(line.to_string()));
        Ok(())
    }

    fn warn(&mut self, msg: &str) -> Result<()> {
        self.events.push(ReportEvent::Warning(msg.to_string()));
        Ok(())
    }
}

pub fn blasting_line(ix: usize, name: &str, size: usize) -> String {
    format!("{} Blasting {} {} bases", ix, name, size)
}

/// One successful alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitLine<'a> {
    pub probe: &'a str,
    pub probe_start: usize,
    pub probe_end: usize,
    pub target: &'a str,
    pub target_start: usize,
    pub target_end: usize,
    pub crude_score: i64,
    pub fine_score: i32,
    pub is_rc: bool,
}

impl std::fmt::Display for HitLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}-{} hits {} {}-{} cs {} score {} strand {}",
            self.probe,
            self.probe_start,
            self.probe_end,
            self.target,
            self.target_start,
            self.target_end,
            self.crude_score,
            self.fine_score,
            if self.is_rc { '-' } else { '+' }
        )
    }
}

pub fn summary_line(count: usize, probe: &str, seconds: f64) -> String {
    format!("{} alignments of {} in {:.6} seconds", count, probe, seconds)
}

/// Name of the last probe with a summary line in `reader`, if any.
pub fn last_probe_in<R: BufRead>(reader: R) -> Result<Option<String>> {
    let mut last = None;
    for line in reader.lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() > 4 && words[1] == "alignments" {
            last = Some(words[3].to_string());
        }
    }
    Ok(last)
}

/// Last probe reported in the report file at `path`.
pub fn last_probe_reported(path: impl AsRef<Path>) -> Result<Option<String>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("cannot open report file '{}'", path.display()))?;
    last_probe_in(BufReader::new(f))
}
