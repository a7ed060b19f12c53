use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            done: false,
            peek_header: None,
        }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        // Find header line
        let header = if let Some(h) = self.peek_header.take() {
            h
        } else {
            loop {
                self.buf.clear();
                let n = self.reader.read_line(&mut self.buf)?;
                if n == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if self.buf.starts_with('>') {
                    let h = self.buf[1..].trim().to_string();
                    break h;
                }
            }
        };

        // Parse id and description
        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Read sequence lines
        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            let n = self.reader.read_line(&mut self.buf)?;
            if n == 0 {
                self.done = true;
                break;
            }
            if self.buf.starts_with('>') {
                let h = self.buf[1..].trim().to_string();
                self.peek_header = Some(h);
                break;
            }
            for &b in self.buf.as_bytes() {
                match b {
                    b'\n' | b'\r' | b' ' | b'\t' => {}
                    _ => seq.push(b.to_ascii_uppercase()),
                }
            }
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }
}

/// A stream of probe sequences: the next one, or the end.
pub trait ProbeSource {
    fn next_probe(&mut self) -> Result<Option<FastaRecord>>;
}

impl<R: BufRead> ProbeSource for FastaReader<R> {
    fn next_probe(&mut self) -> Result<Option<FastaRecord>> {
        self.next_record()
    }
}

pub fn open_fasta(path: impl AsRef<Path>) -> Result<FastaReader<BufReader<File>>> {
    let path = path.as_ref();
    let fh = File::open(path).with_context(|| format!("cannot open FASTA '{}'", path.display()))?;
    Ok(FastaReader::new(BufReader::new(fh)))
}

/// Every record of a FASTA file keyed by id, for lookups by name.
/// A repeated id keeps its first record.
pub fn load_by_name(path: impl AsRef<Path>) -> Result<HashMap<String, FastaRecord>> {
    let mut reader = open_fasta(path)?;
    let mut map = HashMap::new();
    while let Some(rec) = reader.next_record()? {
        map.entry(rec.id.clone()).or_insert(rec);
    }
    Ok(map)
}
