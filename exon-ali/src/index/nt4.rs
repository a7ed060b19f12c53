use anyhow::{anyhow, bail, Context, Result};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use crate::util::dna::{self, TILE_SHIFT, TILE_SIZE};

pub const NT4_SIGNATURE: u32 = 0x1234_5678;

#[inline]
fn word_count(base_count: usize) -> usize {
    (base_count + TILE_SIZE - 1) >> TILE_SHIFT
}

/// One chromosome stored 2 bits per base, 16 bases per word.
///
/// File layout (`.nt4`): signature word, base count (i32), then the packed
/// words. Files are written little-endian; a byte-swapped signature marks a
/// file written on the other endianness and is read back word-swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedGenome {
    pub name: String,
    pub base_count: usize,
    pub bases: Vec<u32>,
}

impl PackedGenome {
    pub fn from_dna(name: impl Into<String>, dna: &[u8]) -> Self {
        let bases = dna.chunks(TILE_SIZE).map(dna::pack_dna16).collect();
        Self { name: name.into(), base_count: dna.len(), bases }
    }

    /// Number of whole (16-base) words, the part the hit scanner looks at.
    #[inline]
    pub fn full_words(&self) -> &[u32] {
        &self.bases[..self.base_count >> TILE_SHIFT]
    }

    pub fn load(path: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let fh = std::fs::File::open(path)
            .with_context(|| format!("cannot open nt4 file '{}'", path.display()))?;
        let mut reader = BufReader::new(fh);
        Self::read_from(&mut reader, name)
            .with_context(|| format!("'{}' is not a good nt4 file", path.display()))
    }

    pub fn read_from<R: Read>(reader: &mut R, name: impl Into<String>) -> Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        let swapped = match u32::from_le_bytes(buf) {
            NT4_SIGNATURE => false,
            s if s.swap_bytes() == NT4_SIGNATURE => true,
            s => bail!("bad signature {:#010x}", s),
        };
        let read_word = |r: &mut R| -> Result<u32> {
            let mut b = [0u8; 4];
            r.read_exact(&mut b)?;
            Ok(if swapped { u32::from_be_bytes(b) } else { u32::from_le_bytes(b) })
        };

        let raw_count = read_word(reader)? as i32;
        if raw_count < 0 {
            bail!("negative base count {}", raw_count);
        }
        let base_count = raw_count as usize;
        let n_words = word_count(base_count);
        let mut bases = Vec::with_capacity(n_words);
        for i in 0..n_words {
            let w = read_word(reader)
                .map_err(|e| anyhow!("truncated at word {} of {}: {}", i, n_words, e))?;
            bases.push(w);
        }
        Ok(Self { name: name.into(), base_count, bases })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let fh = std::fs::File::create(path)
            .with_context(|| format!("cannot create nt4 file '{}'", path.display()))?;
        let mut w = BufWriter::new(fh);
        w.write_all(&NT4_SIGNATURE.to_le_bytes())?;
        w.write_all(&(self.base_count as i32).to_le_bytes())?;
        for &word in &self.bases {
            w.write_all(&word.to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Plain bases for `start..start+len`.
    ///
    /// The partial words at either edge are unpacked base by base, the
    /// aligned middle a word at a time.
    pub fn unpack(&self, start: usize, len: usize) -> Result<Vec<u8>> {
        let end = start
            .checked_add(len)
            .filter(|&e| e <= self.base_count)
            .ok_or_else(|| {
                anyhow!("unpack {}+{} out of range for {} ({} bases)", start, len, self.name, self.base_count)
            })?;
        let mut out = Vec::with_capacity(len);
        if len == 0 {
            return Ok(out);
        }

        let first_full = (start + TILE_SIZE - 1) >> TILE_SHIFT;
        let last_full = end >> TILE_SHIFT;
        let start_rem = start & (TILE_SIZE - 1);
        let end_rem = end & (TILE_SIZE - 1);

        if first_full > last_full {
            // start and end inside the same word
            dna::unpack_word_into(self.bases[start >> TILE_SHIFT], start_rem, end_rem, &mut out);
            return Ok(out);
        }
        if start_rem != 0 {
            dna::unpack_word_into(self.bases[start >> TILE_SHIFT], start_rem, TILE_SIZE, &mut out);
        }
        for &word in &self.bases[first_full..last_full] {
            dna::unpack_word_into(word, 0, TILE_SIZE, &mut out);
        }
        if end_rem != 0 {
            dna::unpack_word_into(self.bases[last_full], 0, end_rem, &mut out);
        }
        Ok(out)
    }
}

/// Load every `*.nt4` file in `dir`, ordered by file name. Each chromosome
/// is named after its file stem.
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<PackedGenome>> {
    let dir = dir.as_ref();
    let start = Instant::now();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("cannot read genome directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == "nt4") {
            paths.push(path);
        }
    }
    if paths.is_empty() {
        bail!("couldn't find any .nt4 files in {}", dir.display());
    }
    paths.sort();

    let mut genomes = Vec::with_capacity(paths.len());
    for p in &paths {
        let name = p
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        genomes.push(PackedGenome::load(p, name)?);
    }
    let total: usize = genomes.iter().map(|g| g.base_count).sum();
    log::info!(
        "{:.2} seconds loading {} .nt4 files ({} bases)",
        start.elapsed().as_secs_f64(),
        genomes.len(),
        total
    );
    Ok(genomes)
}

/// Write one `.nt4` file per record of a FASTA file into `out_dir`,
/// named after the record id. Returns the number of files written.
pub fn pack_fasta(fa_path: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<usize> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create directory '{}'", out_dir.display()))?;
    let mut reader = crate::io::fasta::open_fasta(fa_path)?;
    let mut n = 0usize;
    while let Some(rec) = reader.next_record()? {
        if rec.id.is_empty() {
            bail!("FASTA record {} has no name", n + 1);
        }
        let genome = PackedGenome::from_dna(rec.id.as_str(), &dna::normalize_seq(&rec.seq));
        let path = out_dir.join(format!("{}.nt4", rec.id));
        genome.save(&path)?;
        log::info!("packed {} ({} bases) into {}", rec.id, genome.base_count, path.display());
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn make_seq(len: usize, seed: u32) -> Vec<u8> {
        let bases = [b'A', b'C', b'G', b'T'];
        let mut x = seed;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                bases[(x >> 16) as usize % 4]
            })
            .collect()
    }

    #[test]
    fn unpack_every_start_residue() {
        let seq = make_seq(123, 7);
        let g = PackedGenome::from_dna("chrT", &seq);
        assert_eq!(g.bases.len(), 8);
        for start in 0..16 {
            for len in [0usize, 1, 5, 15, 16, 17, 31, 32, 33, 60] {
                if start + len > seq.len() {
                    continue;
                }
                let got = g.unpack(start, len).unwrap();
                assert_eq!(got, &seq[start..start + len], "start={} len={}", start, len);
            }
        }
    }

    #[test]
    fn unpack_tail_word_and_whole() {
        let seq = make_seq(123, 11);
        let g = PackedGenome::from_dna("chrT", &seq);
        assert_eq!(g.unpack(0, 123).unwrap(), seq);
        assert_eq!(g.unpack(112, 11).unwrap(), &seq[112..]);
        assert_eq!(g.unpack(120, 3).unwrap(), &seq[120..]);
    }

    #[test]
    fn unpack_out_of_range_is_error() {
        let g = PackedGenome::from_dna("chrT", &make_seq(40, 3));
        assert!(g.unpack(30, 11).is_err());
        assert!(g.unpack(usize::MAX, 2).is_err());
        assert!(g.unpack(40, 0).unwrap().is_empty());
    }

    #[test]
    fn full_words_skip_partial_tail() {
        let g = PackedGenome::from_dna("chrT", &make_seq(40, 5));
        assert_eq!(g.bases.len(), 3);
        assert_eq!(g.full_words().len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chrII.nt4");
        let g = PackedGenome::from_dna("chrII", &make_seq(1000, 9));
        g.save(&path).unwrap();
        let back = PackedGenome::load(&path, "chrII").unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn reads_byte_swapped_file() {
        let g = PackedGenome::from_dna("x", &make_seq(37, 1));
        let mut raw = Vec::new();
        raw.extend_from_slice(&NT4_SIGNATURE.to_be_bytes());
        raw.extend_from_slice(&(g.base_count as i32).to_be_bytes());
        for w in &g.bases {
            raw.extend_from_slice(&w.to_be_bytes());
        }
        let back = PackedGenome::read_from(&mut Cursor::new(raw), "x").unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn rejects_bad_signature_and_short_data() {
        let mut raw = vec![0u8; 8];
        assert!(PackedGenome::read_from(&mut Cursor::new(raw.clone()), "x").is_err());
        raw[..4].copy_from_slice(&NT4_SIGNATURE.to_le_bytes());
        raw[4..8].copy_from_slice(&40i32.to_le_bytes());
        raw.extend_from_slice(&[0u8; 4]);
        assert!(PackedGenome::read_from(&mut Cursor::new(raw), "x").is_err());
    }

    #[test]
    fn load_dir_sorts_and_names_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        PackedGenome::from_dna("b", &make_seq(50, 2)).save(dir.path().join("chrB.nt4")).unwrap();
        PackedGenome::from_dna("a", &make_seq(20, 4)).save(dir.path().join("chrA.nt4")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
        let genomes = load_dir(dir.path()).unwrap();
        let names: Vec<&str> = genomes.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["chrA", "chrB"]);
        assert_eq!(genomes[1].base_count, 50);
    }

    #[test]
    fn load_dir_without_nt4_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dir(dir.path()).is_err());
    }

    #[test]
    fn pack_fasta_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let fa = dir.path().join("genome.fa");
        std::fs::write(&fa, ">chrB\nACGTTGCA\n>chrA\nggggccccaaaatttt\nNNAC\n").unwrap();
        let out = dir.path().join("nt");
        assert_eq!(pack_fasta(&fa, &out).unwrap(), 2);
        let genomes = load_dir(&out).unwrap();
        assert_eq!(genomes.len(), 2);
        assert_eq!(genomes[0].name, "chrA");
        assert_eq!(genomes[0].base_count, 20);
        // N is stored as T
        assert_eq!(genomes[0].unpack(14, 6).unwrap(), b"TTTTAC");
        assert_eq!(genomes[1].unpack(0, 8).unwrap(), b"ACGTTGCA");
    }
}
