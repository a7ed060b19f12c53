use crate::index::nt4::PackedGenome;
use crate::index::tile::FastProber;
use crate::util::dna::TILE_SHIFT;

/// Default cap on hits from a single probe strand against one chromosome.
pub const MAX_HITS_AT_ONCE: usize = 20_000;

/// Words tested together by the coarse bucket filter.
const CHUNK_WORDS: usize = 8;

/// One exact tile match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CrudeHit {
    // field order gives the (target, probe) sort the lumper expects
    pub target_offset: u32,
    pub probe_offset: u32,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub hits: Vec<CrudeHit>,
    /// The cap was reached and the scan stopped early.
    pub truncated: bool,
}

/// Check every word of `words` for exact tile matches, appending hits.
/// Returns false once `max_hits` is reached.
fn individual_hits(
    prober: &FastProber,
    words: &[u32],
    word_offset: usize,
    max_hits: usize,
    hits: &mut Vec<CrudeHit>,
) -> bool {
    for (i, &word) in words.iter().enumerate() {
        for pt in prober.bucket(word) {
            if pt.tile != word {
                continue;
            }
            if hits.len() >= max_hits {
                return false;
            }
            hits.push(CrudeHit {
                probe_offset: pt.offset,
                target_offset: ((word_offset + i) << TILE_SHIFT) as u32,
            });
        }
    }
    true
}

/// Stream the target's whole words through the probe's tile hash.
///
/// Chunks of eight words are first screened by OR-ing the bucket presence
/// bits; only a chunk with at least one occupied bucket is examined word by
/// word. Hits come out in target order, which callers must not rely on
/// after truncation.
pub fn scan(prober: &FastProber, target: &PackedGenome, max_hits: usize) -> ScanResult {
    let words = target.full_words();
    let mut hits = Vec::new();
    let mut chunks = words.chunks_exact(CHUNK_WORDS);
    let mut word_offset = 0usize;

    for chunk in &mut chunks {
        let any = chunk.iter().fold(false, |acc, &w| acc | prober.has_bucket(w));
        if any && !individual_hits(prober, chunk, word_offset, max_hits, &mut hits) {
            return ScanResult { hits, truncated: true };
        }
        word_offset += CHUNK_WORDS;
    }
    let tail = chunks.remainder();
    let truncated = !individual_hits(prober, tail, word_offset, max_hits, &mut hits);
    ScanResult { hits, truncated }
}

#[inline]
pub fn sort_hits(hits: &mut [CrudeHit]) {
    hits.sort_unstable();
}
