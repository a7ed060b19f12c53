use crate::util::dna::{self, TILE_SIZE};

pub const TILE_HASH_BITS: u32 = 16;
pub const TILE_HASH_SIZE: usize = 1 << TILE_HASH_BITS;
pub const TILE_HASH_MASK: u32 = (TILE_HASH_SIZE as u32) - 1;

/// Longest internal period that disqualifies a tile on its own.
const MAX_TILE_PERIOD: usize = TILE_SIZE / 2;
/// Longest tandem period looked for in the probe after the tile.
const MAX_REPEAT_SHIFT: usize = TILE_SIZE - 1;

#[inline]
pub fn tile_hash(tile: u32) -> usize {
    (tile & TILE_HASH_MASK) as usize
}

/// One accepted 16-base window of the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTile {
    pub offset: u32,
    pub tile: u32,
}

/// Hash index of the good tiles of one probe strand.
///
/// Buckets are stored flat: `tiles[starts[h]..starts[h + 1]]` holds every
/// tile with hash `h`, in ascending probe offset.
#[derive(Debug, Clone)]
pub struct FastProber {
    starts: Vec<u32>,
    tiles: Vec<ProbeTile>,
    probe_len: usize,
}

/// A tile is good if it has no ambiguous bases and isn't part of a short
/// tandem repeat. `dna` is the probe from the tile start onward.
pub fn make_good_tile(dna: &[u8]) -> Option<u32> {
    if dna.len() < TILE_SIZE {
        return None;
    }
    let tile = &dna[..TILE_SIZE];
    if tile.iter().any(|&b| dna::nt_val(b).is_none()) {
        return None;
    }
    for period in 1..=MAX_TILE_PERIOD {
        if (0..TILE_SIZE - period).all(|i| tile[i] == tile[i + period]) {
            return None;
        }
    }
    for shift in 1..=MAX_REPEAT_SHIFT {
        match dna.get(shift..shift + TILE_SIZE) {
            Some(next) if next.eq_ignore_ascii_case(tile) => return None,
            Some(_) => {}
            None => break,
        }
    }
    Some(dna::pack_dna16(tile))
}

impl FastProber {
    /// Index every good tile of `probe`; `None` if there are none.
    pub fn build(probe: &[u8]) -> Option<Self> {
        if probe.len() < TILE_SIZE {
            return None;
        }
        let max_tiles = probe.len() - TILE_SIZE + 1;
        let mut accepted: Vec<ProbeTile> = Vec::with_capacity(max_tiles);
        for i in 0..max_tiles {
            if let Some(tile) = make_good_tile(&probe[i..]) {
                accepted.push(ProbeTile { offset: i as u32, tile });
            }
        }
        if accepted.is_empty() {
            return None;
        }

        // counting sort into buckets; stable, so offsets stay ascending
        let mut starts = vec![0u32; TILE_HASH_SIZE + 1];
        for t in &accepted {
            starts[tile_hash(t.tile) + 1] += 1;
        }
        for h in 0..TILE_HASH_SIZE {
            starts[h + 1] += starts[h];
        }
        let mut fill = starts.clone();
        let mut tiles = vec![ProbeTile { offset: 0, tile: 0 }; accepted.len()];
        for t in accepted {
            let h = tile_hash(t.tile);
            tiles[fill[h] as usize] = t;
            fill[h] += 1;
        }

        Some(Self { starts, tiles, probe_len: probe.len() })
    }

    /// Cheap presence test used by the scanner's chunk filter.
    #[inline]
    pub fn has_bucket(&self, word: u32) -> bool {
        let h = tile_hash(word);
        self.starts[h] != self.starts[h + 1]
    }

    #[inline]
    pub fn bucket(&self, word: u32) -> &[ProbeTile] {
        let h = tile_hash(word);
        &self.tiles[self.starts[h] as usize..self.starts[h + 1] as usize]
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn probe_len(&self) -> usize {
        self.probe_len
    }

    pub fn tiles(&self) -> &[ProbeTile] {
        &self.tiles
    }
}
