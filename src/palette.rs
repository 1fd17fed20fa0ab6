//! Bidirectional mapping between block states and the small indices stored
//! in a [`crate::Virtual3DCanvas`].

use rustc_hash::FxHashMap;

use crate::block_state::BlockState;
use crate::packed_array::bits_for;

/// Append-only palette with reverse lookup. Index 0 is reserved for the
/// caller-chosen default (air for block palettes, void for biome palettes)
/// and indices stay stable for the lifetime of the instance.
pub struct PaletteManager {
    palette: Vec<BlockState>,
    index: FxHashMap<BlockState, usize>,
}

impl PaletteManager {
    pub fn new(default: BlockState) -> Self {
        let mut index = FxHashMap::default();
        index.insert(default.clone(), 0);
        PaletteManager {
            palette: vec![default],
            index,
        }
    }

    pub fn get_or_insert(&mut self, block: &BlockState) -> usize {
        match self.index.get(block) {
            Some(&slot) => slot,
            None => {
                let slot = self.palette.len();
                self.palette.push(block.clone());
                self.index.insert(block.clone(), slot);
                slot
            }
        }
    }

    /// Out-of-range indices resolve to the default; malformed packed data
    /// must not be able to index past the palette.
    pub fn get(&self, index: usize) -> &BlockState {
        self.palette.get(index).unwrap_or(&self.palette[0])
    }

    pub fn len(&self) -> usize {
        self.palette.len()
    }

    pub fn is_empty(&self) -> bool {
        false // index 0 always exists
    }

    /// Current bits-per-block for litematic packing (minimum 2).
    pub fn bits(&self) -> u32 {
        bits_for(self.palette.len(), 2)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockState> {
        self.palette.iter()
    }
}
