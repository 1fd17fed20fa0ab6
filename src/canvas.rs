//! Sparse, unbounded 3D voxel store.
//!
//! Values are small palette indices; 0 is the caller's default (air or
//! void) and is what any never-written coordinate reads as. Storage is a
//! dictionary of dense 16^3 segments so that arbitrarily negative or
//! positive coordinates cost nothing until written.

use std::cell::Cell;

use rustc_hash::FxHashMap;

const DEFAULT_SEGMENT_EDGE: usize = 16;

/// One dense segment. Starts 8-bit and is promoted to 16-bit in place the
/// first time a value above 255 lands in it; only that segment pays the
/// copy.
enum Segment {
    Narrow(Box<[u8]>),
    Wide(Box<[u16]>),
}

impl Segment {
    fn narrow(volume: usize) -> Self {
        Segment::Narrow(vec![0u8; volume].into_boxed_slice())
    }

    fn promote(&mut self) {
        if let Segment::Narrow(values) = self {
            let wide: Vec<u16> = values.iter().map(|&v| v as u16).collect();
            *self = Segment::Wide(wide.into_boxed_slice());
        }
    }

    fn get(&self, offset: usize) -> u16 {
        match self {
            Segment::Narrow(values) => values[offset] as u16,
            Segment::Wide(values) => values[offset],
        }
    }

    fn set(&mut self, offset: usize, value: u16) {
        if value > u8::MAX as u16 {
            self.promote();
        }
        match self {
            Segment::Narrow(values) => values[offset] = value as u8,
            Segment::Wide(values) => values[offset] = value,
        }
    }

    fn is_wide(&self) -> bool {
        matches!(self, Segment::Wide(_))
    }
}

#[derive(Clone, Copy)]
struct Extents {
    min: (i32, i32, i32),
    max: (i32, i32, i32),
}

type SegmentKey = (i32, i32, i32);

/// Sparse voxel canvas with running extents.
///
/// Consumers iterate voxel space in nested loops, so consecutive calls
/// almost always land in the segment of the previous call; a single-entry
/// cache short-circuits the map lookup for that case.
pub struct Virtual3DCanvas {
    edge: usize,
    shift: u32,
    coord_mask: i32,
    segments: Vec<Segment>,
    index: FxHashMap<SegmentKey, usize>,
    last: Cell<Option<(SegmentKey, usize)>>,
    extents: Option<Extents>,
}

impl Default for Virtual3DCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Virtual3DCanvas {
    pub fn new() -> Self {
        Self::with_segment_edge(DEFAULT_SEGMENT_EDGE)
    }

    /// Coordinate masking relies on the edge being a power of two; anything
    /// else is a configuration bug, not a runtime condition.
    pub fn with_segment_edge(edge: usize) -> Self {
        assert!(
            edge.is_power_of_two(),
            "segment edge must be a power of two, got {}",
            edge
        );
        Virtual3DCanvas {
            edge,
            shift: edge.trailing_zeros(),
            coord_mask: (edge - 1) as i32,
            segments: Vec::new(),
            index: FxHashMap::default(),
            last: Cell::new(None),
            extents: None,
        }
    }

    #[inline(always)]
    fn segment_key(&self, x: i32, y: i32, z: i32) -> SegmentKey {
        (x >> self.shift, y >> self.shift, z >> self.shift)
    }

    #[inline(always)]
    fn local_offset(&self, x: i32, y: i32, z: i32) -> usize {
        let lx = (x & self.coord_mask) as usize;
        let ly = (y & self.coord_mask) as usize;
        let lz = (z & self.coord_mask) as usize;
        lx + self.edge * (lz + self.edge * ly)
    }

    fn lookup(&self, key: SegmentKey) -> Option<usize> {
        if let Some((cached_key, slot)) = self.last.get() {
            if cached_key == key {
                return Some(slot);
            }
        }
        let slot = *self.index.get(&key)?;
        self.last.set(Some((key, slot)));
        Some(slot)
    }

    pub fn get(&self, x: i32, y: i32, z: i32) -> u16 {
        match self.lookup(self.segment_key(x, y, z)) {
            Some(slot) => self.segments[slot].get(self.local_offset(x, y, z)),
            None => 0,
        }
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, value: u16) {
        match &mut self.extents {
            Some(extents) => {
                extents.min.0 = extents.min.0.min(x);
                extents.min.1 = extents.min.1.min(y);
                extents.min.2 = extents.min.2.min(z);
                extents.max.0 = extents.max.0.max(x);
                extents.max.1 = extents.max.1.max(y);
                extents.max.2 = extents.max.2.max(z);
            }
            None => {
                self.extents = Some(Extents {
                    min: (x, y, z),
                    max: (x, y, z),
                });
            }
        }

        let key = self.segment_key(x, y, z);
        let slot = match self.lookup(key) {
            Some(slot) => slot,
            None => {
                let slot = self.segments.len();
                self.segments
                    .push(Segment::narrow(self.edge * self.edge * self.edge));
                self.index.insert(key, slot);
                self.last.set(Some((key, slot)));
                slot
            }
        };
        let offset = self.local_offset(x, y, z);
        self.segments[slot].set(offset, value);
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_none()
    }

    /// Extents default to a 1x1x1 box at the origin until the first write.
    pub fn min(&self) -> (i32, i32, i32) {
        self.extents.map(|e| e.min).unwrap_or((0, 0, 0))
    }

    pub fn max(&self) -> (i32, i32, i32) {
        self.extents.map(|e| e.max).unwrap_or((0, 0, 0))
    }

    pub fn width(&self) -> i32 {
        self.max().0 - self.min().0 + 1
    }

    pub fn height(&self) -> i32 {
        self.max().1 - self.min().1 + 1
    }

    pub fn length(&self) -> i32 {
        self.max().2 - self.min().2 + 1
    }

    /// Flatten the bounding box into one dense array (x fastest, then z,
    /// then y — the litematic block order) plus the non-zero count.
    pub fn get_all_blocks(&self) -> (Vec<u16>, usize) {
        let (min, max) = (self.min(), self.max());
        let volume = self.width() as usize * self.height() as usize * self.length() as usize;
        let mut blocks = vec![0u16; volume];
        let mut non_zero = 0usize;
        let mut cursor = 0usize;
        for y in min.1..=max.1 {
            for z in min.2..=max.2 {
                for x in min.0..=max.0 {
                    let value = self.get(x, y, z);
                    if value != 0 {
                        non_zero += 1;
                    }
                    blocks[cursor] = value;
                    cursor += 1;
                }
            }
        }
        (blocks, non_zero)
    }

    #[cfg(test)]
    fn segment_is_wide(&self, x: i32, y: i32, z: i32) -> Option<bool> {
        self.lookup(self.segment_key(x, y, z))
            .map(|slot| self.segments[slot].is_wide())
    }
}
