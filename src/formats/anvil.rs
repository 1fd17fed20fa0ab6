//! Anvil region-file (`r.X.Z.mca`) reader.
//!
//! A region file is an 8192-byte header (4096-byte location table plus
//! 4096-byte timestamp table) followed by sector-aligned chunk payloads,
//! each `[u32 length][u8 compression][length-1 bytes]`. The decompressed
//! payload is itself NBT, re-parsed here against a chunk schema that
//! declares both the modern and the legacy field layouts.

use std::cell::OnceCell;
use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use log::warn;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::block_state::BlockState;
use crate::error::{Result, SchematicError};
use crate::nbt::{Nbt, NbtValue, Shape};
use crate::packed_array::{bits_for, expand_packed};

const SECTOR_BYTES: usize = 4096;
const HEADER_BYTES: usize = 8192;
const SECTION_BLOCKS: usize = 4096; // 16^3
const BIOME_CELLS: usize = 64; // 4^3

/// `DataVersion` at which section block data switched to tight packing.
const TIGHT_PACKING_DATA_VERSION: i32 = 2529;
/// `DataVersion` at which sections moved to `block_states.palette`/`.data`.
const MODERN_SECTIONS_DATA_VERSION: i32 = 2834;

// ─── Compression ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
    Uncompressed = 3,
}

impl CompressionType {
    /// Values of 128 and above mark chunks stored externally in `.mcc`
    /// files; those are explicitly unsupported rather than silently wrong.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(CompressionType::Gzip),
            2 => Ok(CompressionType::Zlib),
            3 => Ok(CompressionType::Uncompressed),
            other => Err(SchematicError::UnsupportedCompression(other)),
        }
    }
}

fn decompress_chunk(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    match compression {
        CompressionType::Gzip => {
            GzDecoder::new(data).read_to_end(&mut decompressed)?;
        }
        CompressionType::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut decompressed)?;
        }
        CompressionType::Uncompressed => {
            decompressed = data.to_vec();
        }
    }
    Ok(decompressed)
}

// ─── Chunk Schema ───────────────────────────────────────────────────────────

fn block_state_shape() -> Shape {
    Shape::compound([
        ("Name", Shape::STRING),
        ("Properties", Shape::wildcard(Shape::STRING)),
    ])
}

fn modern_section_shape() -> Shape {
    Shape::compound([
        ("Y", Shape::BYTE),
        (
            "block_states",
            Shape::compound([
                ("palette", Shape::list(block_state_shape())),
                ("data", Shape::LONG_ARRAY),
            ]),
        ),
        (
            "biomes",
            Shape::compound([
                ("palette", Shape::list(Shape::STRING)),
                ("data", Shape::LONG_ARRAY),
            ]),
        ),
    ])
}

fn legacy_section_shape() -> Shape {
    Shape::compound([
        ("Y", Shape::BYTE),
        ("Palette", Shape::list(block_state_shape())),
        ("BlockStates", Shape::LONG_ARRAY),
    ])
}

/// Chunk schema spanning every supported `DataVersion`. Both the modern
/// top-level layout and the legacy `Level` wrapper are declared; the
/// hundreds of other fields a chunk carries are skipped structurally.
fn chunk_shape() -> Shape {
    Shape::compound([
        ("DataVersion", Shape::INT),
        ("xPos", Shape::INT),
        ("zPos", Shape::INT),
        ("yPos", Shape::INT),
        ("Heightmaps", Shape::wildcard(Shape::LONG_ARRAY)),
        ("sections", Shape::list(modern_section_shape())),
        (
            "Level",
            Shape::compound([
                ("xPos", Shape::INT),
                ("zPos", Shape::INT),
                ("Heightmaps", Shape::wildcard(Shape::LONG_ARRAY)),
                ("Sections", Shape::list(legacy_section_shape())),
            ]),
        ),
    ])
}

// ─── Sections ───────────────────────────────────────────────────────────────

/// Biome storage of one modern section: a 4x4x4 grid of palette indices.
#[derive(Debug, Clone)]
pub struct SectionBiomes {
    palette: Vec<SmolStr>,
    packed: Option<Vec<u8>>,
    tightly_packed: bool,
}

impl SectionBiomes {
    /// Biome at section-local block coordinates (each biome cell covers
    /// 4x4x4 blocks). `None` only for an empty palette, which real files
    /// do not produce.
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<&str> {
        let cell = (x / 4) + 4 * ((z / 4) + 4 * (y / 4));
        let index = match &self.packed {
            Some(bytes) => {
                let bits = bits_for(self.palette.len(), 1);
                crate::packed_array::read_packed(
                    bytes,
                    bits,
                    cell as usize,
                    self.tightly_packed,
                ) as usize
            }
            None => 0,
        };
        self.palette
            .get(index)
            .or_else(|| self.palette.first())
            .map(|s| s.as_str())
    }
}

/// One 16-block-tall Y slice of a chunk.
///
/// The packed block data is copied out of the transient parse buffer at
/// chunk load; expansion to per-voxel indices happens lazily on the first
/// block query and is cached.
#[derive(Debug)]
pub struct Section {
    pub y: i32,
    palette: Vec<BlockState>,
    packed: Option<Vec<u8>>,
    tightly_packed: bool,
    blocks: OnceCell<Vec<u16>>,
    biomes: Option<SectionBiomes>,
}

impl Section {
    fn expanded_blocks(&self) -> &[u16] {
        self.blocks.get_or_init(|| match &self.packed {
            Some(bytes) if self.palette.len() > 1 => {
                let bits = bits_for(self.palette.len(), 4);
                expand_packed(bytes, bits, SECTION_BLOCKS, self.tightly_packed)
                    .into_iter()
                    .map(|v| v as u16)
                    .collect()
            }
            _ => vec![0u16; SECTION_BLOCKS],
        })
    }

    /// Block state at section-local coordinates (0..16 each axis).
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> &BlockState {
        let offset = (x & 15) as usize + 16 * ((z & 15) as usize + 16 * ((y & 15) as usize));
        let index = self.expanded_blocks()[offset] as usize;
        // Defensive: malformed packed data must not index past the palette.
        self.palette.get(index).unwrap_or(&self.palette[0])
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn biomes(&self) -> Option<&SectionBiomes> {
        self.biomes.as_ref()
    }
}

// ─── Chunks ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Chunk {
    pub data_version: i32,
    pub x_pos: i32,
    pub z_pos: i32,
    pub y_pos: i32,
    sections: FxHashMap<i32, Section>,
    air: BlockState,
}

impl Chunk {
    fn from_nbt(root: &NbtValue<'_>) -> Result<Self> {
        let data_version = root.get_int("DataVersion").unwrap_or(0);
        let level = root.get("Level");

        // Modern chunks carry these at the root, legacy ones under Level;
        // prefer whichever is present.
        let field_int = |name: &str| {
            root.get_int(name)
                .or_else(|| level.and_then(|l| l.get_int(name)))
        };
        let x_pos = field_int("xPos").unwrap_or(0);
        let z_pos = field_int("zPos").unwrap_or(0);
        let y_pos = field_int("yPos").unwrap_or(0);

        let tightly_packed = data_version >= TIGHT_PACKING_DATA_VERSION;
        let section_list = root
            .get_list("sections")
            .or_else(|| level.and_then(|l| l.get_list("Sections")));

        let mut sections = FxHashMap::default();
        if let Some((_, items)) = section_list {
            for item in items {
                match Self::parse_section(item, tightly_packed) {
                    Ok(Some(section)) => {
                        sections.insert(section.y, section);
                    }
                    Ok(None) => {}
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(Chunk {
            data_version,
            x_pos,
            z_pos,
            y_pos,
            sections,
            air: BlockState::new("minecraft:air"),
        })
    }

    fn parse_section(section: &NbtValue<'_>, tightly_packed: bool) -> Result<Option<Section>> {
        let y = match section.get_byte("Y") {
            Some(y) => y as i32,
            None => return Ok(None),
        };

        // Modern layout first (block_states.palette / .data), falling back
        // to the legacy section-level Palette / BlockStates pair.
        let block_states = section.get("block_states");
        let palette_list = block_states
            .and_then(|bs| bs.get_list("palette"))
            .or_else(|| section.get_list("Palette"));
        let packed = block_states
            .and_then(|bs| bs.get_long_array("data"))
            .or_else(|| section.get_long_array("BlockStates"));

        let palette = match palette_list {
            Some((_, entries)) => {
                let mut palette = Vec::with_capacity(entries.len());
                for entry in entries {
                    palette.push(BlockState::from_nbt(entry)?);
                }
                palette
            }
            None => vec![BlockState::new("minecraft:air")],
        };
        let palette = if palette.is_empty() {
            vec![BlockState::new("minecraft:air")]
        } else {
            palette
        };

        let biomes = section.get("biomes").map(|b| SectionBiomes {
            palette: b
                .get_list("palette")
                .map(|(_, items)| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(SmolStr::new))
                        .collect()
                })
                .unwrap_or_default(),
            packed: b
                .get_long_array("data")
                .map(|array| array.raw_bytes().to_vec()),
            tightly_packed,
        });

        Ok(Some(Section {
            y,
            palette,
            // Copy out of the parse buffer; the buffer dies with this call.
            packed: packed.map(|array| array.raw_bytes().to_vec()),
            tightly_packed,
            blocks: OnceCell::new(),
            biomes,
        }))
    }

    /// Block state at chunk-local x/z (0..16) and absolute y. Coordinates
    /// in no loaded section are air, not an error.
    pub fn get_block_state(&self, x: i32, y: i32, z: i32) -> &BlockState {
        match self.sections.get(&y.div_euclid(16)) {
            Some(section) => section.get_block_state(x, y.rem_euclid(16), z),
            None => &self.air,
        }
    }

    pub fn section(&self, section_y: i32) -> Option<&Section> {
        self.sections.get(&section_y)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

// ─── Region Files ───────────────────────────────────────────────────────────

/// An in-memory region file. Chunks decompress and parse on first access
/// and are memoized for the life of the instance.
///
/// Absent data is the common case and never an error: a zero-length or
/// truncated buffer simply has no chunks.
pub struct RegionFile {
    data: Vec<u8>,
    chunks: FxHashMap<(i32, i32), Option<Chunk>>,
}

impl RegionFile {
    pub fn new(data: Vec<u8>) -> Self {
        RegionFile {
            data,
            chunks: FxHashMap::default(),
        }
    }

    /// Byte offset of the chunk payload for region-local `(x, z)`, or
    /// `None` when the chunk is absent. The header entry packs a 3-byte
    /// sector offset over a 1-byte sector count.
    pub fn chunk_offset(&self, x: i32, z: i32) -> Option<usize> {
        if self.data.len() < HEADER_BYTES {
            return None;
        }
        let entry = 4 * (((x & 31) + 32 * (z & 31)) as usize);
        let word = u32::from_be_bytes([
            self.data[entry],
            self.data[entry + 1],
            self.data[entry + 2],
            self.data[entry + 3],
        ]);
        let sector_count = word & 0xff;
        if sector_count == 0 {
            return None;
        }
        Some((word >> 8) as usize * SECTOR_BYTES)
    }

    /// Last-modified timestamp (epoch seconds) from the second header
    /// table, or `None` for absent chunks.
    pub fn chunk_timestamp(&self, x: i32, z: i32) -> Option<u32> {
        self.chunk_offset(x, z)?;
        let entry = SECTOR_BYTES + 4 * (((x & 31) + 32 * (z & 31)) as usize);
        Some(u32::from_be_bytes([
            self.data[entry],
            self.data[entry + 1],
            self.data[entry + 2],
            self.data[entry + 3],
        ]))
    }

    /// Parse one chunk, memoized. `Ok(None)` for absent chunks; errors are
    /// real parse failures (corrupt NBT, unsupported compression).
    pub fn chunk(&mut self, x: i32, z: i32) -> Result<Option<&Chunk>> {
        let key = (x & 31, z & 31);
        if !self.chunks.contains_key(&key) {
            let parsed = self.parse_chunk(key.0, key.1)?;
            self.chunks.insert(key, parsed);
        }
        Ok(self.chunks.get(&key).and_then(|chunk| chunk.as_ref()))
    }

    fn parse_chunk(&self, x: i32, z: i32) -> Result<Option<Chunk>> {
        let offset = match self.chunk_offset(x, z) {
            Some(offset) => offset,
            None => return Ok(None),
        };
        if offset + 5 > self.data.len() {
            return Ok(None);
        }

        let payload_len = u32::from_be_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]) as usize;
        if payload_len <= 1 {
            return Ok(None);
        }

        let compression = CompressionType::from_byte(self.data[offset + 4])?;
        let start = offset + 5;
        let end = start + payload_len - 1;
        if end > self.data.len() {
            return Ok(None);
        }

        let decompressed = decompress_chunk(&self.data[start..end], compression)?;
        let root = Nbt::new(chunk_shape()).parse(&decompressed)?;
        Chunk::from_nbt(&root).map(Some)
    }

    /// Load every present chunk, skipping individual failures with a
    /// warning. Returns the number of chunks loaded.
    pub fn load_all(&mut self) -> usize {
        let mut loaded = 0;
        for z in 0..32 {
            for x in 0..32 {
                match self.chunk(x, z) {
                    Ok(Some(_)) => loaded += 1,
                    Ok(None) => {}
                    Err(err) => {
                        warn!("skipping malformed chunk ({}, {}): {}", x, z, err);
                        self.chunks.insert((x, z), None);
                    }
                }
            }
        }
        loaded
    }

    /// Region-local coordinates of every chunk the header marks present.
    pub fn present_chunks(&self) -> Vec<(i32, i32)> {
        let mut present = Vec::new();
        for z in 0..32 {
            for x in 0..32 {
                if self.chunk_offset(x, z).is_some() {
                    present.push((x, z));
                }
            }
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nbt::{Endian, LongArray, NbtTag};
    use crate::packed_array::pack;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::borrow::Cow;
    use std::io::Write;

    /// Serialize a chunk NBT tree and frame it into a minimal region file
    /// at chunk slot (0, 0).
    fn region_with_chunk(chunk_nbt: &NbtValue<'_>, shape: Shape, compression_byte: u8) -> Vec<u8> {
        let nbt_bytes = Nbt::new(shape).serialize(chunk_nbt).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&nbt_bytes).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut data = vec![0u8; HEADER_BYTES];
        // location entry for (0,0): sector offset 2, one sector
        let payload_len = (compressed.len() + 1) as u32;
        let sectors = ((payload_len as usize + 4) + SECTOR_BYTES - 1) / SECTOR_BYTES;
        data[0] = 0;
        data[1] = 0;
        data[2] = 2;
        data[3] = sectors as u8;

        data.extend_from_slice(&payload_len.to_be_bytes());
        data.push(compression_byte);
        data.extend_from_slice(&compressed);
        let padding = (SECTOR_BYTES - (data.len() % SECTOR_BYTES)) % SECTOR_BYTES;
        data.extend(std::iter::repeat(0).take(padding));
        data
    }

    fn palette_nbt(names: &[&str]) -> NbtValue<'static> {
        NbtValue::List(
            NbtTag::Compound,
            names
                .iter()
                .map(|name| BlockState::new(*name).to_nbt())
                .collect(),
        )
    }

    /// 4096 block indices cycling over the palette.
    fn cycling_blocks(palette_len: usize) -> Vec<u32> {
        (0..SECTION_BLOCKS as u32)
            .map(|i| i % palette_len as u32)
            .collect()
    }

    fn modern_chunk(data_version: i32) -> NbtValue<'static> {
        let blocks = cycling_blocks(3);
        let tight = data_version >= TIGHT_PACKING_DATA_VERSION;
        let packed = pack(&blocks, bits_for(3, 4), tight);
        NbtValue::Compound(vec![
            ("DataVersion".into(), NbtValue::Int(data_version)),
            ("xPos".into(), NbtValue::Int(3)),
            ("zPos".into(), NbtValue::Int(-7)),
            ("yPos".into(), NbtValue::Int(-4)),
            (
                "sections".into(),
                NbtValue::List(
                    NbtTag::Compound,
                    vec![NbtValue::Compound(vec![
                        ("Y".into(), NbtValue::Byte(0)),
                        (
                            "block_states".into(),
                            NbtValue::Compound(vec![
                                (
                                    "palette".into(),
                                    palette_nbt(&[
                                        "minecraft:air",
                                        "minecraft:stone",
                                        "minecraft:dirt",
                                    ]),
                                ),
                                (
                                    "data".into(),
                                    NbtValue::LongArray(LongArray::from_longs(
                                        &packed,
                                        Endian::Big,
                                    )),
                                ),
                            ]),
                        ),
                        (
                            "biomes".into(),
                            NbtValue::Compound(vec![(
                                "palette".into(),
                                NbtValue::List(
                                    NbtTag::String,
                                    vec![NbtValue::String(Cow::Borrowed("minecraft:plains"))],
                                ),
                            )]),
                        ),
                    ])],
                ),
            ),
        ])
    }

    fn legacy_chunk(data_version: i32) -> NbtValue<'static> {
        let blocks = cycling_blocks(2);
        let tight = data_version >= TIGHT_PACKING_DATA_VERSION;
        let packed = pack(&blocks, bits_for(2, 4), tight);
        NbtValue::Compound(vec![
            ("DataVersion".into(), NbtValue::Int(data_version)),
            (
                "Level".into(),
                NbtValue::Compound(vec![
                    ("xPos".into(), NbtValue::Int(1)),
                    ("zPos".into(), NbtValue::Int(2)),
                    (
                        "Sections".into(),
                        NbtValue::List(
                            NbtTag::Compound,
                            vec![NbtValue::Compound(vec![
                                ("Y".into(), NbtValue::Byte(4)),
                                (
                                    "Palette".into(),
                                    palette_nbt(&["minecraft:air", "minecraft:bedrock"]),
                                ),
                                (
                                    "BlockStates".into(),
                                    NbtValue::LongArray(LongArray::from_longs(
                                        &packed,
                                        Endian::Big,
                                    )),
                                ),
                            ])],
                        ),
                    ),
                ]),
            ),
        ])
    }

    // Write-side schema: same fields as chunk_shape but the test builds
    // values for exactly the declared keys, so reuse works directly.
    fn write_shape() -> Shape {
        chunk_shape()
    }

    #[test]
    fn empty_region_has_no_chunks() {
        let mut region = RegionFile::new(Vec::new());
        assert!(region.present_chunks().is_empty());
        assert_eq!(region.chunk(0, 0).unwrap().map(|c| c.data_version), None);
        assert_eq!(region.chunk_offset(5, 9), None);
    }

    #[test]
    fn absent_chunk_is_none_not_error() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        assert!(region.chunk(1, 0).unwrap().is_none());
        assert!(region.chunk(31, 31).unwrap().is_none());
    }

    #[test]
    fn modern_chunk_roundtrips_block_for_block() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        let chunk = region.chunk(0, 0).unwrap().expect("chunk present");
        assert_eq!(chunk.data_version, 3700);
        assert_eq!(chunk.x_pos, 3);
        assert_eq!(chunk.z_pos, -7);
        assert_eq!(chunk.y_pos, -4);

        let blocks = cycling_blocks(3);
        let palette = ["minecraft:air", "minecraft:stone", "minecraft:dirt"];
        for (i, &expected) in blocks.iter().enumerate() {
            let x = (i % 16) as i32;
            let z = ((i / 16) % 16) as i32;
            let y = (i / 256) as i32;
            assert_eq!(
                chunk.get_block_state(x, y, z).name(),
                palette[expected as usize]
            );
        }
    }

    #[test]
    fn modern_chunk_reads_section_biomes() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        let chunk = region.chunk(0, 0).unwrap().expect("chunk present");
        let section = chunk.section(0).expect("section 0");
        let biomes = section.biomes().expect("biome data");
        assert_eq!(biomes.get(0, 0, 0), Some("minecraft:plains"));
        assert_eq!(biomes.get(15, 15, 15), Some("minecraft:plains"));
    }

    #[test]
    fn legacy_chunk_uses_padded_packing() {
        // DataVersion < 2529: padded layout, Level.* field set.
        let data = region_with_chunk(&legacy_chunk(2230), write_shape(), 2);
        let mut region = RegionFile::new(data);
        let chunk = region.chunk(0, 0).unwrap().expect("chunk present");
        assert_eq!(chunk.x_pos, 1);
        assert_eq!(chunk.z_pos, 2);

        let blocks = cycling_blocks(2);
        for (i, &expected) in blocks.iter().enumerate().step_by(7) {
            let x = (i % 16) as i32;
            let z = ((i / 16) % 16) as i32;
            let y = 64 + (i / 256) as i32; // section Y = 4
            let name = if expected == 0 {
                "minecraft:air"
            } else {
                "minecraft:bedrock"
            };
            assert_eq!(chunk.get_block_state(x, y, z).name(), name, "index {}", i);
        }
    }

    #[test]
    fn out_of_section_y_is_air() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        let chunk = region.chunk(0, 0).unwrap().expect("chunk present");
        assert_eq!(chunk.get_block_state(0, 300, 0).name(), "minecraft:air");
        assert_eq!(chunk.get_block_state(0, -50, 0).name(), "minecraft:air");
    }

    #[test]
    fn external_mcc_chunks_are_rejected() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 130);
        let mut region = RegionFile::new(data);
        let err = region.chunk(0, 0).unwrap_err();
        assert!(matches!(
            err,
            SchematicError::UnsupportedCompression(130)
        ));
    }

    #[test]
    fn chunk_parse_is_memoized() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        let first = region.chunk(0, 0).unwrap().expect("chunk") as *const Chunk;
        let second = region.chunk(0, 0).unwrap().expect("chunk") as *const Chunk;
        assert_eq!(first, second);
    }

    #[test]
    fn load_all_counts_present_chunks() {
        let data = region_with_chunk(&modern_chunk(3700), write_shape(), 2);
        let mut region = RegionFile::new(data);
        assert_eq!(region.load_all(), 1);
        assert_eq!(region.present_chunks(), vec![(0, 0)]);
    }
}
