//! Region-file tests through the public API, using hand-framed region
//! buffers with uncompressed chunk payloads.

use std::borrow::Cow;

use anvilite::packed_array::{bits_for, pack};
use anvilite::{BlockState, Endian, LongArray, Nbt, NbtTag, NbtValue, RegionFile, Shape};

fn chunk_write_shape() -> Shape {
    Shape::compound([
        ("DataVersion", Shape::INT),
        ("xPos", Shape::INT),
        ("zPos", Shape::INT),
        ("yPos", Shape::INT),
        (
            "sections",
            Shape::list(Shape::compound([
                ("Y", Shape::BYTE),
                (
                    "block_states",
                    Shape::compound([
                        (
                            "palette",
                            Shape::list(Shape::compound([
                                ("Name", Shape::STRING),
                                ("Properties", Shape::wildcard(Shape::STRING)),
                            ])),
                        ),
                        ("data", Shape::LONG_ARRAY),
                    ]),
                ),
            ])),
        ),
    ])
}

fn checker_section(y: i8) -> NbtValue<'static> {
    // 4096 blocks alternating air/obsidian by parity of x+y+z.
    let blocks: Vec<u32> = (0..4096u32)
        .map(|i| {
            let (x, z, y) = (i % 16, (i / 16) % 16, i / 256);
            (x + z + y) % 2
        })
        .collect();
    let packed = pack(&blocks, bits_for(2, 4), true);
    NbtValue::Compound(vec![
        ("Y".into(), NbtValue::Byte(y)),
        (
            "block_states".into(),
            NbtValue::Compound(vec![
                (
                    "palette".into(),
                    NbtValue::List(
                        NbtTag::Compound,
                        vec![
                            BlockState::new("minecraft:air").to_nbt(),
                            BlockState::new("minecraft:obsidian").to_nbt(),
                        ],
                    ),
                ),
                (
                    "data".into(),
                    NbtValue::LongArray(LongArray::from_longs(&packed, Endian::Big)),
                ),
            ]),
        ),
    ])
}

fn chunk_nbt(sections: Vec<NbtValue<'static>>) -> NbtValue<'static> {
    NbtValue::Compound(vec![
        ("DataVersion".into(), NbtValue::Int(3700)),
        ("xPos".into(), NbtValue::Int(0)),
        ("zPos".into(), NbtValue::Int(0)),
        ("yPos".into(), NbtValue::Int(-4)),
        ("sections".into(), NbtValue::List(NbtTag::Compound, sections)),
    ])
}

/// Frame chunk payloads into a region buffer at the given slots,
/// uncompressed (compression type 3).
fn region_bytes(chunks: &[((i32, i32), Vec<u8>)]) -> Vec<u8> {
    let mut data = vec![0u8; 8192];
    for ((x, z), payload) in chunks {
        let sector = data.len() / 4096;
        let entry = 4 * ((x & 31) + 32 * (z & 31)) as usize;
        let sectors_used = (payload.len() + 5 + 4095) / 4096;
        data[entry] = ((sector >> 16) & 0xff) as u8;
        data[entry + 1] = ((sector >> 8) & 0xff) as u8;
        data[entry + 2] = (sector & 0xff) as u8;
        data[entry + 3] = sectors_used as u8;
        // timestamp table entry
        let ts = 4096 + entry;
        data[ts..ts + 4].copy_from_slice(&1_700_000_000u32.to_be_bytes());

        data.extend_from_slice(&((payload.len() + 1) as u32).to_be_bytes());
        data.push(3);
        data.extend_from_slice(payload);
        let pad = (4096 - data.len() % 4096) % 4096;
        data.extend(std::iter::repeat(0).take(pad));
    }
    data
}

#[test]
fn multiple_chunks_parse_independently() {
    let codec = Nbt::new(chunk_write_shape());
    let one = codec.serialize(&chunk_nbt(vec![checker_section(0)])).unwrap();
    let two = codec
        .serialize(&chunk_nbt(vec![checker_section(0), checker_section(1)]))
        .unwrap();
    let mut region = RegionFile::new(region_bytes(&[((0, 0), one), ((5, 9), two)]));

    assert_eq!(region.present_chunks(), vec![(0, 0), (5, 9)]);
    assert_eq!(region.chunk_timestamp(5, 9), Some(1_700_000_000));
    assert_eq!(region.chunk_timestamp(1, 1), None);

    let first = region.chunk(0, 0).unwrap().expect("chunk at (0,0)");
    assert_eq!(first.section_count(), 1);
    assert_eq!(first.get_block_state(0, 0, 0).name(), "minecraft:air");
    assert_eq!(first.get_block_state(1, 0, 0).name(), "minecraft:obsidian");

    let second = region.chunk(5, 9).unwrap().expect("chunk at (5,9)");
    assert_eq!(second.section_count(), 2);
    // parity flips with y across the section boundary
    assert_eq!(second.get_block_state(0, 15, 0).name(), "minecraft:obsidian");
    assert_eq!(second.get_block_state(0, 16, 0).name(), "minecraft:air");
}

#[test]
fn truncated_region_reads_as_empty() {
    for len in [0usize, 100, 4096, 8191] {
        let mut region = RegionFile::new(vec![0u8; len]);
        assert!(region.present_chunks().is_empty());
        assert!(region.chunk(0, 0).unwrap().is_none());
    }
}

#[test]
fn corrupt_nbt_payload_is_an_error() {
    let garbage = vec![0xffu8; 64];
    let mut region = RegionFile::new(region_bytes(&[((0, 0), garbage)]));
    assert!(region.chunk(0, 0).is_err());
    // but load_all degrades gracefully
    assert_eq!(region.load_all(), 0);
}

#[test]
fn extra_chunk_fields_are_skipped() {
    // Serialize with a wider schema than the reader declares; the reader
    // must skip the unknown Status string and InhabitedTime long.
    let shape = Shape::compound([
        ("DataVersion", Shape::INT),
        ("Status", Shape::STRING),
        ("InhabitedTime", Shape::LONG),
        ("xPos", Shape::INT),
        ("zPos", Shape::INT),
        ("yPos", Shape::INT),
        (
            "sections",
            Shape::list(Shape::compound([
                ("Y", Shape::BYTE),
                (
                    "block_states",
                    Shape::compound([
                        (
                            "palette",
                            Shape::list(Shape::compound([("Name", Shape::STRING)])),
                        ),
                        ("data", Shape::LONG_ARRAY),
                    ]),
                ),
            ])),
        ),
    ]);
    let mut fields = match chunk_nbt(vec![checker_section(2)]) {
        NbtValue::Compound(fields) => fields,
        _ => unreachable!(),
    };
    fields.push((
        "Status".into(),
        NbtValue::String(Cow::Borrowed("minecraft:full")),
    ));
    fields.push(("InhabitedTime".into(), NbtValue::Long(123456)));
    let payload = Nbt::new(shape).serialize(&NbtValue::Compound(fields)).unwrap();

    let mut region = RegionFile::new(region_bytes(&[((0, 0), payload)]));
    let chunk = region.chunk(0, 0).unwrap().expect("chunk present");
    assert_eq!(chunk.get_block_state(3, 32, 2).name(), "minecraft:obsidian");
}
