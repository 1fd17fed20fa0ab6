//! End-to-end litematic tests through the public API only.

use anvilite::{is_litematic, BlockState, Litematic, LitematicWriter};

#[test]
fn large_structure_survives_a_full_roundtrip() {
    let mut writer = LitematicWriter::new("tower");
    writer.metadata.name = Some("Tower".to_string());
    writer.metadata.author = Some("tests".to_string());

    // A 9x20x9 hollow tower with alternating wall materials and a carpet
    // of distinct states on top, enough to push the palette past 4 bits.
    let wall_a = BlockState::new("minecraft:stone_bricks");
    let wall_b = BlockState::new("minecraft:mossy_stone_bricks");
    for y in 0..20 {
        for x in 0..9 {
            for z in 0..9 {
                let on_wall = x == 0 || x == 8 || z == 0 || z == 8;
                if on_wall {
                    let wall = if (x + y + z) % 2 == 0 { &wall_a } else { &wall_b };
                    writer.set_block(x, y, z, wall);
                }
            }
        }
    }
    let mut cap = Vec::new();
    for i in 0..20 {
        cap.push(
            BlockState::new("minecraft:repeater")
                .with_property("delay", format!("{}", i % 4 + 1))
                .with_property("facing", ["north", "south", "east", "west"][(i / 4) % 4]),
        );
    }
    for (i, state) in cap.iter().enumerate() {
        writer.set_block((i % 9) as i32, 20, (i / 9) as i32, state);
    }

    let bytes = writer.save().unwrap();
    assert!(is_litematic(&bytes));

    let schematic = Litematic::from_bytes(&bytes).unwrap();
    assert_eq!(schematic.metadata.name.as_deref(), Some("Tower"));
    assert_eq!(
        (schematic.width(), schematic.height(), schematic.length()),
        (9, 21, 9)
    );

    for y in 0..20 {
        for x in 0..9 {
            for z in 0..9 {
                let on_wall = x == 0 || x == 8 || z == 0 || z == 8;
                let block = schematic.get_block(x, y, z);
                if on_wall {
                    let expected = if (x + y + z) % 2 == 0 { &wall_a } else { &wall_b };
                    assert_eq!(block, expected, "at ({}, {}, {})", x, y, z);
                } else {
                    assert_eq!(block.name(), "minecraft:air");
                }
            }
        }
    }
    for (i, state) in cap.iter().enumerate() {
        assert_eq!(
            schematic.get_block((i % 9) as i32, 20, (i / 9) as i32),
            state
        );
    }
}

#[test]
fn roundtrip_is_stable_under_reserialization() {
    let mut writer = LitematicWriter::new("main");
    writer.metadata.created = Some(42);
    let stone = BlockState::new("minecraft:stone");
    writer.set_block(0, 0, 0, &stone);
    writer.set_block(3, 1, 2, &stone);

    let first = Litematic::from_bytes(&writer.save().unwrap()).unwrap();

    let mut rewriter = LitematicWriter::new("main");
    rewriter.metadata.created = Some(42);
    for x in 0..first.width() {
        for y in 0..first.height() {
            for z in 0..first.length() {
                let block = first.get_block(x, y, z);
                if block.name() != "minecraft:air" {
                    let block = block.clone();
                    rewriter.set_block(x, y, z, &block);
                }
            }
        }
    }
    let second = Litematic::from_bytes(&rewriter.save().unwrap()).unwrap();

    assert_eq!(
        (second.width(), second.height(), second.length()),
        (first.width(), first.height(), first.length())
    );
    for x in 0..first.width() {
        for y in 0..first.height() {
            for z in 0..first.length() {
                assert_eq!(first.get_block(x, y, z), second.get_block(x, y, z));
            }
        }
    }
}

#[test]
fn detection_rejects_other_payloads() {
    assert!(!is_litematic(b""));
    assert!(!is_litematic(b"\x1f\x8b")); // gzip magic, truncated
    assert!(!is_litematic(&[0u8; 512]));
}
