//! Bit-packed long-array codec.
//!
//! Palette indices are stored as fixed-width unsigned integers packed into
//! big-endian 64-bit words, starting at each word's low bits. Two layouts
//! exist in the wild: *tightly packed*, where an item may straddle a word
//! boundary, and *padded*, where the trailing `64 % bits` bits of every
//! word are unused. Litematic block arrays are always tight; Anvil chunk
//! sections use either depending on `DataVersion`.

/// Width of each packed item for a palette of `palette_len` entries,
/// clamped to the format-specific minimum: 2 for litematic block palettes,
/// 4 for Anvil chunk sections, 1 for biome palettes. The minimums differ
/// on purpose; they match the formats, not each other.
pub fn bits_for(palette_len: usize, min: u32) -> u32 {
    if palette_len <= 1 {
        min
    } else {
        let bits = usize::BITS - (palette_len - 1).leading_zeros();
        bits.max(min)
    }
}

/// One big-endian 64-bit word from `buf`, zero-filled past the end.
/// A tightly-packed array's final item may straddle into a word that was
/// never written; reading it as zero is correct, not an error.
fn word_at(buf: &[u8], word_index: usize) -> u64 {
    let start = word_index * 8;
    if start >= buf.len() {
        return 0;
    }
    let mut raw = [0u8; 8];
    let available = (buf.len() - start).min(8);
    raw[..available].copy_from_slice(&buf[start..start + available]);
    u64::from_be_bytes(raw)
}

/// Read the item at `index` from a packed array.
pub fn read_packed(buf: &[u8], bits_per_item: u32, index: usize, tightly_packed: bool) -> u64 {
    let bits = bits_per_item as usize;
    let bit_index = if tightly_packed {
        index * bits
    } else {
        let items_per_word = 64 / bits;
        let unused_per_word = 64 % bits;
        index * bits + (index / items_per_word) * unused_per_word
    };

    let word_index = bit_index / 64;
    let offset = bit_index % 64;
    let mask = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };

    let mut value = word_at(buf, word_index) >> offset;
    if offset + bits > 64 {
        value |= word_at(buf, word_index + 1) << (64 - offset);
    }
    value & mask
}

/// Materialize `len` items for random access. Used per section (4096
/// blocks) or per biome grid (64 cells), never across a whole region.
pub fn expand_packed(buf: &[u8], bits_per_item: u32, len: usize, tightly_packed: bool) -> Vec<u32> {
    let mut out = Vec::with_capacity(len);
    for index in 0..len {
        out.push(read_packed(buf, bits_per_item, index, tightly_packed) as u32);
    }
    out
}

/// Pack a sequence of items into 64-bit words.
///
/// The tight path runs a 128-bit accumulator and flushes a completed low
/// word whenever 64 bits are pending; the padded path fills each word with
/// `64 / bits` items and moves on.
pub fn pack(values: &[u32], bits_per_item: u32, tightly_packed: bool) -> Vec<i64> {
    let bits = bits_per_item as usize;
    let mask = if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };

    if tightly_packed {
        let mut out = Vec::with_capacity((values.len() * bits + 63) / 64);
        let mut acc: u128 = 0;
        let mut pending = 0usize;
        for &value in values {
            acc |= ((value as u64 & mask) as u128) << pending;
            pending += bits;
            if pending >= 64 {
                out.push(acc as u64 as i64);
                acc >>= 64;
                pending -= 64;
            }
        }
        if pending > 0 {
            out.push(acc as u64 as i64);
        }
        out
    } else {
        let items_per_word = 64 / bits;
        let mut out = Vec::with_capacity((values.len() + items_per_word - 1) / items_per_word);
        for chunk in values.chunks(items_per_word) {
            let mut word: u64 = 0;
            for (slot, &value) in chunk.iter().enumerate() {
                word |= (value as u64 & mask) << (slot * bits);
            }
            out.push(word as i64);
        }
        out
    }
}

/// Big-endian byte form of a word sequence, the layout [`read_packed`]
/// consumes and NBT `LongArray` payloads carry.
pub fn longs_to_be_bytes(longs: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(longs.len() * 8);
    for &word in longs {
        out.extend_from_slice(&word.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn nibbles_count_up_in_a_single_word() {
        let buf = [0xfeu8, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10];
        let values: Vec<u64> = (0..16).map(|i| read_packed(&buf, 4, i, true)).collect();
        let expected: Vec<u64> = (0..16).collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn straddling_item_combines_adjacent_words() {
        // 5-bit items, item 12 starts at bit 60 and ends in word 1.
        let values: Vec<u32> = (0..26).map(|i| (i * 7) % 32).collect();
        let packed = pack(&values, 5, true);
        let bytes = longs_to_be_bytes(&packed);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(read_packed(&bytes, 5, i, true), v as u64, "item {}", i);
        }
    }

    #[test]
    fn final_straddling_read_past_buffer_is_zero_filled() {
        // One word only; a tight 5-bit read at index 12 touches word 1,
        // which does not exist.
        let bytes = longs_to_be_bytes(&[-1i64]);
        assert_eq!(read_packed(&bytes, 5, 12, true), 0xf);
    }

    #[test]
    fn padded_layout_skips_trailing_bits() {
        // 5 bits padded: 12 items per word, 4 dead bits on top.
        let values: Vec<u32> = (0..24).map(|i| 31 - (i % 32)).collect();
        let packed = pack(&values, 5, false);
        assert_eq!(packed.len(), 2);
        let bytes = longs_to_be_bytes(&packed);
        let expanded = expand_packed(&bytes, 5, values.len(), false);
        assert_eq!(expanded, values);
    }

    #[test]
    fn roundtrip_all_widths_both_layouts() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x1221);
        for bits in 2u32..=16 {
            for &tight in &[true, false] {
                let len = 300;
                let values: Vec<u32> =
                    (0..len).map(|_| rng.gen_range(0..(1u32 << bits))).collect();
                let packed = pack(&values, bits, tight);
                let bytes = longs_to_be_bytes(&packed);
                let expanded = expand_packed(&bytes, bits, len, tight);
                assert_eq!(expanded, values, "bits={} tight={}", bits, tight);
            }
        }
    }

    #[test]
    fn bits_for_clamps_to_format_minimum() {
        assert_eq!(bits_for(1, 2), 2);
        assert_eq!(bits_for(2, 2), 2);
        assert_eq!(bits_for(4, 2), 2);
        assert_eq!(bits_for(5, 2), 3);
        assert_eq!(bits_for(16, 4), 4);
        assert_eq!(bits_for(17, 4), 5);
        assert_eq!(bits_for(1, 1), 1);
        assert_eq!(bits_for(2, 1), 1);
        assert_eq!(bits_for(3, 1), 2);
        assert_eq!(bits_for(1, 4), 4);
    }
}
