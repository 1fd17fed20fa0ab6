//! Readers and writers for Minecraft world-save binary formats.
//!
//! The crate is layered bottom-up:
//!
//! * [`nbt`] — a schema-directed NBT codec. Callers describe the tree they
//!   care about with a [`Shape`]; everything else is skipped structurally
//!   without allocation, and byte arrays stay zero-copy views into the
//!   input buffer.
//! * [`packed_array`] — the bit-packed long-array encoding shared by Anvil
//!   chunk sections and litematic regions, in both its tight and padded
//!   layouts.
//! * [`Virtual3DCanvas`] and [`PaletteManager`] — a sparse voxel store over
//!   unbounded signed coordinates plus the palette that names its indices.
//! * [`formats`] — the Anvil region reader and the litematic reader/writer,
//!   tying the layers together.

pub mod block_state;
pub mod canvas;
pub mod error;
pub mod formats;
pub mod nbt;
pub mod packed_array;
pub mod palette;

pub use block_state::BlockState;
pub use canvas::Virtual3DCanvas;
pub use error::{Result, SchematicError};
pub use formats::anvil::{Chunk, RegionFile};
pub use formats::litematic::{is_litematic, Litematic, LitematicWriter, Metadata};
pub use nbt::{Endian, IntArray, LongArray, Nbt, NbtTag, NbtValue, Shape};
pub use palette::PaletteManager;
