//! File-format front ends built on the NBT core.

pub mod anvil;
pub mod litematic;
