//! Support for serializing and deserializing compounds in the binary NBT
//! format.
//!
//! A binary NBT document is a single named compound: a `TAG_Compound` byte,
//! the root name (typically the empty string), the compound body, and a
//! terminating `TAG_End`.

mod decode;
mod encode;
#[cfg(test)]
mod tests;

pub use decode::from_binary;
pub use encode::{to_binary, written_size};
