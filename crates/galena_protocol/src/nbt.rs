use std::io::Write;

use derive_more::{Deref, DerefMut, From};
use galena_nbt::schema::{self, DecodeOptions, FromNbt, ToNbt};

use crate::{Decode, Encode};

/// A packet field carried as an inline, uncompressed NBT document.
///
/// The wrapped value is bound to a compound through the NBT schema traits
/// (usually via their derive macros), so the flat packet stream simply
/// embeds the self-describing NBT bytes at the field's position.
#[derive(Copy, Clone, PartialEq, Default, Debug, Deref, DerefMut, From)]
pub struct Nbt<T>(pub T);

impl<T: ToNbt> Encode for Nbt<T> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        Ok(schema::to_binary(&self.0, w)?)
    }
}

impl<'a, T: FromNbt> Decode<'a> for Nbt<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(Self(schema::from_binary(r, DecodeOptions::default())?))
    }
}
