use std::io::Write;

use anyhow::ensure;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{Decode, Encode};

impl Encode for bool {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(*self as u8)?)
    }

    fn encode_slice(slice: &[bool], mut w: impl Write) -> anyhow::Result<()> {
        // SAFETY: bool has the same layout as u8.
        let bytes = unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len()) };
        Ok(w.write_all(bytes)?)
    }
}

impl Decode<'_> for bool {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let n = r.read_u8()?;
        ensure!(n <= 1, "decoded boolean is not 0 or 1 (got {n})");
        Ok(n == 1)
    }
}

impl Encode for u8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(*self)?)
    }

    fn encode_slice(slice: &[u8], mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_all(slice)?)
    }
}

impl Decode<'_> for u8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i8(*self)?)
    }

    fn encode_slice(slice: &[i8], mut w: impl Write) -> anyhow::Result<()> {
        // SAFETY: i8 has the same layout as u8.
        let bytes = unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, slice.len()) };
        Ok(w.write_all(bytes)?)
    }
}

impl Decode<'_> for i8 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i8()?)
    }
}

macro_rules! impl_int {
    ($($typ:ty, $write:ident, $read:ident)*) => {
        $(
            impl Encode for $typ {
                fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
                    Ok(w.$write::<BigEndian>(*self)?)
                }
            }

            impl Decode<'_> for $typ {
                fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
                    Ok(r.$read::<BigEndian>()?)
                }
            }
        )*
    }
}

impl_int! {
    u16, write_u16, read_u16
    i16, write_i16, read_i16
    u32, write_u32, read_u32
    i32, write_i32, read_i32
    u64, write_u64, read_u64
    i64, write_i64, read_i64
    u128, write_u128, read_u128
    i128, write_i128, read_i128
}

/// Floating point values travel as their IEEE-754 bit patterns, big-endian.
impl Encode for f32 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_f32::<BigEndian>(*self)?)
    }
}

impl Decode<'_> for f32 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_f32::<BigEndian>()?)
    }
}

impl Encode for f64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_f64::<BigEndian>(*self)?)
    }
}

impl Decode<'_> for f64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_f64::<BigEndian>()?)
    }
}
