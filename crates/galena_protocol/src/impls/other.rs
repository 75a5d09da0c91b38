use std::io::Write;

use galena_nbt::Compound;
use uuid::Uuid;

use crate::{Decode, Encode};

/// Options carry an inline bool prefix. (Optionals whose presence is carried
/// by a *separate* field use the `#[packet(present = ...)]` derive attribute
/// instead.)
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        match self {
            Some(t) => {
                true.encode(&mut w)?;
                t.encode(w)
            }
            None => false.encode(w),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(if bool::decode(r)? {
            Some(T::decode(r)?)
        } else {
            None
        })
    }
}

/// UUIDs are 16 raw big-endian bytes.
impl Encode for Uuid {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_u128().encode(w)
    }
}

impl<'a> Decode<'a> for Uuid {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        u128::decode(r).map(Uuid::from_u128)
    }
}

/// An untyped NBT compound embedded in the packet stream.
impl Encode for Compound {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        Ok(galena_nbt::to_binary(self, w, "")?)
    }
}

impl Decode<'_> for Compound {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        // A lone TAG_End stands for the null compound.
        if r.first() == Some(&0) {
            *r = &r[1..];
            return Ok(Compound::new());
        }

        Ok(galena_nbt::from_binary(r)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_is_sixteen_raw_bytes() {
        let uuid = Uuid::from_u128(0x0102030405060708090A0B0C0D0E0F10);

        let mut buf = vec![];
        uuid.encode(&mut buf).unwrap();

        assert_eq!(
            buf,
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]
        );

        assert_eq!(Uuid::decode(&mut buf.as_slice()).unwrap(), uuid);
    }

    #[test]
    fn untyped_compound_round_trip() {
        let c = galena_nbt::compound! {
            "piglin_safe" => false,
            "logical_height" => 256,
        };

        let mut buf = vec![];
        c.encode(&mut buf).unwrap();

        let mut slice = buf.as_slice();
        assert_eq!(Compound::decode(&mut slice).unwrap(), c);
        assert!(slice.is_empty());
    }

    #[test]
    fn lone_end_tag_is_the_null_compound() {
        let mut slice = [0_u8].as_slice();
        assert_eq!(Compound::decode(&mut slice).unwrap(), Compound::new());
        assert!(slice.is_empty());
    }

    #[test]
    fn option_carries_inline_bool() {
        let mut buf = vec![];
        Some(5_u8).encode(&mut buf).unwrap();
        None::<u8>.encode(&mut buf).unwrap();

        assert_eq!(buf, [1, 5, 0]);

        let mut slice = buf.as_slice();
        assert_eq!(Option::<u8>::decode(&mut slice).unwrap(), Some(5));
        assert_eq!(Option::<u8>::decode(&mut slice).unwrap(), None);
    }
}
