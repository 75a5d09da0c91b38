use std::io::Write;

use anyhow::ensure;

use crate::{Bounded, Decode, Encode, VarInt};

const DEFAULT_MAX_STRING_CHARS: usize = 32767;

/// Strings are encoded as a VarInt count of their UTF-8 **bytes** followed by
/// the bytes themselves. Bounds are enforced on the **character** count.
impl Encode for str {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        Bounded::<_, DEFAULT_MAX_STRING_CHARS>(self).encode(w)
    }
}

impl<const MAX_CHARS: usize> Encode for Bounded<&'_ str, MAX_CHARS> {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let char_count = self.chars().count();

        ensure!(
            char_count <= MAX_CHARS,
            "char count of string exceeds maximum (expected <= {MAX_CHARS}, got {char_count})"
        );

        VarInt(self.len() as i32).encode(&mut w)?;
        Ok(w.write_all(self.as_bytes())?)
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        Ok(Bounded::<_, DEFAULT_MAX_STRING_CHARS>::decode(r)?.0)
    }
}

impl<'a, const MAX_CHARS: usize> Decode<'a> for Bounded<&'a str, MAX_CHARS> {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "attempt to decode string with negative length");
        let len = len as usize;
        ensure!(
            len <= r.len(),
            "not enough data remaining to decode string of {len} bytes"
        );

        let (res, remaining) = r.split_at(len);
        let res = std::str::from_utf8(res)?;

        let char_count = res.chars().count();
        ensure!(
            char_count <= MAX_CHARS,
            "char count of string exceeds maximum (expected <= {MAX_CHARS}, got {char_count})"
        );

        *r = remaining;

        Ok(Bounded(res))
    }
}

impl Encode for String {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_str().encode(w)
    }
}

impl<const MAX_CHARS: usize> Encode for Bounded<String, MAX_CHARS> {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        Bounded::<_, MAX_CHARS>(self.as_str()).encode(w)
    }
}

impl Decode<'_> for String {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(<&str>::decode(r)?.into())
    }
}

impl<const MAX_CHARS: usize> Decode<'_> for Bounded<String, MAX_CHARS> {
    fn decode(r: &mut &'_ [u8]) -> anyhow::Result<Self> {
        Ok(Bounded(Bounded::<&str, MAX_CHARS>::decode(r)?.0.into()))
    }
}

impl Decode<'_> for Box<str> {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(<&str>::decode(r)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefix_counts_bytes_not_chars() {
        // Three characters, seven UTF-8 bytes.
        let s = "aé日";
        assert_eq!(s.chars().count(), 3);

        let mut buf = vec![];
        s.encode(&mut buf).unwrap();

        assert_eq!(buf[0] as usize, s.len());
        assert_eq!(&buf[1..], s.as_bytes());

        let mut slice = buf.as_slice();
        assert_eq!(<&str>::decode(&mut slice).unwrap(), s);
        assert!(slice.is_empty());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let buf = [2, 0xC3, 0x28];
        assert!(<&str>::decode(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn char_bound_is_enforced() {
        let mut buf = vec![];
        assert!(Bounded::<_, 3>("abcd").encode(&mut buf).is_err());
        assert!(Bounded::<_, 4>("abcd").encode(&mut buf).is_ok());

        let mut slice = buf.as_slice();
        assert!(Bounded::<&str, 3>::decode(&mut slice).is_err());
    }
}
