//! Compressed NBT documents.
//!
//! NBT blobs found in the wild may be wrapped in a gzip or zlib stream. The
//! wrapping is recognized per blob from the first byte: gzip streams begin
//! with `0x1F` and zlib streams with `0x78`; anything else is read as raw
//! NBT. Writing takes an explicit choice and defaults to raw.

use std::io::{Read, Write};

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::{from_binary, to_binary, Compound, Result};

/// Magic first byte of a gzip stream.
pub const GZIP_MAGIC: u8 = 0x1F;
/// Magic first byte of a zlib stream.
pub const ZLIB_MAGIC: u8 = 0x78;

/// The stream wrapping applied around a binary NBT document.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
}

impl Compression {
    /// Sniffs the wrapping of the given blob from its first byte.
    pub fn detect(data: &[u8]) -> Self {
        match data.first() {
            Some(&GZIP_MAGIC) => Compression::Gzip,
            Some(&ZLIB_MAGIC) => Compression::Zlib,
            _ => Compression::None,
        }
    }
}

/// Decodes a binary NBT document, sniffing gzip/zlib wrapping from the first
/// byte of the blob.
pub fn from_binary_detect(mut data: &[u8]) -> Result<(Compound, String)> {
    match Compression::detect(data) {
        Compression::None => from_binary(&mut data),
        Compression::Gzip => {
            let mut buf = Vec::new();
            GzDecoder::new(data).read_to_end(&mut buf)?;
            from_binary(&mut buf.as_slice())
        }
        Compression::Zlib => {
            let mut buf = Vec::new();
            ZlibDecoder::new(data).read_to_end(&mut buf)?;
            from_binary(&mut buf.as_slice())
        }
    }
}

/// Encodes a binary NBT document with the chosen stream wrapping.
pub fn to_binary_compressed<W: Write>(
    comp: &Compound,
    writer: W,
    root_name: &str,
    compression: Compression,
) -> Result<()> {
    match compression {
        Compression::None => to_binary(comp, writer, root_name),
        Compression::Gzip => {
            let mut z = GzEncoder::new(writer, flate2::Compression::default());
            to_binary(comp, &mut z, root_name)?;
            z.finish()?;
            Ok(())
        }
        Compression::Zlib => {
            let mut z = ZlibEncoder::new(writer, flate2::Compression::default());
            to_binary(comp, &mut z, root_name)?;
            z.finish()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compound;

    fn example() -> Compound {
        compound! {
            "name" => "Bananrama",
            "count" => 3_i32,
        }
    }

    #[test]
    fn detects_gzip_and_zlib_by_magic() {
        for compression in [Compression::None, Compression::Gzip, Compression::Zlib] {
            let mut buf = vec![];
            to_binary_compressed(&example(), &mut buf, "", compression).unwrap();

            assert_eq!(Compression::detect(&buf), compression);

            let (decoded, root_name) = from_binary_detect(&buf).unwrap();
            assert_eq!(root_name, "");
            assert_eq!(decoded, example());
        }
    }

    #[test]
    fn raw_documents_pass_through() {
        // A raw document starts with TAG_Compound (0x0A), which is neither
        // magic byte.
        let mut buf = vec![];
        to_binary(&example(), &mut buf, "root").unwrap();
        assert_eq!(buf[0], 0x0A);

        let (decoded, root_name) = from_binary_detect(&buf).unwrap();
        assert_eq!(root_name, "root");
        assert_eq!(decoded, example());
    }
}
