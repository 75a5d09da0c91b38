//! Wire protocol library for Minecraft: Java Edition (protocol 754, the
//! 1.16.5 family).
//!
//! This crate provides the primitive codec ([`Encode`]/[`Decode`] over raw
//! byte slices), the frame layer ([`PacketEncoder`]/[`PacketDecoder`] with
//! optional zlib compression), and the packet surface used during the
//! handshake, status, login, and early play stages.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    clippy::dbg_macro
)]

/// Used only by macros. Not public API.
#[doc(hidden)]
pub mod __private {
    pub use anyhow::{anyhow, bail, ensure, Context, Result};

    pub use crate::var_int::VarInt;
    pub use crate::{Count, Decode, DecodeCounted, Encode, EncodeCounted, Packet};
}

// This allows us to use our own proc macros internally.
extern crate self as galena_protocol;

pub mod block_pos;
mod bounded;
mod byte_angle;
pub mod decode;
pub mod encode;
mod impls;
mod nbt;
pub mod packets;
mod raw;
pub mod var_int;
mod var_long;

use std::io::Write;

use anyhow::{ensure, Context};
pub use block_pos::BlockPos;
pub use bounded::Bounded;
pub use byte_angle::ByteAngle;
pub use decode::{PacketDecoder, PacketFrame};
use derive_more::{From, Into};
pub use encode::PacketEncoder;
pub use galena_protocol_macros::{Decode, Encode, Packet};
pub use nbt::Nbt;
pub use raw::RawBytes;
pub use var_int::VarInt;
pub use var_long::VarLong;
pub use {anyhow, bytes, galena_nbt, uuid};

/// The maximum number of bytes in a single Minecraft packet.
pub const MAX_PACKET_SIZE: i32 = 2097152;

/// The Minecraft protocol version this library currently targets.
pub const PROTOCOL_VERSION: i32 = 754;

/// The stringified name of the Minecraft version this library currently
/// targets.
pub const MINECRAFT_VERSION: &str = "1.16.5";

/// How large a packet should be before it is compressed by the packet
/// encoder.
///
/// If the inner value is >= 0, then packets with encoded lengths >= to this
/// value will be compressed. If the value is negative, then compression is
/// disabled and no packets are compressed.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, From, Into)]
pub struct CompressionThreshold(pub i32);

impl CompressionThreshold {
    /// No compression.
    pub const DEFAULT: Self = Self(-1);

    /// Whether compression is enabled at all.
    pub fn is_enabled(self) -> bool {
        self.0 >= 0
    }
}

/// No compression.
impl Default for CompressionThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The `Encode` trait allows objects to be written to the Minecraft protocol.
/// It is the inverse of [`Decode`].
///
/// # Deriving
///
/// This trait can be implemented automatically for structs and enums by using
/// the [`Encode`][macro] derive macro. All components of the type must
/// implement `Encode`. Components are encoded in the order they appear in the
/// type definition.
///
/// For enums, the variant to encode is marked by a leading [`VarInt`]
/// discriminant (tag). The discriminant value can be changed using the
/// `#[packet(tag = ...)]` attribute on the variant in question. Discriminant
/// values are assigned to variants using rules similar to regular enum
/// discriminants.
///
/// Two field attributes tie a field's wire form to an earlier field:
/// `#[packet(len = "sibling")]` encodes a sequence without an inline length
/// prefix (the sibling carries the count), and `#[packet(present = "flag")]`
/// encodes an `Option` without an inline bool prefix (the sibling carries the
/// presence).
///
/// [macro]: galena_protocol_macros::Encode
pub trait Encode {
    /// Writes this object to the provided writer.
    ///
    /// If this type also implements [`Decode`] then successful calls to this
    /// function returning `Ok(())` must always successfully [`decode`] using
    /// the data that was written to the writer. The exact number of bytes
    /// that were originally written must be consumed during the decoding.
    ///
    /// [`decode`]: Decode::decode
    fn encode(&self, w: impl Write) -> anyhow::Result<()>;

    /// Like [`Encode::encode`], except that a whole slice of values is
    /// encoded.
    ///
    /// This method must be semantically equivalent to encoding every element
    /// of the slice in sequence with no leading length prefix (which is
    /// exactly what the default implementation does), but a more efficient
    /// implementation may be used.
    ///
    /// This method is important for some types like `u8` where the entire
    /// slice can be encoded in a single call to [`write_all`]. Because impl
    /// specialization is unavailable in stable Rust at the time of writing,
    /// we must make the slice specialization part of this trait.
    ///
    /// [`write_all`]: Write::write_all
    fn encode_slice(slice: &[Self], mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        for value in slice {
            value.encode(&mut w)?;
        }

        Ok(())
    }
}

/// The `Decode` trait allows objects to be read from the Minecraft protocol.
/// It is the inverse of [`Encode`].
///
/// `Decode` is parameterized by a lifetime. This allows the decoded value to
/// borrow data from the byte slice it was read from.
///
/// # Deriving
///
/// This trait can be implemented automatically for structs and enums by using
/// the [`Decode`][macro] derive macro. All components of the type must
/// implement `Decode`. Components are decoded in the order they appear in the
/// type definition, and the `#[packet(len = ...)]`/`#[packet(present = ...)]`
/// field attributes read their counts and flags from already-decoded earlier
/// fields.
///
/// [macro]: galena_protocol_macros::Decode
pub trait Decode<'a>: Sized {
    /// Reads this object from the provided byte slice.
    ///
    /// Implementations of `Decode` are expected to shrink the slice from the
    /// front as bytes are read.
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self>;
}

/// Integer fields that carry the element count of a sibling sequence.
pub trait Count: Copy {
    /// This value as an element count.
    fn count(&self) -> anyhow::Result<usize>;
}

macro_rules! impl_count {
    ($($typ:ty),* $(,)?) => {
        $(
            impl Count for $typ {
                fn count(&self) -> anyhow::Result<usize> {
                    usize::try_from(*self).context("element count out of range")
                }
            }
        )*
    }
}

impl_count!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Count for VarInt {
    fn count(&self) -> anyhow::Result<usize> {
        usize::try_from(self.0).context("element count out of range")
    }
}

impl Count for VarLong {
    fn count(&self) -> anyhow::Result<usize> {
        usize::try_from(self.0).context("element count out of range")
    }
}

/// Sequences whose element count travels in a separate field, written with no
/// inline length prefix.
///
/// Used by the `#[packet(len = "sibling")]` derive attribute.
pub trait EncodeCounted {
    fn encode_counted(&self, w: impl Write) -> anyhow::Result<()>;
}

impl<T: Encode> EncodeCounted for [T] {
    fn encode_counted(&self, w: impl Write) -> anyhow::Result<()> {
        T::encode_slice(self, w)
    }
}

/// Decoding counterpart of [`EncodeCounted`]: reads exactly `count` elements.
pub trait DecodeCounted<'a>: Sized {
    fn decode_counted(r: &mut &'a [u8], count: usize) -> anyhow::Result<Self>;
}

impl<'a, T: Decode<'a>> DecodeCounted<'a> for Vec<T> {
    fn decode_counted(r: &mut &'a [u8], count: usize) -> anyhow::Result<Self> {
        let mut vec = Vec::with_capacity(impls::cautious_capacity::<T>(count));

        for _ in 0..count {
            vec.push(T::decode(r)?);
        }

        Ok(vec)
    }
}

impl<'a> DecodeCounted<'a> for &'a [u8] {
    fn decode_counted(r: &mut &'a [u8], count: usize) -> anyhow::Result<Self> {
        ensure!(
            count <= r.len(),
            "not enough data remaining to decode {count} bytes (input len is {})",
            r.len()
        );

        let (res, remaining) = r.split_at(count);
        *r = remaining;
        Ok(res)
    }
}

/// Types considered to be Minecraft packets.
///
/// In serialized form, a packet begins with a [`VarInt`] packet ID followed
/// by the body of the packet. If present, the implementations of [`Encode`]
/// and [`Decode`] on `Self` are expected to only encode/decode the _body_ of
/// this packet without the leading ID.
pub trait Packet: std::fmt::Debug {
    /// The leading VarInt ID of this packet.
    const ID: i32;
    /// The name of this packet for debugging purposes.
    const NAME: &'static str;
    /// The side this packet is intended for.
    const SIDE: PacketSide;
    /// The state in which this packet is used.
    const STATE: PacketState;

    /// Encodes this packet's VarInt ID first, followed by the packet's body.
    fn encode_with_id(&self, mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Encode,
    {
        VarInt(Self::ID)
            .encode(&mut w)
            .context("failed to encode packet ID")?;

        self.encode(w)
    }
}

/// The side a packet is intended for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PacketSide {
    /// Server -> Client
    Clientbound,
    /// Client -> Server
    Serverbound,
}

/// The state in which a packet is used.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PacketState {
    Handshaking,
    Status,
    Login,
    Play,
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use uuid::Uuid;

    use super::*;

    #[derive(Encode, Decode, Packet, PartialEq, Debug)]
    #[packet(id = 1, side = PacketSide::Clientbound)]
    struct RegularStruct {
        foo: i32,
        bar: bool,
        baz: f64,
    }

    #[derive(Encode, Decode, Packet, Debug)]
    #[packet(id = 2, side = PacketSide::Clientbound)]
    struct UnitStruct;

    #[derive(Encode, Decode, Packet, Debug)]
    #[packet(id = 3, side = PacketSide::Clientbound)]
    struct EmptyStruct {}

    #[derive(Encode, Decode, Packet, Debug)]
    #[packet(id = 4, side = PacketSide::Clientbound)]
    struct TupleStruct(i32, bool, f64);

    #[derive(Encode, Decode, Packet, Debug)]
    #[packet(id = 5, side = PacketSide::Clientbound)]
    struct StructWithGenerics<'z, T = ()> {
        foo: &'z str,
        bar: T,
    }

    #[derive(Encode, Decode, Packet, Debug)]
    #[packet(id = 6, side = PacketSide::Clientbound)]
    struct TupleStructWithGenerics<'z, T = ()>(&'z str, i32, T);

    #[allow(unconditional_recursion, clippy::extra_unused_type_parameters)]
    fn assert_has_impls<'a, T>()
    where
        T: Encode + Decode<'a> + Packet,
    {
        assert_has_impls::<RegularStruct>();
        assert_has_impls::<UnitStruct>();
        assert_has_impls::<EmptyStruct>();
        assert_has_impls::<TupleStruct>();
        assert_has_impls::<StructWithGenerics>();
        assert_has_impls::<TupleStructWithGenerics>();
    }

    #[test]
    fn packet_name() {
        assert_eq!(RegularStruct::NAME, "RegularStruct");
        assert_eq!(UnitStruct::NAME, "UnitStruct");
        assert_eq!(StructWithGenerics::<()>::NAME, "StructWithGenerics");
    }

    #[derive(PartialEq, Debug, Encode, Decode, Packet)]
    #[packet(id = 42, side = PacketSide::Clientbound)]
    struct TestPacket<'a> {
        a: bool,
        b: u8,
        c: i32,
        d: f32,
        e: f64,
        f: BlockPos,
        g: Uuid,
        h: VarInt,
        i: VarLong,
        j: &'a str,
        k: &'a [u8; 10],
        l: [u128; 3],
        ba_len: VarInt,
        #[packet(len = "ba_len")]
        ba: &'a [u8],
        names_len: VarInt,
        #[packet(len = "names_len")]
        names: Vec<String>,
        opt_flag: bool,
        #[packet(present = "opt_flag")]
        opt: Option<i32>,
    }

    impl<'a> TestPacket<'a> {
        fn new(string: &'a str, opt: Option<i32>) -> Self {
            Self {
                a: true,
                b: 12,
                c: -999,
                d: 5.001,
                e: 1e10,
                f: BlockPos::new(1, 2, 3),
                g: Uuid::from_u128(0xDEADBEEF),
                h: VarInt(123),
                i: VarLong(456),
                j: string,
                k: &[7; 10],
                l: [123456789; 3],
                ba_len: VarInt(4),
                ba: &[0xDE, 0xAD, 0xBE, 0xEF],
                names_len: VarInt(2),
                names: vec!["foo".to_owned(), "bar".to_owned()],
                opt_flag: opt.is_some(),
                opt,
            }
        }
    }

    fn check_test_packet(dec: &mut PacketDecoder, string: &str, opt: Option<i32>) {
        let frame = dec.try_next_packet().unwrap().unwrap();

        let pkt = frame.decode::<TestPacket>().unwrap();

        assert_eq!(&pkt, &TestPacket::new(string, opt));
    }

    #[test]
    fn packets_round_trip() {
        let mut buf = BytesMut::new();

        let mut enc = PacketEncoder::new();

        enc.append_packet(&TestPacket::new("first", None)).unwrap();
        enc.set_compression(CompressionThreshold(0));
        enc.append_packet(&TestPacket::new("second", Some(-10_000)))
            .unwrap();
        buf.unsplit(enc.take());
        enc.append_packet(&TestPacket::new("third", Some(7))).unwrap();

        buf.unsplit(enc.take());

        let mut dec = PacketDecoder::new();

        dec.queue_bytes(buf);

        check_test_packet(&mut dec, "first", None);

        dec.set_compression(CompressionThreshold(0));

        check_test_packet(&mut dec, "second", Some(-10_000));
        check_test_packet(&mut dec, "third", Some(7));
    }

    #[test]
    fn optional_field_bytes_are_absent() {
        let mut present = vec![];
        TestPacket::new("x", Some(1)).encode(&mut present).unwrap();

        let mut absent = vec![];
        TestPacket::new("x", None).encode(&mut absent).unwrap();

        // The optional i32 contributes exactly its own 4 bytes, nothing else.
        assert_eq!(present.len(), absent.len() + 4);
    }

    #[test]
    fn mismatched_count_is_an_encode_error() {
        let mut pkt = TestPacket::new("x", None);
        pkt.ba_len = VarInt(3);

        let mut buf = vec![];
        assert!(pkt.encode(&mut buf).is_err());

        let mut pkt = TestPacket::new("x", Some(5));
        pkt.opt_flag = false;

        buf.clear();
        assert!(pkt.encode(&mut buf).is_err());
    }
}
