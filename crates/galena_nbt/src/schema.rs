//! Mapping between plain Rust structs and NBT compounds.
//!
//! The [`ToNbt`][macro] and [`FromNbt`][macro2] derive macros walk a struct's
//! fields in declaration order and bind each one to a compound entry through
//! the traits in this module. The entry name defaults to the field name and
//! can be overridden with `#[nbt(rename = "...")]`. `Option` fields marked
//! `#[nbt(optional)]` are skipped entirely when `None`. Sequence fields take
//! their specialized array form (`ByteArray`/`IntArray`/`LongArray`) unless
//! marked `#[nbt(list)]`. A `String` field marked `#[nbt(root)]` names the
//! outermost compound instead of appearing as an entry.
//!
//! [macro]: galena_nbt_macros::ToNbt
//! [macro2]: galena_nbt_macros::FromNbt

use std::io::Write;

use crate::compression::Compression;
use crate::conv::{i8_vec_into_u8_vec, u8_slice_as_i8_slice};
use crate::{Compound, Error, List, Result, Value};

/// Options for schema-driven decoding.
#[derive(Copy, Clone, Default, Debug)]
pub struct DecodeOptions {
    /// When `true`, compound entries that match no target field are read and
    /// discarded. When `false` (the default), they are an error.
    pub lenient: bool,
}

impl DecodeOptions {
    pub fn lenient() -> Self {
        Self { lenient: true }
    }
}

/// Conversion of a value into its NBT form.
pub trait ToNbt {
    fn to_nbt(&self) -> Value;

    /// The name given to the outermost compound when this value is written as
    /// a whole document.
    fn root_name(&self) -> &str {
        ""
    }
}

/// Conversion of an NBT value back into a plain value.
pub trait FromNbt: Sized {
    fn from_nbt(value: Value, opts: DecodeOptions) -> Result<Self>;

    /// Called with the document's root name when this value is decoded as a
    /// whole document. The default does nothing.
    fn set_root_name(&mut self, name: String) {
        let _ = name;
    }
}

/// Structs that map to an NBT compound. Implemented by the
/// [`ToNbt`](galena_nbt_macros::ToNbt) derive.
pub trait ToCompound {
    fn to_compound(&self) -> Compound;
}

/// Structs that can be rebuilt from an NBT compound. Implemented by the
/// [`FromNbt`](galena_nbt_macros::FromNbt) derive.
pub trait FromCompound: Sized {
    fn from_compound(compound: Compound, opts: DecodeOptions) -> Result<Self>;
}

/// Element types of homogeneous sequences. The element decides which wire
/// form a `Vec<Self>` takes: integer elements have specialized array forms,
/// everything else becomes a list.
pub trait SeqToNbt: Sized {
    /// The default wire form of a sequence of this element.
    fn seq_to_nbt(elems: &[Self]) -> Value;

    /// The sequence forced into `List` form.
    fn seq_to_list(elems: &[Self]) -> List;
}

/// Decoding counterpart of [`SeqToNbt`]. Accepts both the specialized array
/// form and the list form, so data written with either shape reads back.
pub trait SeqFromNbt: Sized {
    fn seq_from_nbt(value: Value, opts: DecodeOptions) -> Result<Vec<Self>>;
}

/// Builds the type-mismatch error reported when an NBT value has the wrong
/// tag for the target field. Also used by the derive macros.
#[doc(hidden)]
pub fn mismatch(expected: &'static str, found: &Value) -> Error {
    Error::new_owned(format!(
        "expected {expected}, found {}",
        found.tag().name()
    ))
}

macro_rules! scalar_to_nbt {
    ($($typ:ty => $variant:ident)*) => {
        $(
            impl ToNbt for $typ {
                fn to_nbt(&self) -> Value {
                    Value::$variant(*self)
                }
            }
        )*
    }
}

scalar_to_nbt! {
    i8 => Byte
    i16 => Short
    i32 => Int
    i64 => Long
    f32 => Float
    f64 => Double
}

/// Unsigned integers and bools reuse the signed representation of their width.
macro_rules! scalar_to_nbt_cast {
    ($($typ:ty => $variant:ident as $repr:ty)*) => {
        $(
            impl ToNbt for $typ {
                fn to_nbt(&self) -> Value {
                    Value::$variant(*self as $repr)
                }
            }
        )*
    }
}

scalar_to_nbt_cast! {
    bool => Byte as i8
    u8 => Byte as i8
    u16 => Short as i16
    u32 => Int as i32
    u64 => Long as i64
}

impl ToNbt for String {
    fn to_nbt(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToNbt for Compound {
    fn to_nbt(&self) -> Value {
        Value::Compound(self.clone())
    }
}

impl ToNbt for Value {
    fn to_nbt(&self) -> Value {
        self.clone()
    }
}

impl<T: SeqToNbt> ToNbt for Vec<T> {
    fn to_nbt(&self) -> Value {
        T::seq_to_nbt(self)
    }
}

impl FromNbt for bool {
    fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
        match value {
            Value::Byte(b) => Ok(b != 0),
            v => Err(mismatch("byte", &v)),
        }
    }
}

macro_rules! scalar_from_nbt {
    ($($typ:ty => $variant:ident, $name:literal)*) => {
        $(
            impl FromNbt for $typ {
                fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        v => Err(mismatch($name, &v)),
                    }
                }
            }
        )*
    }
}

scalar_from_nbt! {
    i8 => Byte, "byte"
    i16 => Short, "short"
    i32 => Int, "int"
    i64 => Long, "long"
    f32 => Float, "float"
    f64 => Double, "double"
}

macro_rules! scalar_from_nbt_cast {
    ($($typ:ty => $variant:ident, $name:literal)*) => {
        $(
            impl FromNbt for $typ {
                fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v as $typ),
                        v => Err(mismatch($name, &v)),
                    }
                }
            }
        )*
    }
}

scalar_from_nbt_cast! {
    u8 => Byte, "byte"
    u16 => Short, "short"
    u32 => Int, "int"
    u64 => Long, "long"
}

impl FromNbt for String {
    fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            v => Err(mismatch("string", &v)),
        }
    }
}

impl FromNbt for Compound {
    fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
        match value {
            Value::Compound(c) => Ok(c),
            v => Err(mismatch("compound", &v)),
        }
    }
}

impl FromNbt for Value {
    fn from_nbt(value: Value, _opts: DecodeOptions) -> Result<Self> {
        Ok(value)
    }
}

impl<T: SeqFromNbt> FromNbt for Vec<T> {
    fn from_nbt(value: Value, opts: DecodeOptions) -> Result<Self> {
        T::seq_from_nbt(value, opts)
    }
}

impl SeqToNbt for i8 {
    fn seq_to_nbt(elems: &[Self]) -> Value {
        Value::ByteArray(elems.to_vec())
    }

    fn seq_to_list(elems: &[Self]) -> List {
        List::Byte(elems.to_vec())
    }
}

impl SeqToNbt for u8 {
    fn seq_to_nbt(elems: &[Self]) -> Value {
        Value::ByteArray(u8_slice_as_i8_slice(elems).to_vec())
    }

    fn seq_to_list(elems: &[Self]) -> List {
        List::Byte(u8_slice_as_i8_slice(elems).to_vec())
    }
}

impl SeqToNbt for bool {
    fn seq_to_nbt(elems: &[Self]) -> Value {
        Value::List(Self::seq_to_list(elems))
    }

    fn seq_to_list(elems: &[Self]) -> List {
        List::Byte(elems.iter().map(|b| *b as i8).collect())
    }
}

impl SeqToNbt for i32 {
    fn seq_to_nbt(elems: &[Self]) -> Value {
        Value::IntArray(elems.to_vec())
    }

    fn seq_to_list(elems: &[Self]) -> List {
        List::Int(elems.to_vec())
    }
}

impl SeqToNbt for i64 {
    fn seq_to_nbt(elems: &[Self]) -> Value {
        Value::LongArray(elems.to_vec())
    }

    fn seq_to_list(elems: &[Self]) -> List {
        List::Long(elems.to_vec())
    }
}

macro_rules! list_only_seq {
    ($($typ:ty => $variant:ident)*) => {
        $(
            impl SeqToNbt for $typ {
                fn seq_to_nbt(elems: &[Self]) -> Value {
                    Value::List(Self::seq_to_list(elems))
                }

                fn seq_to_list(elems: &[Self]) -> List {
                    List::$variant(elems.to_vec())
                }
            }
        )*
    }
}

list_only_seq! {
    i16 => Short
    f32 => Float
    f64 => Double
    String => String
    Compound => Compound
}

impl SeqFromNbt for i8 {
    fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
        match value {
            Value::ByteArray(v) | Value::List(List::Byte(v)) => Ok(v),
            Value::List(List::End) => Ok(Vec::new()),
            v => Err(mismatch("byte sequence", &v)),
        }
    }
}

impl SeqFromNbt for u8 {
    fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
        match value {
            Value::ByteArray(v) | Value::List(List::Byte(v)) => Ok(i8_vec_into_u8_vec(v)),
            Value::List(List::End) => Ok(Vec::new()),
            v => Err(mismatch("byte sequence", &v)),
        }
    }
}

impl SeqFromNbt for bool {
    fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
        match value {
            Value::ByteArray(v) | Value::List(List::Byte(v)) => {
                Ok(v.into_iter().map(|b| b != 0).collect())
            }
            Value::List(List::End) => Ok(Vec::new()),
            v => Err(mismatch("byte sequence", &v)),
        }
    }
}

impl SeqFromNbt for i32 {
    fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
        match value {
            Value::IntArray(v) | Value::List(List::Int(v)) => Ok(v),
            Value::List(List::End) => Ok(Vec::new()),
            v => Err(mismatch("int sequence", &v)),
        }
    }
}

impl SeqFromNbt for i64 {
    fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
        match value {
            Value::LongArray(v) | Value::List(List::Long(v)) => Ok(v),
            Value::List(List::End) => Ok(Vec::new()),
            v => Err(mismatch("long sequence", &v)),
        }
    }
}

macro_rules! list_only_seq_from {
    ($($typ:ty => $variant:ident, $name:literal)*) => {
        $(
            impl SeqFromNbt for $typ {
                fn seq_from_nbt(value: Value, _opts: DecodeOptions) -> Result<Vec<Self>> {
                    match value {
                        Value::List(List::$variant(v)) => Ok(v),
                        Value::List(List::End) => Ok(Vec::new()),
                        v => Err(mismatch($name, &v)),
                    }
                }
            }
        )*
    }
}

list_only_seq_from! {
    i16 => Short, "short list"
    f32 => Float, "float list"
    f64 => Double, "double list"
    String => String, "string list"
    Compound => Compound, "compound list"
}

/// Writes `value` as a complete binary NBT document.
///
/// The value must map to a compound; the document's root name is taken from
/// [`ToNbt::root_name`].
pub fn to_binary<T: ToNbt + ?Sized>(value: &T, writer: impl Write) -> Result<()> {
    match value.to_nbt() {
        Value::Compound(c) => crate::to_binary(&c, writer, value.root_name()),
        v => Err(mismatch("compound at the document root", &v)),
    }
}

/// Like [`to_binary`](to_binary()), wrapping the document in the chosen
/// compression stream.
pub fn to_binary_compressed<T: ToNbt + ?Sized>(
    value: &T,
    writer: impl Write,
    compression: Compression,
) -> Result<()> {
    match value.to_nbt() {
        Value::Compound(c) => {
            crate::compression::to_binary_compressed(&c, writer, value.root_name(), compression)
        }
        v => Err(mismatch("compound at the document root", &v)),
    }
}

/// Reads `T` from a complete binary NBT document, advancing the slice past
/// the document's bytes.
pub fn from_binary<T: FromNbt>(slice: &mut &[u8], opts: DecodeOptions) -> Result<T> {
    let (compound, name) = crate::from_binary(slice)?;

    let mut value = T::from_nbt(Value::Compound(compound), opts)?;
    value.set_root_name(name);

    Ok(value)
}

/// Like [`from_binary`](from_binary()), sniffing gzip/zlib wrapping from the
/// first byte.
pub fn from_binary_detect<T: FromNbt>(data: &[u8], opts: DecodeOptions) -> Result<T> {
    let (compound, name) = crate::compression::from_binary_detect(data)?;

    let mut value = T::from_nbt(Value::Compound(compound), opts)?;
    value.set_root_name(name);

    Ok(value)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{FromNbt, ToNbt};

    #[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
    struct Named {
        #[nbt(root)]
        root: String,
        name: String,
    }

    #[test]
    fn named_document_bytes() {
        let value = Named {
            root: "hello world".to_owned(),
            name: "Bananrama".to_owned(),
        };

        let mut buf = vec![];
        to_binary(&value, &mut buf).unwrap();

        let mut expected = vec![0x0A, 0x00, 0x0B];
        expected.extend(b"hello world");
        expected.extend([0x08, 0x00, 0x04]);
        expected.extend(b"name");
        expected.extend([0x00, 0x09]);
        expected.extend(b"Bananrama");
        expected.push(0x00);

        assert_eq!(buf, expected);

        let decoded: Named = from_binary(&mut buf.as_slice(), DecodeOptions::default()).unwrap();
        assert_eq!(decoded, value);
    }

    #[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
    struct LongList {
        #[nbt(rename = "listTest (long)")]
        #[nbt(list)]
        list_test: Vec<i64>,
    }

    #[test]
    fn forced_list_document_bytes() {
        let value = LongList {
            list_test: vec![11, 12, 13, 14, 15],
        };

        let mut buf = vec![];
        to_binary(&value, &mut buf).unwrap();

        let mut expected = vec![0x0A, 0x00, 0x00, 0x09, 0x00, 0x0F];
        expected.extend(b"listTest (long)");
        expected.extend([0x04, 0x00, 0x00, 0x00, 0x05]);
        for n in 11_i64..=15 {
            expected.extend(n.to_be_bytes());
        }
        expected.push(0x00);

        assert_eq!(buf, expected);

        let decoded: LongList =
            from_binary(&mut buf.as_slice(), DecodeOptions::default()).unwrap();
        assert_eq!(decoded, value);
    }

    #[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
    struct Everything {
        flag: bool,
        #[nbt(rename = "the_byte")]
        byte: i8,
        short: i16,
        int: i32,
        long: i64,
        float: f32,
        double: f64,
        text: String,
        bytes: Vec<u8>,
        ints: Vec<i32>,
        longs: Vec<i64>,
        #[nbt(list)]
        int_list: Vec<i32>,
        names: Vec<String>,
        #[nbt(optional)]
        fixed_time: Option<i64>,
        nested: Inner,
        inners: Vec<Inner>,
    }

    #[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
    struct Inner {
        sound: String,
        tick_delay: i32,
    }

    fn everything() -> Everything {
        Everything {
            flag: true,
            byte: -5,
            short: 6553,
            int: i32::MIN,
            long: i64::MAX,
            float: 1e10,
            double: f64::NEG_INFINITY,
            text: "aé日".to_owned(),
            bytes: vec![0, 2, 255],
            ints: vec![5, -9, 0],
            longs: vec![123, 456],
            int_list: vec![3, -7],
            names: vec!["foo".to_owned(), "bar".to_owned()],
            fixed_time: None,
            nested: Inner {
                sound: "minecraft:ambient.cave".to_owned(),
                tick_delay: 6000,
            },
            inners: vec![
                Inner {
                    sound: "a".to_owned(),
                    tick_delay: 1,
                },
                Inner {
                    sound: "b".to_owned(),
                    tick_delay: 2,
                },
            ],
        }
    }

    #[test]
    fn compound_round_trip() {
        let value = everything();

        let compound = match value.to_nbt() {
            Value::Compound(c) => c,
            v => panic!("unexpected value {v:?}"),
        };

        // Entries come out in field declaration order, the optional None field
        // is absent, and the rename is applied.
        let keys: Vec<&str> = compound.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "flag", "the_byte", "short", "int", "long", "float", "double", "text", "bytes",
                "ints", "longs", "int_list", "names", "nested", "inners",
            ]
        );

        // Sequence fields pick their specialized forms unless forced to lists.
        assert_eq!(compound.get("bytes").unwrap().tag(), crate::Tag::ByteArray);
        assert_eq!(compound.get("ints").unwrap().tag(), crate::Tag::IntArray);
        assert_eq!(compound.get("longs").unwrap().tag(), crate::Tag::LongArray);
        assert_eq!(compound.get("int_list").unwrap().tag(), crate::Tag::List);

        let decoded =
            Everything::from_nbt(Value::Compound(compound), DecodeOptions::default()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn optional_present_round_trip() {
        let mut value = everything();
        value.fixed_time = Some(6000);

        let nbt = value.to_nbt();

        match &nbt {
            Value::Compound(c) => assert_eq!(c.get("fixed_time"), Some(&Value::Long(6000))),
            v => panic!("unexpected value {v:?}"),
        }

        let decoded = Everything::from_nbt(nbt, DecodeOptions::default()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn strict_decode_rejects_unknown_entries() {
        let mut compound = match everything().to_nbt() {
            Value::Compound(c) => c,
            v => panic!("unexpected value {v:?}"),
        };
        compound.insert("extra", 1_i32);

        let err = Everything::from_nbt(Value::Compound(compound.clone()), DecodeOptions::default())
            .unwrap_err();
        assert!(err.is_unknown_field(), "unexpected error: {err}");

        let decoded =
            Everything::from_nbt(Value::Compound(compound), DecodeOptions::lenient()).unwrap();
        assert_eq!(decoded, everything());
    }

    #[test]
    fn missing_required_entry_is_an_error() {
        let mut compound = match everything().to_nbt() {
            Value::Compound(c) => c,
            v => panic!("unexpected value {v:?}"),
        };
        compound.remove("short");

        let err =
            Everything::from_nbt(Value::Compound(compound), DecodeOptions::default()).unwrap_err();
        assert!(err.is_missing_field(), "unexpected error: {err}");
    }
}
