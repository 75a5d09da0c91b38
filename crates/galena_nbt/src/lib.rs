//! Minecraft's Named Binary Tag (NBT) format.
//!
//! NBT is a self-describing tree format: every value carries a tag byte, so a
//! reader needs no schema. This crate provides the dynamic value model
//! ([`Value`], [`List`], [`Compound`]), binary encoding and decoding with
//! optional gzip/zlib wrapping, and a [`schema`] layer that binds plain Rust
//! structs to compounds through the [`ToNbt`]/[`FromNbt`] derive macros.

// Lets us use our own derive macros internally.
extern crate self as galena_nbt;

pub mod binary;
pub mod compound;
pub mod compression;
pub mod conv;
mod error;
pub mod schema;
mod tag;
pub mod value;

pub use binary::{from_binary, to_binary, written_size};
pub use compound::Compound;
pub use compression::Compression;
pub use error::{Error, Result};
pub use galena_nbt_macros::{FromNbt, ToNbt};
pub use tag::Tag;
pub use value::{List, Value};

/// A convenience macro for constructing [`Compound`]s.
///
/// Key expressions must implement `Into<String>` while value expressions must
/// implement `Into<Value>`.
///
/// # Examples
///
/// ```
/// use galena_nbt::{compound, List};
///
/// let c = compound! {
///     "byte" => 123_i8,
///     "list_of_int" => List::Int(vec![3, -7, 5]),
///     "string" => "aé日",
///     "compound" => compound! {
///         "foo" => 1,
///         "bar" => 2,
///     },
///     "int_array" => vec![5, -9, i32::MIN, 0, i32::MAX],
/// };
///
/// println!("{c:?}");
/// ```
#[macro_export]
macro_rules! compound {
    ($($key:expr => $value:expr),* $(,)?) => {
        <$crate::Compound as ::std::iter::FromIterator<(::std::string::String, $crate::Value)>>::from_iter([
            $(
                (
                    ::std::convert::Into::<::std::string::String>::into($key),
                    ::std::convert::Into::<$crate::Value>::into($value)
                ),
            )*
        ])
    };
}
