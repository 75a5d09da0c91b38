use std::mem;

use crate::conv::u8_slice_as_i8_slice;
use crate::tag::Tag;
use crate::{Compound, Error, List, Result, Value};

/// Decodes an NBT compound from the given slice of bytes.
///
/// The slice is advanced past the decoded document, so bytes following the
/// compound are left for the caller. Returns the root compound together with
/// its name (typically the empty string).
pub fn from_binary(slice: &mut &[u8]) -> Result<(Compound, String)> {
    let mut state = DecodeState { slice, depth: 0 };

    let tag = state.read_tag()?;

    if tag != Tag::Compound {
        return Err(Error::new_owned(format!(
            "expected a compound at the document root, found {}",
            tag.name()
        )));
    }

    let name = state.read_string()?;
    let root = state.read_compound()?;

    debug_assert_eq!(state.depth, 0);

    Ok((root, name))
}

/// Maximum recursion depth to prevent overflowing the call stack.
const MAX_DEPTH: usize = 512;

struct DecodeState<'a, 'b> {
    slice: &'b mut &'a [u8],
    /// Current recursion depth.
    depth: usize,
}

impl<'a> DecodeState<'a, '_> {
    #[inline]
    fn check_depth<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::new_static("reached maximum recursion depth"));
        }

        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.slice.len() {
            return Err(Error::new_static("unexpected end of NBT input"));
        }

        let (head, tail) = self.slice.split_at(count);
        *self.slice = tail;
        Ok(head)
    }

    fn remaining(&self) -> usize {
        self.slice.len()
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let byte = self.read_bytes(1)?[0];
        Tag::from_byte(byte).ok_or_else(|| Error::unknown_tag(byte))
    }

    /// Read a value identified by the given tag.
    ///
    /// # Panics
    ///
    /// Panics if the tag is [`Tag::End`].
    #[track_caller]
    fn read_value(&mut self, tag: Tag) -> Result<Value> {
        Ok(match tag {
            Tag::End => panic!("cannot read a value of TAG_End"),
            Tag::Byte => self.read_byte()?.into(),
            Tag::Short => self.read_short()?.into(),
            Tag::Int => self.read_int()?.into(),
            Tag::Long => self.read_long()?.into(),
            Tag::Float => self.read_float()?.into(),
            Tag::Double => self.read_double()?.into(),
            Tag::ByteArray => self.read_byte_array()?.into(),
            Tag::String => Value::String(self.read_string()?),
            Tag::List => self.check_depth(|st| st.read_any_list())?.into(),
            Tag::Compound => self.check_depth(|st| st.read_compound())?.into(),
            Tag::IntArray => self.read_int_array()?.into(),
            Tag::LongArray => self.read_long_array()?.into(),
        })
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_bytes(1)?[0] as i8)
    }

    fn read_short(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    fn read_int(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    fn read_long(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    fn read_byte_array(&mut self) -> Result<Vec<i8>> {
        let len = self.read_int()?;

        if len.is_negative() {
            return Err(Error::new_owned(format!(
                "negative byte array length of {len}"
            )));
        }

        if len as usize > self.remaining() {
            return Err(Error::new_owned(format!(
                "byte array length of {len} exceeds remainder of input"
            )));
        }

        Ok(u8_slice_as_i8_slice(self.read_bytes(len as usize)?).into())
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_short()? as u16 as usize;

        if len > self.remaining() {
            return Err(Error::new_owned(format!(
                "string of length {len} exceeds remainder of input"
            )));
        }

        match cesu8::from_java_cesu8(self.read_bytes(len)?) {
            Ok(str) => Ok(str.into_owned()),
            Err(_) => Err(Error::new_static("could not decode modified UTF-8 data")),
        }
    }

    fn read_any_list(&mut self) -> Result<List> {
        match self.read_tag()? {
            Tag::End => match self.read_int()? {
                0 => Ok(List::End),
                len => Err(Error::new_owned(format!(
                    "TAG_End list with nonzero length of {len}"
                ))),
            },
            Tag::Byte => Ok(self.read_list(Tag::Byte, |st| st.read_byte())?.into()),
            Tag::Short => Ok(self.read_list(Tag::Short, |st| st.read_short())?.into()),
            Tag::Int => Ok(self.read_list(Tag::Int, |st| st.read_int())?.into()),
            Tag::Long => Ok(self.read_list(Tag::Long, |st| st.read_long())?.into()),
            Tag::Float => Ok(self.read_list(Tag::Float, |st| st.read_float())?.into()),
            Tag::Double => Ok(self.read_list(Tag::Double, |st| st.read_double())?.into()),
            Tag::ByteArray => Ok(List::ByteArray(
                self.read_list(Tag::ByteArray, |st| st.read_byte_array())?,
            )),
            Tag::String => Ok(List::String(
                self.read_list(Tag::String, |st| st.read_string())?,
            )),
            Tag::List => self.check_depth(|st| {
                Ok(List::List(
                    st.read_list(Tag::List, |st| st.read_any_list())?,
                ))
            }),
            Tag::Compound => self.check_depth(|st| {
                Ok(List::Compound(
                    st.read_list(Tag::Compound, |st| st.read_compound())?,
                ))
            }),
            Tag::IntArray => Ok(List::IntArray(
                self.read_list(Tag::IntArray, |st| st.read_int_array())?,
            )),
            Tag::LongArray => Ok(List::LongArray(
                self.read_list(Tag::LongArray, |st| st.read_long_array())?,
            )),
        }
    }

    /// Assumes the element tag has already been read.
    #[inline]
    fn read_list<T, F>(&mut self, elem_type: Tag, mut read_elem: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let len = self.read_int()?;

        if len.is_negative() {
            return Err(Error::new_owned(format!(
                "negative {} list length of {len}",
                elem_type.name()
            )));
        }

        let mut list = Vec::with_capacity(cautious_capacity::<T>(len as usize));

        for _ in 0..len {
            list.push(read_elem(self)?);
        }

        Ok(list)
    }

    fn read_compound(&mut self) -> Result<Compound> {
        let mut compound = Compound::new();

        loop {
            let tag = self.read_tag()?;
            if tag == Tag::End {
                return Ok(compound);
            }

            compound.insert(self.read_string()?, self.read_value(tag)?);
        }
    }

    fn read_int_array(&mut self) -> Result<Vec<i32>> {
        let len = self.read_int()?;

        if len.is_negative() {
            return Err(Error::new_owned(format!(
                "negative int array length of {len}",
            )));
        }

        if len as u64 * 4 > self.remaining() as u64 {
            return Err(Error::new_owned(format!(
                "int array of length {len} exceeds remainder of input"
            )));
        }

        let mut array = Vec::with_capacity(len as usize);

        for _ in 0..len {
            array.push(self.read_int()?);
        }

        Ok(array)
    }

    fn read_long_array(&mut self) -> Result<Vec<i64>> {
        let len = self.read_int()?;

        if len.is_negative() {
            return Err(Error::new_owned(format!(
                "negative long array length of {len}",
            )));
        }

        if len as u64 * 8 > self.remaining() as u64 {
            return Err(Error::new_owned(format!(
                "long array of length {len} exceeds remainder of input"
            )));
        }

        let mut array = Vec::with_capacity(len as usize);

        for _ in 0..len {
            array.push(self.read_long()?);
        }

        Ok(array)
    }
}

/// Prevents preallocating too much memory in case we get a malicious or
/// invalid sequence length.
fn cautious_capacity<Element>(size_hint: usize) -> usize {
    const MAX_PREALLOC_BYTES: usize = 2048;

    if mem::size_of::<Element>() == 0 {
        0
    } else {
        size_hint.min(MAX_PREALLOC_BYTES / mem::size_of::<Element>())
    }
}
