use std::io::Write;

use crate::{Decode, Encode};

/// The unit type encodes to nothing.
impl Encode for () {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Decode<'_> for () {
    fn decode(_r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(())
    }
}

/// Tuples are encoded element-wise with no length prefix.
macro_rules! impl_tuple {
    ($($ty:ident)*) => {
        #[allow(non_snake_case)]
        impl<$($ty: Encode,)*> Encode for ($($ty,)*) {
            fn encode(&self, mut _w: impl Write) -> anyhow::Result<()> {
                let ($($ty,)*) = self;
                $(
                    $ty.encode(&mut _w)?;
                )*
                Ok(())
            }
        }

        #[allow(non_snake_case)]
        impl<'a, $($ty: Decode<'a>,)*> Decode<'a> for ($($ty,)*) {
            fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
                Ok(($($ty::decode(r)?,)*))
            }
        }
    }
}

impl_tuple!(A);
impl_tuple!(A B);
impl_tuple!(A B C);
impl_tuple!(A B C D);
impl_tuple!(A B C D E);
impl_tuple!(A B C D E F);
