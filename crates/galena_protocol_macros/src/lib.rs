//! This crate provides derive macros for `Encode`, `Decode`, and `Packet`.
//!
//! Besides plain field-by-field encoding, the `Encode`/`Decode` derives
//! understand two back-reference attributes that tie a field's wire form to
//! an *earlier* field of the same struct:
//!
//! - `#[packet(len = "sibling")]` — the field is a sequence written with no
//!   inline length prefix; the named sibling carries its element count.
//! - `#[packet(present = "sibling")]` — the field is an `Option` written with
//!   no inline bool prefix; the named sibling is the presence flag.
//!
//! See `galena_protocol`'s documentation for more information.

use proc_macro::TokenStream as StdTokenStream;
use proc_macro2::TokenStream;
use quote::ToTokens;
use syn::{
    parse_quote, Attribute, Error, GenericParam, Generics, Ident, Lifetime, LifetimeParam, LitInt,
    LitStr, Result, Variant,
};

mod decode;
mod encode;
mod packet;

#[proc_macro_derive(Encode, attributes(packet))]
pub fn derive_encode(item: StdTokenStream) -> StdTokenStream {
    match encode::derive_encode(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.into_compile_error().into(),
    }
}

#[proc_macro_derive(Decode, attributes(packet))]
pub fn derive_decode(item: StdTokenStream) -> StdTokenStream {
    match decode::derive_decode(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.into_compile_error().into(),
    }
}

#[proc_macro_derive(Packet, attributes(packet))]
pub fn derive_packet(item: StdTokenStream) -> StdTokenStream {
    match packet::derive_packet(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.into_compile_error().into(),
    }
}

/// Per-field `#[packet(...)]` arguments understood by the `Encode` and
/// `Decode` derives.
#[derive(Default)]
struct FieldAttrs {
    /// `len = "sibling"`: element count carried by an earlier integer field.
    len: Option<Ident>,
    /// `present = "sibling"`: presence carried by an earlier bool field.
    present: Option<Ident>,
}

fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut res = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("packet") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("len") {
                res.len = Some(meta.value()?.parse::<LitStr>()?.parse::<Ident>()?);
                Ok(())
            } else if meta.path.is_ident("present") {
                res.present = Some(meta.value()?.parse::<LitStr>()?.parse::<Ident>()?);
                Ok(())
            } else {
                Err(meta.error("unrecognized #[packet(...)] argument on field"))
            }
        })?;
    }

    if res.len.is_some() && res.present.is_some() {
        return Err(Error::new(
            res.present.unwrap().span(),
            "`len` and `present` cannot be combined on one field",
        ));
    }

    Ok(res)
}

/// Back-references must point at a field declared earlier in the struct, so
/// that decoding has the referenced value in scope.
fn check_back_reference(sibling: &Ident, earlier: &[Ident], field: &Ident) -> Result<()> {
    if earlier.iter().any(|e| e == sibling) {
        Ok(())
    } else {
        Err(Error::new(
            sibling.span(),
            format!("`{sibling}` must name a field declared before `{field}`"),
        ))
    }
}

fn pair_variants_with_discriminants(
    variants: impl IntoIterator<Item = Variant>,
) -> Result<Vec<(i32, Variant)>> {
    let mut discriminant = 0;
    variants
        .into_iter()
        .map(|v| {
            if let Some(i) = find_tag_attr(&v.attrs)? {
                discriminant = i;
            }

            let pair = (discriminant, v);
            discriminant += 1;
            Ok(pair)
        })
        .collect::<Result<_>>()
}

fn find_tag_attr(attrs: &[Attribute]) -> Result<Option<i32>> {
    let mut tag = None;

    for attr in attrs {
        if !attr.path().is_ident("packet") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                tag = Some(meta.value()?.parse::<LitInt>()?.base10_parse::<i32>()?);
                Ok(())
            } else {
                Err(meta.error("unrecognized #[packet(...)] argument on enum variant"))
            }
        })?;
    }

    Ok(tag)
}

/// Adding our lifetime to the generics before calling `.split_for_impl()`
/// would also add it to the resulting ty_generics, which we don't want. So
/// I'm doing this hack.
fn decode_split_for_impl(
    mut generics: Generics,
    lifetime: Lifetime,
) -> (TokenStream, TokenStream, TokenStream) {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut impl_generics = impl_generics.to_token_stream();
    let ty_generics = ty_generics.to_token_stream();
    let where_clause = where_clause.to_token_stream();

    if generics.lifetimes().next().is_none() {
        generics
            .params
            .push(GenericParam::Lifetime(LifetimeParam::new(lifetime)));

        impl_generics = generics.split_for_impl().0.to_token_stream();
    }

    (impl_generics, ty_generics, where_clause)
}

fn add_trait_bounds(generics: &mut Generics, trait_: TokenStream) {
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param.bounds.push(parse_quote!(#trait_))
        }
    }
}
