//! This crate provides the [`ToNbt`] and [`FromNbt`] derive macros, which
//! bind a struct's fields to the entries of an NBT compound.
//!
//! See `galena_nbt`'s documentation for more information.

use proc_macro::TokenStream as StdTokenStream;
use proc_macro2::TokenStream;
use syn::spanned::Spanned;
use syn::{parse_quote, Attribute, Data, Error, Fields, FieldsNamed, GenericParam, Generics, Ident, LitStr, Result};

mod from_nbt;
mod to_nbt;

#[proc_macro_derive(ToNbt, attributes(nbt))]
pub fn derive_to_nbt(item: StdTokenStream) -> StdTokenStream {
    match to_nbt::derive_to_nbt(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.into_compile_error().into(),
    }
}

#[proc_macro_derive(FromNbt, attributes(nbt))]
pub fn derive_from_nbt(item: StdTokenStream) -> StdTokenStream {
    match from_nbt::derive_from_nbt(item.into()) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.into_compile_error().into(),
    }
}

/// Per-field `#[nbt(...)]` arguments.
#[derive(Default)]
struct FieldAttrs {
    /// `rename = "..."`: the compound entry name, instead of the field name.
    rename: Option<String>,
    /// `optional`: an `Option` field whose `None` emits no entry at all.
    optional: bool,
    /// `list`: force a sequence field into `List` form rather than its
    /// specialized array form.
    list: bool,
    /// `root`: a `String` field naming the outermost compound. Not emitted as
    /// an entry.
    root: bool,
}

fn parse_field_attrs(attrs: &[Attribute]) -> Result<FieldAttrs> {
    let mut res = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("nbt") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                res.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else if meta.path.is_ident("optional") {
                res.optional = true;
                Ok(())
            } else if meta.path.is_ident("list") {
                res.list = true;
                Ok(())
            } else if meta.path.is_ident("root") {
                res.root = true;
                Ok(())
            } else {
                Err(meta.error("unrecognized #[nbt(...)] argument"))
            }
        })?;
    }

    Ok(res)
}

/// Pulls the named fields out of the input, rejecting everything the derives
/// don't support.
fn struct_fields<'a>(input_name: &Ident, data: &'a Data) -> Result<&'a FieldsNamed> {
    match data {
        Data::Struct(struct_) => match &struct_.fields {
            Fields::Named(fields) => Ok(fields),
            fields => Err(Error::new(
                fields.span(),
                "NBT derives require a struct with named fields",
            )),
        },
        _ => Err(Error::new(
            input_name.span(),
            "NBT derives can only be used on structs",
        )),
    }
}

/// Checks the attribute combinations that cannot work, so the failure is a
/// clear error instead of puzzling generated code.
fn validate_field_attrs(attrs: &FieldAttrs, field: &syn::Field) -> Result<()> {
    if attrs.root && (attrs.rename.is_some() || attrs.optional || attrs.list) {
        return Err(Error::new(
            field.span(),
            "#[nbt(root)] cannot be combined with other #[nbt(...)] arguments",
        ));
    }

    Ok(())
}

fn add_trait_bounds(generics: &mut Generics, trait_: TokenStream) {
    for param in &mut generics.params {
        if let GenericParam::Type(type_param) = param {
            type_param.bounds.push(parse_quote!(#trait_))
        }
    }
}
