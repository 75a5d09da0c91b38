use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse2, DeriveInput, Error, Ident, Result};

use crate::{add_trait_bounds, parse_field_attrs, struct_fields, validate_field_attrs};

pub(super) fn derive_to_nbt(item: TokenStream) -> Result<TokenStream> {
    let mut input = parse2::<DeriveInput>(item)?;

    let input_name = input.ident.clone();
    let fields = struct_fields(&input_name, &input.data)?;

    let mut root_field: Option<Ident> = None;
    let mut inserts = Vec::new();
    let mut entry_count = 0_usize;

    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        validate_field_attrs(&attrs, field)?;

        let name = field.ident.clone().unwrap();

        if attrs.root {
            if root_field.is_some() {
                return Err(Error::new(
                    field.span(),
                    "only one field can be marked #[nbt(root)]",
                ));
            }
            root_field = Some(name);
            continue;
        }

        let entry_name = attrs.rename.unwrap_or_else(|| name.to_string());
        entry_count += 1;

        let value_of = |access: TokenStream| {
            if attrs.list {
                quote! {
                    ::galena_nbt::Value::List(
                        ::galena_nbt::schema::SeqToNbt::seq_to_list(#access)
                    )
                }
            } else {
                quote!(::galena_nbt::schema::ToNbt::to_nbt(#access))
            }
        };

        if attrs.optional {
            let value = value_of(quote!(__value));
            inserts.push(quote! {
                if let ::std::option::Option::Some(__value) = &self.#name {
                    compound.insert(#entry_name, #value);
                }
            });
        } else {
            let value = value_of(quote!(&self.#name));
            inserts.push(quote! {
                compound.insert(#entry_name, #value);
            });
        }
    }

    let root_name_fn = root_field.map(|name| {
        quote! {
            fn root_name(&self) -> &str {
                &self.#name
            }
        }
    });

    add_trait_bounds(&mut input.generics, quote!(::galena_nbt::schema::ToNbt));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::galena_nbt::schema::ToCompound for #input_name #ty_generics
        #where_clause
        {
            fn to_compound(&self) -> ::galena_nbt::Compound {
                let mut compound = ::galena_nbt::Compound::with_capacity(#entry_count);
                #(#inserts)*
                compound
            }
        }

        impl #impl_generics ::galena_nbt::schema::ToNbt for #input_name #ty_generics
        #where_clause
        {
            fn to_nbt(&self) -> ::galena_nbt::Value {
                ::galena_nbt::Value::Compound(
                    ::galena_nbt::schema::ToCompound::to_compound(self)
                )
            }

            #root_name_fn
        }

        impl #impl_generics ::galena_nbt::schema::SeqToNbt for #input_name #ty_generics
        #where_clause
        {
            fn seq_to_nbt(elems: &[Self]) -> ::galena_nbt::Value {
                ::galena_nbt::Value::List(
                    <Self as ::galena_nbt::schema::SeqToNbt>::seq_to_list(elems)
                )
            }

            fn seq_to_list(elems: &[Self]) -> ::galena_nbt::List {
                ::galena_nbt::List::Compound(
                    elems
                        .iter()
                        .map(|elem| ::galena_nbt::schema::ToCompound::to_compound(elem))
                        .collect()
                )
            }
        }
    })
}
