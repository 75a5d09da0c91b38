use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse2, DeriveInput, Error, Ident, Result};

use crate::{add_trait_bounds, parse_field_attrs, struct_fields, validate_field_attrs};

pub(super) fn derive_from_nbt(item: TokenStream) -> Result<TokenStream> {
    let mut input = parse2::<DeriveInput>(item)?;

    let input_name = input.ident.clone();
    let fields = struct_fields(&input_name, &input.data)?;

    let mut root_field: Option<Ident> = None;
    let mut lets = Vec::new();
    let mut field_names = Vec::new();

    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        validate_field_attrs(&attrs, field)?;

        let name = field.ident.clone().unwrap();
        field_names.push(name.clone());

        if attrs.root {
            if root_field.is_some() {
                return Err(Error::new(
                    field.span(),
                    "only one field can be marked #[nbt(root)]",
                ));
            }
            root_field = Some(name.clone());

            // The root name lives outside the compound; `set_root_name` fills
            // it in when this struct is decoded as a whole document.
            lets.push(quote! {
                let #name = ::std::string::String::new();
            });
            continue;
        }

        let entry_name = attrs.rename.unwrap_or_else(|| name.to_string());

        if attrs.optional {
            lets.push(quote! {
                let #name = match compound.remove(#entry_name) {
                    ::std::option::Option::Some(__value) => ::std::option::Option::Some(
                        ::galena_nbt::schema::FromNbt::from_nbt(__value, opts)?,
                    ),
                    ::std::option::Option::None => ::std::option::Option::None,
                };
            });
        } else {
            lets.push(quote! {
                let #name = match compound.remove(#entry_name) {
                    ::std::option::Option::Some(__value) => {
                        ::galena_nbt::schema::FromNbt::from_nbt(__value, opts)?
                    }
                    ::std::option::Option::None => {
                        return ::std::result::Result::Err(
                            ::galena_nbt::Error::missing_field(#entry_name),
                        )
                    }
                };
            });
        }
    }

    let set_root_name_fn = root_field.map(|name| {
        quote! {
            fn set_root_name(&mut self, name: ::std::string::String) {
                self.#name = name;
            }
        }
    });

    add_trait_bounds(&mut input.generics, quote!(::galena_nbt::schema::FromNbt));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::galena_nbt::schema::FromCompound for #input_name #ty_generics
        #where_clause
        {
            fn from_compound(
                mut compound: ::galena_nbt::Compound,
                opts: ::galena_nbt::schema::DecodeOptions,
            ) -> ::galena_nbt::Result<Self> {
                #(#lets)*

                if !opts.lenient {
                    if let ::std::option::Option::Some(__name) = compound.keys().next() {
                        return ::std::result::Result::Err(
                            ::galena_nbt::Error::unknown_field(__name.as_str()),
                        );
                    }
                }

                ::std::result::Result::Ok(Self {
                    #(#field_names,)*
                })
            }
        }

        impl #impl_generics ::galena_nbt::schema::FromNbt for #input_name #ty_generics
        #where_clause
        {
            fn from_nbt(
                value: ::galena_nbt::Value,
                opts: ::galena_nbt::schema::DecodeOptions,
            ) -> ::galena_nbt::Result<Self> {
                match value {
                    ::galena_nbt::Value::Compound(compound) => {
                        ::galena_nbt::schema::FromCompound::from_compound(compound, opts)
                    }
                    value => ::std::result::Result::Err(
                        ::galena_nbt::schema::mismatch("compound", &value),
                    ),
                }
            }

            #set_root_name_fn
        }

        impl #impl_generics ::galena_nbt::schema::SeqFromNbt for #input_name #ty_generics
        #where_clause
        {
            fn seq_from_nbt(
                value: ::galena_nbt::Value,
                opts: ::galena_nbt::schema::DecodeOptions,
            ) -> ::galena_nbt::Result<::std::vec::Vec<Self>> {
                match value {
                    ::galena_nbt::Value::List(::galena_nbt::List::Compound(elems)) => elems
                        .into_iter()
                        .map(|compound| {
                            ::galena_nbt::schema::FromCompound::from_compound(compound, opts)
                        })
                        .collect(),
                    ::galena_nbt::Value::List(::galena_nbt::List::End) => {
                        ::std::result::Result::Ok(::std::vec::Vec::new())
                    }
                    value => ::std::result::Result::Err(
                        ::galena_nbt::schema::mismatch("compound list", &value),
                    ),
                }
            }
        }
    })
}
