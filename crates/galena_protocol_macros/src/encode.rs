use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse2, Data, DeriveInput, Error, Fields, Ident, Index, Result};

use crate::{
    add_trait_bounds, check_back_reference, pair_variants_with_discriminants, parse_field_attrs,
};

pub(super) fn derive_encode(item: TokenStream) -> Result<TokenStream> {
    let mut input = parse2::<DeriveInput>(item)?;

    let input_name = input.ident;

    match input.data {
        Data::Struct(struct_) => {
            let encode_fields = match struct_.fields {
                Fields::Named(fields) => {
                    let mut earlier = vec![];
                    let mut tokens = TokenStream::new();

                    for f in &fields.named {
                        let attrs = parse_field_attrs(&f.attrs)?;
                        let name = f.ident.clone().unwrap();
                        let ctx = format!("failed to encode field `{name}` in `{input_name}`");

                        if let Some(sibling) = &attrs.len {
                            check_back_reference(sibling, &earlier, &name)?;

                            let count_ctx = format!(
                                "bad element count in `{sibling}` for field `{name}` in \
                                 `{input_name}`"
                            );

                            tokens.extend(quote! {
                                {
                                    let __count =
                                        Count::count(&self.#sibling).context(#count_ctx)?;

                                    ensure!(
                                        __count == self.#name.len(),
                                        "length of field `{}` ({}) does not match the value of \
                                         `{}` ({}) in `{}`",
                                        stringify!(#name),
                                        self.#name.len(),
                                        stringify!(#sibling),
                                        __count,
                                        stringify!(#input_name),
                                    );

                                    self.#name.encode_counted(&mut _w).context(#ctx)?;
                                }
                            });
                        } else if let Some(flag) = &attrs.present {
                            check_back_reference(flag, &earlier, &name)?;

                            tokens.extend(quote! {
                                {
                                    ensure!(
                                        self.#flag == self.#name.is_some(),
                                        "presence of optional field `{}` does not match the \
                                         value of `{}` in `{}`",
                                        stringify!(#name),
                                        stringify!(#flag),
                                        stringify!(#input_name),
                                    );

                                    if let Some(__value) = &self.#name {
                                        __value.encode(&mut _w).context(#ctx)?;
                                    }
                                }
                            });
                        } else {
                            tokens.extend(quote! {
                                self.#name.encode(&mut _w).context(#ctx)?;
                            });
                        }

                        earlier.push(name);
                    }

                    tokens
                }
                Fields::Unnamed(fields) => {
                    for f in &fields.unnamed {
                        let attrs = parse_field_attrs(&f.attrs)?;
                        if attrs.len.is_some() || attrs.present.is_some() {
                            return Err(Error::new(
                                f.span(),
                                "back-reference attributes require named fields",
                            ));
                        }
                    }

                    (0..fields.unnamed.len())
                        .map(|i| {
                            let idx = Index::from(i);
                            let ctx = format!("failed to encode field `{i}` in `{input_name}`");
                            quote! {
                                self.#idx.encode(&mut _w).context(#ctx)?;
                            }
                        })
                        .collect()
                }
                Fields::Unit => TokenStream::new(),
            };

            add_trait_bounds(&mut input.generics, quote!(::galena_protocol::Encode));

            let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

            Ok(quote! {
                #[allow(unused_imports, unused_variables, unused_mut)]
                impl #impl_generics ::galena_protocol::__private::Encode for #input_name #ty_generics
                #where_clause
                {
                    fn encode(&self, mut _w: impl ::std::io::Write) -> ::galena_protocol::__private::Result<()> {
                        use ::galena_protocol::__private::{
                            ensure, Context, Count, Encode, EncodeCounted, VarInt,
                        };

                        #encode_fields

                        Ok(())
                    }
                }
            })
        }
        Data::Enum(enum_) => {
            let variants = pair_variants_with_discriminants(enum_.variants.into_iter())?;

            let encode_arms = variants
                .iter()
                .map(|(disc, variant)| {
                    let variant_name = &variant.ident;

                    match &variant.fields {
                        Fields::Named(fields) => {
                            let names = fields
                                .named
                                .iter()
                                .map(|f| f.ident.clone().unwrap())
                                .collect::<Vec<_>>();

                            let encodes = names
                                .iter()
                                .map(|name| {
                                    let ctx = format!(
                                        "failed to encode field `{name}` in variant \
                                         `{variant_name}` in `{input_name}`",
                                    );
                                    quote! {
                                        #name.encode(&mut _w).context(#ctx)?;
                                    }
                                })
                                .collect::<TokenStream>();

                            quote! {
                                Self::#variant_name { #(#names,)* } => {
                                    VarInt(#disc).encode(&mut _w)
                                        .context("failed to encode enum discriminant")?;
                                    #encodes
                                }
                            }
                        }
                        Fields::Unnamed(fields) => {
                            let bindings = (0..fields.unnamed.len())
                                .map(|i| Ident::new(&format!("_{i}"), Span::call_site()))
                                .collect::<Vec<_>>();

                            let encodes = bindings
                                .iter()
                                .enumerate()
                                .map(|(i, binding)| {
                                    let ctx = format!(
                                        "failed to encode field `{i}` in variant \
                                         `{variant_name}` in `{input_name}`",
                                    );
                                    quote! {
                                        #binding.encode(&mut _w).context(#ctx)?;
                                    }
                                })
                                .collect::<TokenStream>();

                            quote! {
                                Self::#variant_name(#(#bindings,)*) => {
                                    VarInt(#disc).encode(&mut _w)
                                        .context("failed to encode enum discriminant")?;
                                    #encodes
                                }
                            }
                        }
                        Fields::Unit => quote! {
                            Self::#variant_name => VarInt(#disc).encode(&mut _w)
                                .context("failed to encode enum discriminant")?,
                        },
                    }
                })
                .collect::<TokenStream>();

            add_trait_bounds(&mut input.generics, quote!(::galena_protocol::Encode));

            let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

            Ok(quote! {
                #[allow(unused_imports, unused_variables, unused_mut)]
                impl #impl_generics ::galena_protocol::__private::Encode for #input_name #ty_generics
                #where_clause
                {
                    fn encode(&self, mut _w: impl ::std::io::Write) -> ::galena_protocol::__private::Result<()> {
                        use ::galena_protocol::__private::{Context, Encode, VarInt};

                        match self {
                            #encode_arms
                        }

                        Ok(())
                    }
                }
            })
        }
        Data::Union(u) => Err(Error::new(
            u.union_token.span(),
            "cannot derive `Encode` on unions",
        )),
    }
}
