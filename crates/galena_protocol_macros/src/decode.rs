use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse2, parse_quote, Data, DeriveInput, Error, Fields, Result};

use crate::{
    add_trait_bounds, check_back_reference, decode_split_for_impl,
    pair_variants_with_discriminants, parse_field_attrs,
};

pub(super) fn derive_decode(item: TokenStream) -> Result<TokenStream> {
    let mut input = parse2::<DeriveInput>(item)?;

    let input_name = input.ident;

    if input.generics.lifetimes().count() > 1 {
        return Err(Error::new(
            input.generics.params.span(),
            "type deriving `Decode` must have no more than one lifetime",
        ));
    }

    // Use the lifetime specified in the type definition or just use `'a` if
    // not present.
    let lifetime = input
        .generics
        .lifetimes()
        .next()
        .map(|l| l.lifetime.clone())
        .unwrap_or_else(|| parse_quote!('a));

    match input.data {
        Data::Struct(struct_) => {
            let decode_body = match struct_.fields {
                Fields::Named(fields) => {
                    let mut earlier = vec![];
                    let mut lets = TokenStream::new();

                    for f in &fields.named {
                        let attrs = parse_field_attrs(&f.attrs)?;
                        let name = f.ident.clone().unwrap();
                        let ctx = format!("failed to decode field `{name}` in `{input_name}`");

                        if let Some(sibling) = &attrs.len {
                            check_back_reference(sibling, &earlier, &name)?;

                            let count_ctx = format!(
                                "bad element count in `{sibling}` for field `{name}` in \
                                 `{input_name}`"
                            );

                            lets.extend(quote! {
                                let #name = {
                                    let __count = Count::count(&#sibling).context(#count_ctx)?;
                                    DecodeCounted::decode_counted(_r, __count).context(#ctx)?
                                };
                            });
                        } else if let Some(flag) = &attrs.present {
                            check_back_reference(flag, &earlier, &name)?;

                            lets.extend(quote! {
                                let #name = if #flag {
                                    Some(Decode::decode(_r).context(#ctx)?)
                                } else {
                                    None
                                };
                            });
                        } else {
                            lets.extend(quote! {
                                let #name = Decode::decode(_r).context(#ctx)?;
                            });
                        }

                        earlier.push(name);
                    }

                    let names = earlier.iter();

                    quote! {
                        #lets

                        Ok(Self {
                            #(#names,)*
                        })
                    }
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

                    let init = (0..fields.unnamed.len())
                        .map(|i| {
                            let ctx = format!("failed to decode field `{i}` in `{input_name}`");
                            quote! {
                                Decode::decode(_r).context(#ctx)?,
                            }
                        })
                        .collect::<TokenStream>();

                    quote! {
                        Ok(Self(#init))
                    }
                }
                Fields::Unit => quote!(Ok(Self)),
            };

            add_trait_bounds(
                &mut input.generics,
                quote!(::galena_protocol::Decode<#lifetime>),
            );

            let (impl_generics, ty_generics, where_clause) =
                decode_split_for_impl(input.generics, lifetime.clone());

            Ok(quote! {
                #[allow(unused_imports)]
                impl #impl_generics ::galena_protocol::__private::Decode<#lifetime> for #input_name #ty_generics
                #where_clause
                {
                    fn decode(_r: &mut &#lifetime [u8]) -> ::galena_protocol::__private::Result<Self> {
                        use ::galena_protocol::__private::{
                            bail, ensure, Context, Count, Decode, DecodeCounted, VarInt,
                        };

                        #decode_body
                    }
                }
            })
        }
        Data::Enum(enum_) => {
            let variants = pair_variants_with_discriminants(enum_.variants.into_iter())?;

            let decode_arms = variants
                .iter()
                .map(|(disc, variant)| {
                    let name = &variant.ident;

                    match &variant.fields {
                        Fields::Named(fields) => {
                            let fields = fields
                                .named
                                .iter()
                                .map(|f| {
                                    let field = f.ident.as_ref().unwrap();
                                    let ctx = format!(
                                        "failed to decode field `{field}` in variant `{name}` in \
                                         `{input_name}`",
                                    );
                                    quote! {
                                        #field: Decode::decode(_r).context(#ctx)?,
                                    }
                                })
                                .collect::<TokenStream>();

                            quote! {
                                #disc => Ok(Self::#name { #fields }),
                            }
                        }
                        Fields::Unnamed(fields) => {
                            let init = (0..fields.unnamed.len())
                                .map(|i| {
                                    let ctx = format!(
                                        "failed to decode field `{i}` in variant `{name}` in \
                                         `{input_name}`",
                                    );
                                    quote! {
                                        Decode::decode(_r).context(#ctx)?,
                                    }
                                })
                                .collect::<TokenStream>();

                            quote! {
                                #disc => Ok(Self::#name(#init)),
                            }
                        }
                        Fields::Unit => quote!(#disc => Ok(Self::#name),),
                    }
                })
                .collect::<TokenStream>();

            add_trait_bounds(
                &mut input.generics,
                quote!(::galena_protocol::Decode<#lifetime>),
            );

            let (impl_generics, ty_generics, where_clause) =
                decode_split_for_impl(input.generics, lifetime.clone());

            Ok(quote! {
                #[allow(unused_imports)]
                impl #impl_generics ::galena_protocol::__private::Decode<#lifetime> for #input_name #ty_generics
                #where_clause
                {
                    fn decode(_r: &mut &#lifetime [u8]) -> ::galena_protocol::__private::Result<Self> {
                        use ::galena_protocol::__private::{bail, Context, Decode, VarInt};

                        let ctx = concat!("failed to decode enum discriminant in `", stringify!(#input_name), "`");
                        let disc = VarInt::decode(_r).context(ctx)?.0;
                        match disc {
                            #decode_arms
                            n => bail!("unexpected enum discriminant {} in `{}`", n, stringify!(#input_name)),
                        }
                    }
                }
            })
        }
        Data::Union(u) => Err(Error::new(
            u.union_token.span(),
            "cannot derive `Decode` on unions",
        )),
    }
}
