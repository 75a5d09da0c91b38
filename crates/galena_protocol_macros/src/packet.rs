use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::spanned::Spanned;
use syn::{parse2, parse_quote, Attribute, DeriveInput, Error, Expr, LitStr, Result};

use crate::add_trait_bounds;

pub(super) fn derive_packet(item: TokenStream) -> Result<TokenStream> {
    let mut input = parse2::<DeriveInput>(item)?;

    let mut packet_attr = PacketAttr {
        span: Span::call_site(),
        id: None,
        name: None,
        side: None,
        state: None,
    };

    for attr in &input.attrs {
        parse_packet_helper_attr(attr, &mut packet_attr)?;
    }

    let type_name = input.ident.clone();

    let name_str = match &packet_attr.name {
        Some(attr_name) => attr_name.value(),
        None => type_name.to_string(),
    };

    let Some(packet_id) = packet_attr.id else {
        return Err(Error::new(
            packet_attr.span,
            "missing `id = ...` value from `packet` helper attribute",
        ));
    };

    // The side is almost always evident from the `C2s`/`S2c` naming
    // convention, so only unconventional names need it spelled out.
    let side: Expr = match packet_attr.side {
        Some(side) => side,
        None if name_str.ends_with("S2c") => {
            parse_quote!(::galena_protocol::PacketSide::Clientbound)
        }
        None if name_str.ends_with("C2s") => {
            parse_quote!(::galena_protocol::PacketSide::Serverbound)
        }
        None => {
            return Err(Error::new(
                packet_attr.span,
                "missing `side = ...` value from `packet` helper attribute",
            ))
        }
    };

    let state: Expr = packet_attr
        .state
        .unwrap_or_else(|| parse_quote!(::galena_protocol::PacketState::Play));

    add_trait_bounds(&mut input.generics, quote!(::std::fmt::Debug));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::galena_protocol::__private::Packet for #type_name #ty_generics
        #where_clause
        {
            const ID: i32 = #packet_id;
            const NAME: &'static str = #name_str;
            const SIDE: ::galena_protocol::PacketSide = #side;
            const STATE: ::galena_protocol::PacketState = #state;
        }
    })
}

struct PacketAttr {
    span: Span,
    id: Option<Expr>,
    name: Option<LitStr>,
    side: Option<Expr>,
    state: Option<Expr>,
}

fn parse_packet_helper_attr(attr: &Attribute, res: &mut PacketAttr) -> Result<()> {
    if !attr.path().is_ident("packet") {
        return Ok(());
    }

    res.span = attr.span();

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("id") {
            res.id = Some(meta.value()?.parse::<Expr>()?);
            Ok(())
        } else if meta.path.is_ident("name") {
            res.name = Some(meta.value()?.parse::<LitStr>()?);
            Ok(())
        } else if meta.path.is_ident("side") {
            res.side = Some(meta.value()?.parse::<Expr>()?);
            Ok(())
        } else if meta.path.is_ident("state") {
            res.state = Some(meta.value()?.parse::<Expr>()?);
            Ok(())
        } else {
            Err(meta.error("unrecognized #[packet(...)] argument"))
        }
    })
}
