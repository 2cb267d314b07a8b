use proc_macro;
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::{self, parse_macro_input, ItemEnum};

/// Appends a `Base(crate::errors::Error)` variant to the annotated thiserror
/// enum along with `From` implementations for the base error, `io::Error` and
/// boxed errors so that `?` works across module boundaries.
#[proc_macro_attribute]
pub fn wraps_base_error(
    _attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let en = parse_macro_input!(item as ItemEnum);
    let mut tokens = TokenStream::new();

    let attrs = &en.attrs;
    let vis = &en.vis;
    let ident = &en.ident;
    let generics = &en.generics;
    let variants = &en.variants;

    let appended = quote! {
        #vis enum #ident #generics  {
            #variants

            #[error("{0}")]
            Base(crate::errors::Error),
        }

        impl #generics ::std::convert::From<::std::io::Error> for #ident #generics {
            fn from(value: ::std::io::Error) -> Self {
                Self::Base(crate::errors::Error::from(value))
            }
        }

        impl #generics ::std::convert::From<crate::errors::Error> for #ident #generics {
            fn from(value: crate::errors::Error) -> Self {
                Self::Base(value)
            }
        }

        impl #generics ::std::convert::From<::std::boxed::Box<dyn ::std::error::Error + ::std::marker::Send + ::std::marker::Sync>> for #ident #generics  {
            fn from(value: ::std::boxed::Box<dyn ::std::error::Error + ::std::marker::Send + ::std::marker::Sync>) -> Self {
                Self::Base(crate::errors::Error::from(value))
            }
        }
    };

    for att in attrs {
        att.to_tokens(&mut tokens);
    }

    appended.to_tokens(&mut tokens);
    tokens.into()
}
