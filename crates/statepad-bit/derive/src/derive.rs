use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error, Fields};

const MAX_VARIANTS: usize = 64;

pub(crate) fn handle_derive_bit(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(e) => &e.variants,
        _ => {
            return Error::new_spanned(name, "Bit can be derived only for enums")
                .to_compile_error()
                .into();
        }
    };

    if variants.len() > MAX_VARIANTS {
        return Error::new_spanned(
            name,
            format!("Bit supports at most {MAX_VARIANTS} variants"),
        )
        .to_compile_error()
        .into();
    }

    let mut arms = Vec::with_capacity(variants.len());
    for (i, variant) in variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return Error::new_spanned(
                variant,
                "Bit supports only fieldless enum variants",
            )
            .to_compile_error()
            .into();
        }
        let ident = &variant.ident;
        let idx = i as u32;
        arms.push(quote! { #name::#ident => #idx });
    }

    let expanded = quote! {
        impl ::statepad_bit_mask::Bitable for #name {
            #[inline]
            fn bit(&self) -> u64 {
                1u64 << self.index()
            }

            #[inline]
            fn index(&self) -> u32 {
                match self { #( #arms, )* }
            }
        }
    };

    TokenStream::from(expanded)
}
