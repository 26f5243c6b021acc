mod derive;

use proc_macro::TokenStream;

use crate::derive::handle_derive_bit;

/// Implements `statepad_bit_mask::Bitable` for a fieldless enum.
///
/// Variants get consecutive bits in declaration order, so an enum may hold
/// at most 64 variants.
#[proc_macro_derive(Bit)]
pub fn derive_bit(input: TokenStream) -> TokenStream {
    handle_derive_bit(input)
}
