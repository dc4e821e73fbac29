//! Proc-macros for `arbor-common`.
extern crate proc_macro;

mod data;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{ToTokens, TokenStreamExt};

/// Name of the crate that defines the `Data` trait, as seen from the expansion site.
pub(crate) struct CrateName;
pub(crate) const CRATE: CrateName = CrateName;

impl ToTokens for CrateName {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.append(Ident::new("arbor_common", Span::call_site()))
    }
}

/// Derives `arbor_common::Data`.
///
/// Fields are compared with `Data::same` unless annotated:
/// - `#[data(ignore)]`: the field is not compared;
/// - `#[data(same_fn = "path")]`: the field is compared with `path(&a, &b)`.
#[proc_macro_derive(Data, attributes(data))]
pub fn derive_data(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    data::derive_data_impl(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
