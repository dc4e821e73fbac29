// Copyright 2019 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Adapted for use in arbor.
use crate::CRATE;
use proc_macro2::{Ident, Literal, Span, TokenStream, TokenTree};
use quote::{format_ident, quote, quote_spanned};
use syn::{spanned::Spanned, DataEnum, DataStruct, DeriveInput, Error, ExprPath, Meta, NestedMeta};

const DATA_ATTR: &str = "data";
const IGNORE: &str = "ignore";
const SAME_FN: &str = "same_fn";

/// One field of a struct or enum variant, with its `#[data(...)]` options.
struct FieldInfo {
    /// Field name, or position for tuple fields.
    member: TokenTree,
    /// Name usable as a binding in match patterns.
    binding: String,
    ignore: bool,
    same_fn: Option<ExprPath>,
}

impl FieldInfo {
    fn parse(field: &syn::Field, index: usize) -> Result<FieldInfo, Error> {
        let (member, binding): (TokenTree, String) = match field.ident.as_ref() {
            Some(ident) => {
                let name = ident.to_string().trim_start_matches("r#").to_owned();
                (Ident::new(&name, Span::call_site()).into(), name)
            }
            None => (Literal::usize_unsuffixed(index).into(), index.to_string()),
        };

        let mut ignore = false;
        let mut same_fn = None;

        for attr in field.attrs.iter().filter(|attr| attr.path.is_ident(DATA_ATTR)) {
            let list = match attr.parse_meta()? {
                Meta::List(list) => list,
                other => {
                    return Err(Error::new(
                        other.span(),
                        "expected an attribute list of the form #[data(ignore)] or #[data(same_fn = \"path\")]",
                    ))
                }
            };
            for nested in list.nested.iter() {
                match nested {
                    NestedMeta::Meta(Meta::Path(path)) if path.is_ident(IGNORE) => {
                        if ignore {
                            return Err(Error::new(nested.span(), "duplicate `ignore` attribute"));
                        }
                        ignore = true;
                    }
                    NestedMeta::Meta(Meta::NameValue(meta)) if meta.path.is_ident(SAME_FN) => {
                        if same_fn.is_some() {
                            return Err(Error::new(meta.span(), "duplicate `same_fn` attribute"));
                        }
                        same_fn = Some(parse_expr_path(&meta.lit)?);
                    }
                    other => return Err(Error::new(other.span(), "unknown `data` attribute")),
                }
            }
        }

        Ok(FieldInfo {
            member,
            binding,
            ignore,
            same_fn,
        })
    }

    fn parse_all(fields: &syn::Fields) -> Result<Vec<FieldInfo>, Error> {
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| FieldInfo::parse(field, i))
            .collect()
    }

    /// The function used to compare this field.
    fn same_fn(&self) -> TokenStream {
        match self.same_fn {
            Some(ref path) => quote!(#path),
            None => quote_spanned!(Span::call_site()=> ::#CRATE::Data::same),
        }
    }

    fn left(&self) -> Ident {
        format_ident!("__self_{}", self.binding)
    }

    fn right(&self) -> Ident {
        format_ident!("__other_{}", self.binding)
    }
}

fn parse_expr_path(lit: &syn::Lit) -> Result<ExprPath, Error> {
    match lit {
        syn::Lit::Str(s) => s.parse(),
        other => Err(Error::new(other.span(), "expected a string literal containing a path")),
    }
}

pub(crate) fn derive_data_impl(input: DeriveInput) -> Result<TokenStream, Error> {
    let body = match &input.data {
        syn::Data::Struct(s) => struct_body(s)?,
        syn::Data::Enum(e) => enum_body(e)?,
        syn::Data::Union(u) => {
            return Err(Error::new(
                u.union_token.span(),
                "Data implementations cannot be derived from unions",
            ))
        }
    };

    let ident = &input.ident;
    let bounds = generics_bounds(&input.generics);
    let (_, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl<#bounds> ::#CRATE::Data for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn same(&self, other: &Self) -> bool {
                #body
            }
        }
    })
}

fn struct_body(s: &DataStruct) -> Result<TokenStream, Error> {
    let fields = FieldInfo::parse_all(&s.fields)?;
    let tests: Vec<_> = fields
        .iter()
        .filter(|f| !f.ignore)
        .map(|f| {
            let same_fn = f.same_fn();
            let member = &f.member;
            quote!(#same_fn(&self.#member, &other.#member))
        })
        .collect();
    if tests.is_empty() {
        Ok(quote!(true))
    } else {
        Ok(quote!( #( #tests )&&* ))
    }
}

fn enum_body(e: &DataEnum) -> Result<TokenStream, Error> {
    let mut arms = Vec::with_capacity(e.variants.len());

    for variant in e.variants.iter() {
        let name = &variant.ident;
        let fields = FieldInfo::parse_all(&variant.fields)?;

        let tests: Vec<_> = fields
            .iter()
            .filter(|f| !f.ignore)
            .map(|f| {
                let same_fn = f.same_fn();
                let (l, r) = (f.left(), f.right());
                quote!(#same_fn(#l, #r))
            })
            .collect();
        let test = if tests.is_empty() {
            quote!(true)
        } else {
            quote!( #( #tests )&&* )
        };

        let arm = match &variant.fields {
            syn::Fields::Named(_) => {
                let lefts = fields.iter().map(|f| {
                    let (member, l) = (&f.member, f.left());
                    quote!(#member: #l)
                });
                let rights = fields.iter().map(|f| {
                    let (member, r) = (&f.member, f.right());
                    quote!(#member: #r)
                });
                quote!((Self::#name { #( #lefts ),* }, Self::#name { #( #rights ),* }) => #test)
            }
            syn::Fields::Unnamed(_) => {
                let lefts = fields.iter().map(FieldInfo::left);
                let rights = fields.iter().map(FieldInfo::right);
                quote!((Self::#name( #( #lefts ),* ), Self::#name( #( #rights ),* )) => #test)
            }
            syn::Fields::Unit => quote!((Self::#name, Self::#name) => true),
        };
        arms.push(arm);
    }

    // ignored fields are still bound by the patterns above
    Ok(quote! {
        match (self, other) {
            #( #arms, )*
            _ => false,
        }
    })
}

fn generics_bounds(generics: &syn::Generics) -> TokenStream {
    let params = generics.params.iter().map(|param| match param {
        syn::GenericParam::Type(ty) => {
            let ident = &ty.ident;
            let bounds = &ty.bounds;
            if bounds.is_empty() {
                quote_spanned!(ty.span()=> #ident: ::#CRATE::Data)
            } else {
                quote_spanned!(ty.span()=> #ident: #bounds + ::#CRATE::Data)
            }
        }
        syn::GenericParam::Lifetime(lt) => quote!(#lt),
        syn::GenericParam::Const(c) => quote!(#c),
    });
    quote!( #( #params, )* )
}
