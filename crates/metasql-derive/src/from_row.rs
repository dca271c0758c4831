//! FromRow derive macro implementation

use crate::attrs::{field_attr, named_fields, property_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

/// Fields are read by property name, which is the alias entity selects
/// project each column under. `#[orm(skip)]` fields take `Default::default()`.
pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut field_extracts = Vec::new();
    for field in named_fields(&input, "FromRow")? {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if field_attr(field)?.skip {
            field_extracts.push(quote! { #ident: ::core::default::Default::default() });
            continue;
        }
        let property = property_name(ident);
        field_extracts.push(quote! {
            #ident: ::metasql::RowExt::try_get_column(row, #property)?
        });
    }

    Ok(quote! {
        impl #impl_generics ::metasql::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::metasql::tokio_postgres::Row) -> ::metasql::OrmResult<Self> {
                Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
