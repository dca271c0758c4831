//! Entity derive macro implementation

use crate::attrs::{column_name, field_attr, named_fields, property_name, struct_attr};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let attr = struct_attr(&input)?;
    let Some(table) = attr.table else {
        return Err(syn::Error::new_spanned(
            &input,
            "Entity requires #[orm(table = \"table_name\")] attribute",
        ));
    };
    let audit = attr.audit;
    let type_name = name.to_string();

    let mut shapes = Vec::new();
    let mut values = Vec::new();
    let mut has_id = false;
    for field in named_fields(&input, "Entity")? {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let fattr = field_attr(field)?;
        if fattr.skip {
            continue;
        }
        if fattr.is_id && has_id {
            return Err(syn::Error::new_spanned(
                field,
                "composite primary keys are not supported; mark exactly one field #[orm(id)]",
            ));
        }
        has_id |= fattr.is_id;

        let property = property_name(ident);
        let column = column_name(ident, &fattr)?;
        let mut shape = quote! { ::metasql::FieldShape::new(#property, #column) };
        if fattr.is_id {
            shape = quote! { #shape.primary_key() };
        }
        if fattr.is_version {
            shape = quote! { #shape.concurrency_token() };
        }
        if fattr.is_generated {
            shape = quote! { #shape.generated() };
        }
        shapes.push(shape);
        values.push(quote! {
            ::metasql::SqlValue::from(::core::clone::Clone::clone(&self.#ident))
        });
    }

    // A shape without a key still compiles; the runtime reports
    // MissingKeyDeclaration on first use.
    Ok(quote! {
        impl #impl_generics ::metasql::Entity for #name #ty_generics #where_clause {
            fn shape() -> ::metasql::EntityShape {
                ::metasql::EntityShape {
                    type_name: #type_name,
                    table: #table,
                    fields: ::std::vec![#(#shapes),*],
                    audit: #audit,
                }
            }

            fn values(&self) -> ::std::vec::Vec<::metasql::SqlValue> {
                ::std::vec![#(#values),*]
            }
        }
    })
}
