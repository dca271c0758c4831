//! `#[orm(...)]` attribute parsing.
//!
//! Struct level: `table = "schema.name"`, `audit`.
//! Field level: `id`, `version`, `generated`, `column = "NAME"`, `skip`.

use crate::sql_ident::{parse_column_name, parse_column_name_with_span, parse_table_name};
use syn::ext::IdentExt;
use syn::{DeriveInput, Result};

#[derive(Default)]
pub(crate) struct StructAttr {
    pub table: Option<String>,
    pub audit: bool,
}

impl syn::parse::Parse for StructAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut out = StructAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.call(syn::Ident::parse_any)?;
            if ident == "audit" {
                out.audit = true;
            } else if ident == "table" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                out.table = Some(parse_table_name(&value)?);
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("unknown orm attribute `{ident}` (expected `table` or `audit`)"),
                ));
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(out)
    }
}

#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub is_version: bool,
    pub is_generated: bool,
    pub skip: bool,
    pub column: Option<String>,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut out = FieldAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.call(syn::Ident::parse_any)?;
            match ident.to_string().as_str() {
                "id" => out.is_id = true,
                "version" => out.is_version = true,
                "generated" => out.is_generated = true,
                "skip" => out.skip = true,
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    out.column = Some(parse_column_name(&value)?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown orm field attribute `{other}`"),
                    ));
                }
            }
            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }
        Ok(out)
    }
}

pub(crate) fn struct_attr(input: &DeriveInput) -> Result<StructAttr> {
    let mut merged = StructAttr::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: StructAttr = attr.parse_args()?;
        merged.table = parsed.table.or(merged.table);
        merged.audit |= parsed.audit;
    }
    Ok(merged)
}

pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut merged = FieldAttr::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("orm")) {
        let parsed: FieldAttr = attr.parse_args()?;
        merged.is_id |= parsed.is_id;
        merged.is_version |= parsed.is_version;
        merged.is_generated |= parsed.is_generated;
        merged.skip |= parsed.skip;
        merged.column = parsed.column.or(merged.column);
    }
    Ok(merged)
}

/// Field name with any `r#` prefix removed.
pub(crate) fn property_name(ident: &syn::Ident) -> String {
    ident.unraw().to_string()
}

/// Column for a field: the explicit `column = "..."` or the property name.
pub(crate) fn column_name(ident: &syn::Ident, attr: &FieldAttr) -> Result<String> {
    match &attr.column {
        Some(column) => Ok(column.clone()),
        None => parse_column_name_with_span(&property_name(ident), ident.span()),
    }
}

pub(crate) fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}
