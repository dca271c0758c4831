//! Derive macros for metasql
//!
//! Provides `#[derive(Entity)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod from_row;
mod sql_ident;

/// Derive `Entity` for a struct, declaring its table shape.
///
/// # Example
///
/// ```ignore
/// use metasql::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "mes.work_order", audit)]
/// struct WorkOrder {
///     #[orm(id, generated)]
///     id: i64,
///     #[orm(column = "ORDER_NO")]
///     order_no: String,
///     qty: Option<i32>,
///     #[orm(version)]
///     row_version: i32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name, optionally schema-qualified (required)
/// - `#[orm(audit)]` - The table carries the audit columns
/// - `#[orm(id)]` - Primary key
/// - `#[orm(version)]` - Concurrency token
/// - `#[orm(generated)]` - Assigned by the database
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Not mapped
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` for a struct.
///
/// Each field is read from the result column with the same name, so it pairs
/// with the `column AS property` projection of entity selects.
///
/// ```ignore
/// #[derive(FromRow)]
/// struct LotSummary {
///     lot_no: String,
///     qty: Option<i32>,
/// }
/// ```
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
