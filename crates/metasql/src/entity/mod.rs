//! Reflective entity mapping.
//!
//! An [`Entity`] describes its table through an [`EntityShape`], usually
//! generated by `#[derive(Entity)]`:
//!
//! ```ignore
//! use metasql::{Entity, FromRow};
//!
//! #[derive(Entity, FromRow)]
//! #[orm(table = "mes.lot", audit)]
//! struct Lot {
//!     #[orm(id, generated)]
//!     id: i64,
//!     #[orm(column = "LOT_NO")]
//!     lot_no: String,
//!     qty: i32,
//!     #[orm(version)]
//!     row_version: i32,
//! }
//! ```
//!
//! The shape is validated into an [`EntityDescriptor`] on first use and
//! cached for the life of the process. [`EntityMapper`] turns descriptors
//! into INSERT / selective UPDATE / SELECT / soft-delete statements.

mod audit;
mod cache;
mod descriptor;
mod mapper;
mod update;

#[cfg(test)]
mod tests;

pub use audit::{AnonymousPrincipal, AuditStamp, PrincipalProvider, StaticPrincipal, server_now};
pub use cache::cached_descriptor_count;
pub use descriptor::{AuditColumns, ColumnMapping, EntityDescriptor, EntityShape, FieldShape};
pub use mapper::EntityMapper;
pub use update::UpdateById;

use crate::error::OrmResult;
use crate::value::SqlValue;
use std::sync::Arc;

/// A type mapped to one table.
pub trait Entity: Sized + Send + Sync + 'static {
    /// Static declaration of table, fields and conventions.
    fn shape() -> EntityShape;

    /// Field values in the same order as `shape().fields`.
    fn values(&self) -> Vec<SqlValue>;

    /// Validated descriptor, computed once per type.
    fn descriptor() -> OrmResult<Arc<EntityDescriptor>> {
        cache::descriptor_for::<Self>()
    }
}
