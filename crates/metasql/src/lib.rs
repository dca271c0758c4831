//! # metasql
//!
//! A metadata-driven SQL compiler for PostgreSQL.
//!
//! Table and column names arrive at runtime (from schema discovery, UI
//! configuration, or a declared entity shape), yet the SQL produced from them
//! must never be injectable. Every name passes through [`SafeIdent`] before it
//! reaches SQL text, and every value is bound as a `$n` parameter.
//!
//! ## Pieces
//!
//! - [`WhereBuilder`]: typed predicates over an [`Entity`]'s columns
//! - [`filter`]: caller-supplied condition lists, ordering and paging for any table
//! - [`EntityMapper`]: insert, partial update, select and soft delete with
//!   audit stamping and optimistic concurrency
//! - [`AdHocTable`]: the same CRUD for tables with no declared shape
//! - [`DeleteGuard`]: ordered read-only predicates that must all pass before a delete
//! - [`TableFunctionQuery`]: filtered, paged queries over table-valued functions
//!
//! ```ignore
//! use metasql::prelude::*;
//!
//! let request = FilterRequest::new()
//!     .condition(ConditionDescriptor::new("QTY", Operator::GreaterOrEqual).value("5"))
//!     .order_by(OrderDescriptor::desc("CREATED_AT"))
//!     .page(1, 20);
//! let table = SafeIdent::qualified("mes.lot")?;
//! let layout = discover_table(&client, &table, &cancel).await?;
//! let rows: Vec<DynamicRow> = compile_select(&table, &request, Some(&layout))?
//!     .fetch_all_as(&client)
//!     .await?;
//! ```

pub mod adhoc;
pub mod cancel;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod filter;
pub mod guard;
pub mod ident;
pub mod params;
pub mod prelude;
pub mod row;
pub mod schema;
pub mod sql;
pub mod transaction;
pub mod tvf;
pub mod value;
pub mod where_builder;

pub use adhoc::{AdHocTable, FieldBag};
pub use cancel::CancelSignal;
pub use client::GenericClient;
pub use config::{EngineConfig, GuardConfig};
pub use entity::{
    AnonymousPrincipal, AuditColumns, AuditStamp, ColumnMapping, Entity, EntityDescriptor,
    EntityMapper, EntityShape, FieldShape, PrincipalProvider, StaticPrincipal, UpdateById,
};
pub use error::{OrmError, OrmResult};
pub use filter::{
    ConditionDescriptor, Direction, FilterRequest, Operator, OrderDescriptor, PagingRequest,
    compile_count, compile_select,
};
pub use guard::{
    DeleteGuard, GuardDecision, GuardEngine, GuardRule, GuardRuleStore, ProbeOutcome, RuleProbe,
    extract_parameter_names, validate_predicate,
};
pub use ident::SafeIdent;
pub use params::ParameterBag;
pub use row::{DynamicRow, FromRow, RowExt};
pub use schema::{ColumnInfo, FunctionSignature, TableLayout, discover_function, discover_table};
pub use sql::{CompiledQuery, Sql};
pub use tvf::TableFunctionQuery;
pub use value::{SqlType, SqlValue};
pub use where_builder::{WhereBuilder, WhereClause};

#[cfg(feature = "derive")]
pub use metasql_derive::{Entity, FromRow};

// Used by derive-generated code.
#[doc(hidden)]
pub use tokio_postgres;
