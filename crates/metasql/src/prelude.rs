//! Common imports.
//!
//! ```ignore
//! use metasql::prelude::*;
//! ```

pub use crate::{
    AdHocTable, CancelSignal, ConditionDescriptor, DeleteGuard, DynamicRow, Entity, EntityMapper,
    FieldBag, FilterRequest, FromRow, GenericClient, Operator, OrderDescriptor, OrmError,
    OrmResult, ParameterBag, RowExt, SafeIdent, SqlValue, TableFunctionQuery, WhereBuilder,
    compile_select, discover_function, discover_table,
};
