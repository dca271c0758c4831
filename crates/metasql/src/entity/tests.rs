use super::*;
use crate::error::OrmError;
use crate::where_builder::WhereBuilder;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

struct WorkOrder {
    id: i64,
    order_no: String,
    qty: Option<i32>,
    row_version: i32,
    created_by: String,
}

impl Entity for WorkOrder {
    fn shape() -> EntityShape {
        EntityShape {
            type_name: "WorkOrder",
            table: "mes.work_order",
            fields: vec![
                FieldShape::new("id", "id").primary_key().generated(),
                FieldShape::new("order_no", "ORDER_NO"),
                FieldShape::new("qty", "QTY"),
                FieldShape::new("row_version", "row_version").concurrency_token(),
                FieldShape::new("created_by", "created_by"),
            ],
            audit: true,
        }
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.into(),
            self.order_no.clone().into(),
            self.qty.into(),
            self.row_version.into(),
            self.created_by.clone().into(),
        ]
    }
}

struct Tag {
    code: String,
    label: Option<String>,
}

impl Entity for Tag {
    fn shape() -> EntityShape {
        EntityShape {
            type_name: "Tag",
            table: "tag",
            fields: vec![
                FieldShape::new("code", "code").primary_key(),
                FieldShape::new("label", "label"),
            ],
            audit: false,
        }
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![self.code.clone().into(), self.label.clone().into()]
    }
}

struct Keyless;

impl Entity for Keyless {
    fn shape() -> EntityShape {
        EntityShape {
            type_name: "Keyless",
            table: "keyless",
            fields: vec![FieldShape::new("name", "name")],
            audit: false,
        }
    }

    fn values(&self) -> Vec<SqlValue> {
        Vec::new()
    }
}

fn stamp() -> AuditStamp {
    AuditStamp {
        user_id: "u-7".into(),
        at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    }
}

fn order() -> WorkOrder {
    WorkOrder {
        id: 0,
        order_no: "WO-1".into(),
        qty: Some(12),
        row_version: 3,
        created_by: "spoofed".into(),
    }
}

#[test]
fn descriptor_is_cached_per_type() {
    let a = WorkOrder::descriptor().unwrap();
    let b = WorkOrder::descriptor().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.primary_key().column.as_str(), "id");
    assert_eq!(a.concurrency_token().unwrap().column.as_str(), "row_version");
}

#[test]
fn missing_key_is_reported() {
    let err = Keyless::descriptor().unwrap_err();
    assert!(matches!(err, OrmError::MissingKeyDeclaration(name) if name == "Keyless"));
}

#[test]
fn insert_skips_generated_and_token_and_stamps_audit() {
    let q = EntityMapper::compile_insert(&order(), Some(&stamp())).unwrap();
    assert_eq!(
        q.sql(),
        "INSERT INTO mes.work_order (ORDER_NO, QTY, created_by, created_at, updated_by, updated_at, is_deleted) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)"
    );
    assert_eq!(q.params()[0], SqlValue::Text("WO-1".into()));
    assert_eq!(q.params()[1], SqlValue::Int(12));
    // The mapped created_by value is replaced by the stamp.
    assert_eq!(q.params()[2], SqlValue::Text("u-7".into()));
    assert_eq!(q.params()[6], SqlValue::Bool(false));
}

#[test]
fn insert_without_audit_binds_all_columns() {
    let tag = Tag {
        code: "HOT".into(),
        label: None,
    };
    let q = EntityMapper::compile_insert(&tag, None).unwrap();
    assert_eq!(q.sql(), "INSERT INTO tag (code, label) VALUES ($1, $2)");
    assert_eq!(q.params()[1], SqlValue::Null);
}

#[test]
fn insert_returning_key() {
    let q = EntityMapper::compile_insert_returning_key(&order(), Some(&stamp())).unwrap();
    assert!(q.sql().ends_with(" RETURNING id"));
}

#[test]
fn update_requires_token_when_declared() {
    let mapper = EntityMapper::default();
    let err = mapper
        .update_by_id::<WorkOrder>(1)
        .set("qty", 5)
        .compile(None)
        .unwrap_err();
    assert!(matches!(err, OrmError::MissingConcurrencyToken(_)));
}

#[test]
fn update_bumps_and_matches_token() {
    let mapper = EntityMapper::default();
    let q = mapper
        .update_by_id::<WorkOrder>(1)
        .set("qty", 5)
        .set("order_no", "WO-2")
        .set("qty", 6)
        .with_concurrency_token(3)
        .compile(None)
        .unwrap();
    assert_eq!(
        q.sql(),
        "UPDATE mes.work_order SET QTY = $1, ORDER_NO = $2, row_version = row_version + 1 \
         WHERE id = $3 AND row_version = $4"
    );
    assert_eq!(
        q.params(),
        &[
            SqlValue::Int(6),
            SqlValue::Text("WO-2".into()),
            SqlValue::Int(1),
            SqlValue::Int(3)
        ]
    );
}

#[test]
fn update_with_audit_adds_editor_columns() {
    let mapper = EntityMapper::default();
    let q = mapper
        .update_by_id::<WorkOrder>(1)
        .set("qty", 5)
        .audit()
        .with_concurrency_token(3)
        .compile(Some(&stamp()))
        .unwrap();
    assert_eq!(
        q.sql(),
        "UPDATE mes.work_order SET QTY = $1, updated_by = $2, updated_at = $3, \
         row_version = row_version + 1 WHERE id = $4 AND row_version = $5"
    );
}

struct Machine;

impl Entity for Machine {
    fn shape() -> EntityShape {
        EntityShape {
            type_name: "Machine",
            table: "mes.machine",
            fields: vec![
                FieldShape::new("id", "id").primary_key(),
                FieldShape::new("qty", "qty"),
                FieldShape::new("editor", "UPDATED_BY"),
                FieldShape::new("updated_at", "updated_at"),
            ],
            audit: true,
        }
    }

    fn values(&self) -> Vec<SqlValue> {
        Vec::new()
    }
}

#[test]
fn audit_stamp_replaces_mapped_editor_columns() {
    let mapper = EntityMapper::default();
    let q = mapper
        .update_by_id::<Machine>(1)
        .set("qty", 5)
        .set("editor", "someone")
        .set("updated_at", "2020-01-01")
        .audit()
        .compile(Some(&stamp()))
        .unwrap();
    assert_eq!(
        q.sql(),
        "UPDATE mes.machine SET qty = $1, updated_by = $2, updated_at = $3 WHERE id = $4"
    );
    assert_eq!(q.params()[1], SqlValue::Text("u-7".into()));

    // Without the stamp the mapped column is an ordinary assignment.
    let q = mapper
        .update_by_id::<Machine>(1)
        .set("editor", "someone")
        .compile(None)
        .unwrap();
    assert_eq!(q.sql(), "UPDATE mes.machine SET UPDATED_BY = $1 WHERE id = $2");
}

#[test]
fn audit_with_only_editor_columns_has_nothing_to_update() {
    let err = EntityMapper::default()
        .update_by_id::<Machine>(1)
        .set("editor", "someone")
        .audit()
        .compile(Some(&stamp()))
        .unwrap_err();
    assert!(matches!(err, OrmError::NoFieldsToUpdate));
}

#[test]
fn all_null_sets_with_ignore_nulls_fail() {
    let mapper = EntityMapper::default();
    let err = mapper
        .update_by_id::<Tag>("HOT")
        .set("label", None::<String>)
        .ignore_nulls()
        .compile(None)
        .unwrap_err();
    assert!(matches!(err, OrmError::NoFieldsToUpdate));
}

#[test]
fn all_null_sets_with_include_nulls_set_null() {
    let mapper = EntityMapper::default();
    let q = mapper
        .update_by_id::<Tag>("HOT")
        .set("label", None::<String>)
        .include_nulls()
        .compile(None)
        .unwrap();
    assert_eq!(q.sql(), "UPDATE tag SET label = $1 WHERE code = $2");
    assert_eq!(q.params()[0], SqlValue::Null);
}

#[test]
fn update_rejects_key_token_and_unknown_fields() {
    let mapper = EntityMapper::default();
    for field in ["id", "row_version", "nope"] {
        let err = mapper
            .update_by_id::<WorkOrder>(1)
            .set(field, 1)
            .with_concurrency_token(3)
            .compile(None)
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidIdentifier(_)), "{field}");
    }
}

#[test]
fn select_aliases_columns_to_properties() {
    let filter = WhereBuilder::<WorkOrder>::new()
        .eq("order_no", "WO-1")
        .build()
        .unwrap();
    // The entity type is carried by the clause.
    let q = EntityMapper::compile_select(filter, true).unwrap();
    assert_eq!(
        q.sql(),
        "SELECT id AS id, ORDER_NO AS order_no, QTY AS qty, row_version AS row_version, \
         created_by AS created_by FROM mes.work_order WHERE ORDER_NO = $1 LIMIT 1"
    );
}

#[test]
fn soft_delete_sets_flag_and_editor() {
    let filter = WhereBuilder::<WorkOrder>::new().eq("id", 9).build().unwrap();
    let q = EntityMapper::compile_soft_delete::<WorkOrder>(filter, &stamp()).unwrap();
    assert_eq!(
        q.sql(),
        "UPDATE mes.work_order SET is_deleted = $1, updated_by = $2, updated_at = $3 WHERE id = $4"
    );
    assert_eq!(q.params()[0], SqlValue::Bool(true));
    assert_eq!(q.params()[3], SqlValue::Int(9));
}

#[test]
fn soft_delete_needs_audit_convention() {
    let filter = WhereBuilder::<Tag>::new().eq("code", "HOT").build().unwrap();
    let err = EntityMapper::compile_soft_delete::<Tag>(filter, &stamp()).unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn user_id_falls_back_to_anonymous() {
    assert_eq!(EntityMapper::default().user_id(), "anonymous");
    assert_eq!(EntityMapper::new(StaticPrincipal("alice".into())).user_id(), "alice");
    assert_eq!(EntityMapper::new(|| Some("  ".to_string())).user_id(), "anonymous");
}
