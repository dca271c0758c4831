use super::*;
use crate::ident::SafeIdent;
use crate::value::SqlValue;

#[test]
fn builds_placeholders_in_order() {
    let mut q = Sql::new("SELECT * FROM lot WHERE a = ");
    q.push_bind(1).push(" AND b = ").push_bind("x");

    assert_eq!(q.to_sql(), "SELECT * FROM lot WHERE a = $1 AND b = $2");
    assert_eq!(q.param_count(), 2);
}

#[test]
fn can_compose_fragments() {
    let mut w = Sql::empty();
    w.push(" WHERE id = ").push_bind(42);

    let mut q = Sql::new("UPDATE lot SET qty = ");
    q.push_bind(3);
    q.push_sql(w);

    let compiled = q.build();
    assert_eq!(compiled.sql(), "UPDATE lot SET qty = $1 WHERE id = $2");
    assert_eq!(compiled.params(), &[SqlValue::Int(3), SqlValue::Int(42)]);
}

#[test]
fn bind_list_renders_commas() {
    let mut q = Sql::new("SELECT * FROM lot WHERE id IN (");
    q.push_bind_list(vec![1, 2, 3]).push(")");
    assert_eq!(q.to_sql(), "SELECT * FROM lot WHERE id IN ($1, $2, $3)");
    assert_eq!(q.param_count(), 3);
}

#[test]
fn bind_list_empty_is_valid_sql() {
    let mut q = Sql::new("SELECT * FROM lot WHERE id IN (");
    q.push_bind_list(Vec::<i32>::new()).push(")");
    assert_eq!(q.to_sql(), "SELECT * FROM lot WHERE id IN (NULL)");
    assert_eq!(q.param_count(), 0);
}

#[test]
fn push_ident_is_verbatim() {
    let mut q = Sql::empty();
    q.push_ident(&SafeIdent::column("WO_NO").unwrap());
    q.push(", ");
    q.push_ident(&SafeIdent::qualified("mes.Lot_Master").unwrap());
    assert_eq!(q.to_sql(), "WO_NO, mes.Lot_Master");
}

#[test]
fn joined_skips_empty_fragments() {
    let mut a = Sql::empty();
    a.push("a = ").push_bind(1);
    let mut b = Sql::empty();
    b.push("b = ").push_bind(2);

    let mut q = Sql::empty();
    q.push_joined(vec![a, Sql::empty(), b], " AND ");
    assert_eq!(q.to_sql(), "a = $1 AND b = $2");
}

#[test]
fn offset_fetch_is_parameterized() {
    let mut q = Sql::new("SELECT 1 ORDER BY 1");
    q.push_offset_fetch(10, 10);
    let compiled = q.build();
    assert_eq!(
        compiled.sql(),
        "SELECT 1 ORDER BY 1 OFFSET $1 ROWS FETCH NEXT $2 ROWS ONLY"
    );
    assert_eq!(compiled.params(), &[SqlValue::Int(10), SqlValue::Int(10)]);
}

#[test]
fn placeholders_past_nine_render_correctly() {
    let mut q = Sql::empty();
    q.push_bind_list(1..=11);
    assert!(q.to_sql().ends_with("$10, $11"));
}

#[test]
fn strip_prefix_skips_comments_and_parens() {
    assert_eq!(strip_sql_prefix("  -- hi\n /* x */ (SELECT 1)"), "SELECT 1)");
    assert!(starts_with_keyword("select 1", "SELECT"));
    assert!(!starts_with_keyword("SELECTED", "SELECT"));
}
