use super::*;
use bytes::BytesMut;
use serde_json::json;
use tokio_postgres::types::{IsNull, ToSql, Type};

#[test]
fn declared_type_names_map_to_families() {
    assert_eq!(SqlType::from_declared("int"), SqlType::Integer);
    assert_eq!(SqlType::from_declared(" BIGINT "), SqlType::Integer);
    assert_eq!(SqlType::from_declared("numeric(10,2)"), SqlType::Decimal);
    assert_eq!(SqlType::from_declared("double precision"), SqlType::Float);
    assert_eq!(SqlType::from_declared("bit"), SqlType::Boolean);
    assert_eq!(SqlType::from_declared("datetime2(7)"), SqlType::Timestamp);
    assert_eq!(
        SqlType::from_declared("timestamp with time zone"),
        SqlType::TimestampTz
    );
    assert_eq!(SqlType::from_declared("uniqueidentifier"), SqlType::Uuid);
    assert_eq!(SqlType::from_declared("jsonb"), SqlType::Json);
    assert_eq!(SqlType::from_declared("nvarchar(50)"), SqlType::Text);
    assert_eq!(SqlType::from_declared("something_custom"), SqlType::Text);
}

#[test]
fn numeric_strings_coerce_to_integers() {
    assert_eq!(coerce(&json!("5"), SqlType::Integer).unwrap(), SqlValue::Int(5));
    assert_eq!(coerce(&json!(" 42 "), SqlType::Integer).unwrap(), SqlValue::Int(42));
    assert_eq!(coerce(&json!("7.0"), SqlType::Integer).unwrap(), SqlValue::Int(7));
    assert_eq!(coerce(&json!(9), SqlType::Integer).unwrap(), SqlValue::Int(9));
    assert!(coerce(&json!("7.5"), SqlType::Integer).is_err());
    assert!(coerce(&json!("five"), SqlType::Integer).is_err());
}

#[test]
fn decimals_keep_precision() {
    let v = coerce(&json!("12.50"), SqlType::Decimal).unwrap();
    assert_eq!(v, SqlValue::Decimal("12.50".parse().unwrap()));
    let v = coerce(&json!(0.1), SqlType::Decimal).unwrap();
    assert_eq!(v, SqlValue::Decimal("0.1".parse().unwrap()));
}

#[test]
fn booleans_accept_common_spellings() {
    for t in ["true", "T", "1", "yes", "Y"] {
        assert_eq!(coerce(&json!(t), SqlType::Boolean).unwrap(), SqlValue::Bool(true));
    }
    for f in ["false", "0", "no", "N"] {
        assert_eq!(coerce(&json!(f), SqlType::Boolean).unwrap(), SqlValue::Bool(false));
    }
    assert_eq!(coerce(&json!(true), SqlType::Boolean).unwrap(), SqlValue::Bool(true));
    assert!(coerce(&json!("maybe"), SqlType::Boolean).is_err());
}

#[test]
fn date_and_time_formats() {
    let d = coerce(&json!("2024-03-01"), SqlType::Date).unwrap();
    assert_eq!(d, SqlValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));

    let t = coerce(&json!("2024-03-01 08:30:00"), SqlType::Timestamp).unwrap();
    let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();
    assert_eq!(t, SqlValue::Timestamp(expected));

    let tz = coerce(&json!("2024-03-01T08:30:00+02:00"), SqlType::TimestampTz).unwrap();
    let SqlValue::TimestampTz(tz) = tz else {
        panic!("expected timestamptz");
    };
    assert_eq!(tz.naive_utc(), expected - chrono::Duration::hours(2));

    let from_date = coerce(&json!("2024-03-01"), SqlType::Timestamp).unwrap();
    assert_eq!(
        from_date,
        SqlValue::Timestamp(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
    );
}

#[test]
fn uuid_and_text() {
    let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
    assert_eq!(
        coerce(&json!(id), SqlType::Uuid).unwrap(),
        SqlValue::Uuid(id.parse().unwrap())
    );
    assert!(coerce(&json!("not-a-uuid"), SqlType::Uuid).is_err());
    assert_eq!(
        coerce(&json!(15), SqlType::Text).unwrap(),
        SqlValue::Text("15".into())
    );
}

#[test]
fn null_stays_null_for_every_type() {
    for ty in [SqlType::Integer, SqlType::Text, SqlType::Uuid, SqlType::Date] {
        assert_eq!(coerce(&json!(null), ty).unwrap(), SqlValue::Null);
    }
}

#[test]
fn blank_detection() {
    assert!(is_blank(&json!("")));
    assert!(is_blank(&json!("   ")));
    assert!(!is_blank(&json!("x")));
    assert!(!is_blank(&json!(0)));
}

#[test]
fn json_inference_without_declared_type() {
    assert_eq!(SqlValue::from_json(&json!("A-1")), SqlValue::Text("A-1".into()));
    assert_eq!(SqlValue::from_json(&json!(3)), SqlValue::Int(3));
    assert_eq!(SqlValue::from_json(&json!(1.5)), SqlValue::Float(1.5));
    assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
}

#[test]
fn to_sql_adapts_to_inferred_parameter_type() {
    let mut buf = BytesMut::new();
    SqlValue::Text("5".into()).to_sql(&Type::INT4, &mut buf).unwrap();
    assert_eq!(&buf[..], &5_i32.to_be_bytes());

    let mut buf = BytesMut::new();
    SqlValue::Int(7).to_sql(&Type::INT2, &mut buf).unwrap();
    assert_eq!(&buf[..], &7_i16.to_be_bytes());

    let mut buf = BytesMut::new();
    SqlValue::Int(12).to_sql(&Type::TEXT, &mut buf).unwrap();
    assert_eq!(&buf[..], b"12");
}

#[test]
fn to_sql_rejects_out_of_range_and_unparsable() {
    let mut buf = BytesMut::new();
    assert!(SqlValue::Int(i64::MAX).to_sql(&Type::INT4, &mut buf).is_err());
    assert!(SqlValue::Text("abc".into()).to_sql(&Type::INT8, &mut buf).is_err());
}

#[test]
fn null_is_sent_as_sql_null() {
    let mut buf = BytesMut::new();
    let r = SqlValue::Null.to_sql(&Type::INT4, &mut buf).unwrap();
    assert!(matches!(r, IsNull::Yes));
}

#[test]
fn option_conversion() {
    assert_eq!(SqlValue::from(None::<i32>), SqlValue::Null);
    assert_eq!(SqlValue::from(Some(3_i32)), SqlValue::Int(3));
}
