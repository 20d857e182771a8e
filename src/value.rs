// ABOUTME: Dynamically typed row values moved from SQLite to the remote database
// ABOUTME: Coerces values to the parameter types PostgreSQL and MySQL expect

use bytes::BytesMut;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use rusqlite::types::ValueRef;
use rust_decimal::Decimal;
use std::error::Error;
use std::str::FromStr;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use crate::catalog::ColumnKind;

type BoxError = Box<dyn Error + Sync + Send>;

/// One column value of a local row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<FixedOffset>),
    Date(NaiveDate),
}

/// A row projected in catalog column order.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    /// Interpret a raw SQLite value according to the catalog column kind.
    ///
    /// Timestamps and dates are stored as text by the local ORM; they are
    /// parsed here so each remote driver can bind a native temporal value.
    /// Text that does not parse is passed through untouched.
    pub fn from_sqlite(value: ValueRef<'_>, kind: ColumnKind) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
            ValueRef::Text(raw) => {
                let text = String::from_utf8_lossy(raw).into_owned();
                match kind {
                    ColumnKind::DateTime => parse_timestamp(&text)
                        .map(SqlValue::Timestamp)
                        .unwrap_or(SqlValue::Text(text)),
                    ColumnKind::Date => parse_date(&text)
                        .map(SqlValue::Date)
                        .unwrap_or(SqlValue::Text(text)),
                    _ => SqlValue::Text(text),
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert into a `mysql_async` parameter.
    ///
    /// Temporal values are sent as wall-clock `DATETIME`/`DATE` values in the
    /// offset they were recorded with.
    pub fn to_mysql(&self) -> mysql_async::Value {
        match self {
            SqlValue::Null => mysql_async::Value::NULL,
            SqlValue::Integer(v) => mysql_async::Value::Int(*v),
            SqlValue::Real(v) => mysql_async::Value::Double(*v),
            SqlValue::Text(s) => mysql_async::Value::Bytes(s.as_bytes().to_vec()),
            SqlValue::Blob(b) => mysql_async::Value::Bytes(b.clone()),
            SqlValue::Timestamp(dt) => naive_to_mysql(dt.naive_local()),
            SqlValue::Date(d) => mysql_async::Value::Date(
                d.year() as u16,
                d.month() as u8,
                d.day() as u8,
                0,
                0,
                0,
                0,
            ),
        }
    }
}

fn naive_to_mysql(dt: NaiveDateTime) -> mysql_async::Value {
    mysql_async::Value::Date(
        dt.year() as u16,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond() / 1_000,
    )
}

/// Parse the timestamp layouts the local ORM and common tools write.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, layout) {
            return Some(dt);
        }
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(DateTime::<FixedOffset>::from(Utc.from_utc_datetime(&naive)));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::<FixedOffset>::from(Utc.from_utc_datetime(&naive)))
}

/// Parse a calendar date, accepting full timestamps (their local date is kept).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(text).map(|dt| dt.naive_local().date()))
}

fn parse_bool(text: &str) -> Result<bool, BoxError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" => Ok(true),
        "0" | "f" | "false" | "n" | "no" => Ok(false),
        other => Err(format!("cannot interpret '{}' as boolean", other).into()),
    }
}

fn integer_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => (v != 0).to_sql(ty, out),
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            v.to_string().to_sql(ty, out)
        }
        _ => v.to_sql_checked(ty, out),
    }
}

fn real_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => v.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::BOOL if v.fract() == 0.0 => {
            integer_to_sql(v as i64, ty, out)
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            v.to_string().to_sql(ty, out)
        }
        _ => v.to_sql_checked(ty, out),
    }
}

fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 => integer_to_sql(s.trim().parse::<i64>()?, ty, out),
        Type::FLOAT4 | Type::FLOAT8 => real_to_sql(s.trim().parse::<f64>()?, ty, out),
        Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
        Type::BOOL => parse_bool(s)?.to_sql(ty, out),
        Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => match parse_timestamp(s) {
            Some(dt) => timestamp_to_sql(&dt, ty, out),
            None => Err(format!("cannot interpret '{}' as {}", s, ty).into()),
        },
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ => s.to_sql_checked(ty, out),
    }
}

fn timestamp_to_sql(
    dt: &DateTime<FixedOffset>,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TIMESTAMPTZ => dt.with_timezone(&Utc).to_sql(ty, out),
        Type::TIMESTAMP => dt.naive_local().to_sql(ty, out),
        Type::DATE => dt.naive_local().date().to_sql(ty, out),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::UNKNOWN => {
            dt.to_rfc3339().to_sql(ty, out)
        }
        _ => Err(format!("cannot bind a timestamp to a {} parameter", ty).into()),
    }
}

fn date_to_sql(d: NaiveDate, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::DATE => d.to_sql(ty, out),
        Type::TIMESTAMP | Type::TIMESTAMPTZ => {
            let midnight = d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| format!("invalid date {}", d))?;
            if *ty == Type::TIMESTAMP {
                midnight.to_sql(ty, out)
            } else {
                Utc.from_utc_datetime(&midnight).to_sql(ty, out)
            }
        }
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::UNKNOWN => d.to_string().to_sql(ty, out),
        _ => Err(format!("cannot bind a date to a {} parameter", ty).into()),
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Integer(v) => integer_to_sql(*v, ty, out),
            SqlValue::Real(v) => real_to_sql(*v, ty, out),
            SqlValue::Text(s) => text_to_sql(s, ty, out),
            SqlValue::Blob(b) => b.as_slice().to_sql_checked(ty, out),
            SqlValue::Timestamp(dt) => timestamp_to_sql(dt, ty, out),
            SqlValue::Date(d) => date_to_sql(*d, ty, out),
        }
    }

    // Coercion happens in to_sql; reject there with a precise message instead.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Hashable primary-key value used for the retained set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimaryKey {
    Integer(i64),
    Text(String),
}

impl PrimaryKey {
    /// Key for a local value; `None` for values that cannot identify a row.
    pub fn from_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(v) => Some(PrimaryKey::Integer(*v)),
            SqlValue::Real(v) if v.fract() == 0.0 => Some(PrimaryKey::Integer(*v as i64)),
            SqlValue::Text(s) => Some(PrimaryKey::parse(s)),
            _ => None,
        }
    }

    /// Key for a remote value read back as text.
    pub fn parse(text: &str) -> Self {
        match text.trim().parse::<i64>() {
            Ok(v) => PrimaryKey::Integer(v),
            Err(_) => PrimaryKey::Text(text.to_string()),
        }
    }

    pub fn to_value(&self) -> SqlValue {
        match self {
            PrimaryKey::Integer(v) => SqlValue::Integer(*v),
            PrimaryKey::Text(s) => SqlValue::Text(s.clone()),
        }
    }
}
