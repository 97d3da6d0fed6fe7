//! Convert [`FieldValue`] to types that sqlx can bind.

use crate::record::FieldValue;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query. Each variant declares its own wire type;
/// statements cast every placeholder to the column type, so nulls bind as text.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(Value),
}

impl From<&FieldValue> for PgBindValue {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Null => PgBindValue::Null,
            FieldValue::String(s) => PgBindValue::String(s.clone()),
            FieldValue::Int(n) => PgBindValue::I64(*n),
            FieldValue::Float(f) => PgBindValue::F64(*f),
            FieldValue::Bool(b) => PgBindValue::Bool(*b),
            FieldValue::Uuid(u) => PgBindValue::Uuid(*u),
            FieldValue::Timestamp(t) => PgBindValue::Timestamp(*t),
            FieldValue::Date(d) => PgBindValue::Date(*d),
            FieldValue::Json(j) => PgBindValue::Json(j.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(&self, buf: &mut <Postgres as Database>::ArgumentBuffer<'q>) -> Result<IsNull, BoxDynError> {
        match self {
            PgBindValue::Null => Ok(IsNull::Yes),
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            PgBindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
            PgBindValue::Date(d) => <NaiveDate as Encode<Postgres>>::encode_by_ref(d, buf),
            PgBindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
            PgBindValue::Timestamp(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
            PgBindValue::Date(_) => <NaiveDate as Type<Postgres>>::type_info(),
            PgBindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_map_to_bind_values() {
        let u = uuid::Uuid::new_v4();
        assert_eq!(PgBindValue::from(&FieldValue::Uuid(u)), PgBindValue::Uuid(u));
        assert_eq!(PgBindValue::from(&FieldValue::Int(3)), PgBindValue::I64(3));
        assert_eq!(PgBindValue::from(&FieldValue::Null), PgBindValue::Null);
    }
}
