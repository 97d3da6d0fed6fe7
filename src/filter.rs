//! Query-string filters: `?field=value` pairs become typed equality or LIKE clauses.

use crate::coerce::{coerce, CoercionPolicy};
use crate::config::ID_FIELD;
use crate::error::AppError;
use crate::record::FieldValue;
use crate::registry::RecordType;

/// Maximum number of distinct filter parameters per request.
pub const MAX_FILTERS: usize = 10;

/// Client-side wildcard, translated to the SQL `%`.
pub const WILDCARD: char = '*';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Equals,
    Like,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    pub column: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

impl FilterClause {
    pub fn targets_id(&self) -> bool {
        self.column == ID_FIELD
    }
}

/// Build clauses from query parameters. Duplicate keys keep the last value.
pub fn build_filter_clauses(
    record_type: &RecordType,
    params: &[(String, String)],
    policy: CoercionPolicy,
) -> Result<Vec<FilterClause>, AppError> {
    let mut distinct: Vec<(&str, &str)> = Vec::new();
    for (k, v) in params {
        match distinct.iter_mut().find(|(key, _)| *key == k.as_str()) {
            Some(slot) => slot.1 = v.as_str(),
            None => distinct.push((k.as_str(), v.as_str())),
        }
    }
    if distinct.len() > MAX_FILTERS {
        return Err(AppError::BadRequest(format!(
            "too many filters: {} supplied, at most {} allowed",
            distinct.len(),
            MAX_FILTERS
        )));
    }

    let mut clauses = Vec::with_capacity(distinct.len());
    for (key, raw) in distinct {
        // Sensitive columns are not filterable.
        if record_type.field(key).is_none() || record_type.sensitive.contains(key) {
            return Err(AppError::BadRequest(format!(
                "unknown filter column '{}' for table '{}'",
                key, record_type.name
            )));
        }
        let clause = if raw.contains(WILDCARD) {
            FilterClause {
                column: key.to_string(),
                op: FilterOp::Like,
                value: FieldValue::String(raw.replace(WILDCARD, "%")),
            }
        } else {
            FilterClause {
                column: key.to_string(),
                op: FilterOp::Equals,
                value: coerce(record_type, key, raw, policy)?,
            }
        };
        clauses.push(clause);
    }
    Ok(clauses)
}

/// Whether any clause selects by identifier (single-record semantics).
pub fn targets_single_record(clauses: &[FilterClause]) -> bool {
    clauses.iter().any(FilterClause::targets_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn wildcard_becomes_like() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let clauses = build_filter_clauses(rt, &params(&[("name", "Jo*n")]), CoercionPolicy::default()).unwrap();
        assert_eq!(
            clauses,
            vec![FilterClause {
                column: "name".into(),
                op: FilterOp::Like,
                value: FieldValue::String("Jo%n".into()),
            }]
        );
    }

    #[test]
    fn equality_values_are_coerced() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let clauses = build_filter_clauses(
            rt,
            &params(&[("is_vip", "yes"), ("visit_count", "3")]),
            CoercionPolicy::default(),
        )
        .unwrap();
        assert_eq!(clauses[0].value, FieldValue::Bool(true));
        assert_eq!(clauses[1].value, FieldValue::Int(3));
        assert!(clauses.iter().all(|c| c.op == FilterOp::Equals));
        assert!(!targets_single_record(&clauses));
    }

    #[test]
    fn more_than_ten_distinct_filters_rejected() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let many: Vec<(String, String)> = (0..11).map(|i| (format!("f{}", i), "x".to_string())).collect();
        let err = build_filter_clauses(rt, &many, CoercionPolicy::default()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("too many")));
    }

    #[test]
    fn repeated_key_counts_once_and_last_wins() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let mut ps: Vec<(String, String)> = (0..12).map(|i| ("name".to_string(), format!("n{}", i))).collect();
        ps.push(("visit_count".into(), "1".into()));
        let clauses = build_filter_clauses(rt, &ps, CoercionPolicy::default()).unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].value, FieldValue::String("n11".into()));
    }

    #[test]
    fn unknown_column_rejected() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let err = build_filter_clauses(rt, &params(&[("bogus", "1")]), CoercionPolicy::default()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("bogus")));
    }

    #[test]
    fn sensitive_column_is_not_filterable() {
        let rt = Registry::builtin().unwrap().resolve("user").unwrap();
        for value in ["x*", "secret"] {
            let err = build_filter_clauses(rt, &params(&[("hashed_password", value)]), CoercionPolicy::default())
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("hashed_password")));
        }
        assert!(build_filter_clauses(rt, &params(&[("username", "a*")]), CoercionPolicy::default()).is_ok());
    }

    #[test]
    fn id_filter_is_single_record() {
        let rt = Registry::builtin().unwrap().resolve("client").unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let clauses = build_filter_clauses(rt, &params(&[("id", &id)]), CoercionPolicy::default()).unwrap();
        assert!(targets_single_record(&clauses));
    }
}
