//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved record type.

use crate::config::ID_FIELD;
use crate::filter::{FilterClause, FilterOp};
use crate::record::FieldValue;
use crate::registry::RecordType;
use crate::sql::PgBindValue;

/// Quote identifier for PostgreSQL (safe: names come from the model registry only).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: &FieldValue) -> usize {
        self.params.push(PgBindValue::from(v));
        self.params.len()
    }

    /// Placeholder for a value stored into / compared with `column`, cast to the column type.
    fn placeholder(&mut self, record_type: &RecordType, column: &str, v: &FieldValue) -> String {
        let n = self.push_param(v);
        match record_type.field(column) {
            Some(f) => format!("${}::{}", n, f.kind.pg_type()),
            None => format!("${}", n),
        }
    }
}

fn select_column_list(record_type: &RecordType) -> String {
    record_type
        .fields
        .iter()
        .map(|f| quoted(&f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(q: &mut QueryBuf, record_type: &RecordType, clauses: &[FilterClause]) -> String {
    if clauses.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = clauses
        .iter()
        .map(|c| match c.op {
            FilterOp::Equals => {
                let ph = q.placeholder(record_type, &c.column, &c.value);
                format!("{} = {}", quoted(&c.column), ph)
            }
            FilterOp::Like => {
                let n = q.push_param(&c.value);
                format!("{}::text LIKE ${}::text", quoted(&c.column), n)
            }
        })
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

/// Equality clause on the identifier column.
pub fn id_clause(id: FieldValue) -> FilterClause {
    FilterClause {
        column: ID_FIELD.to_string(),
        op: FilterOp::Equals,
        value: id,
    }
}

/// SELECT with AND-ed filter clauses, ORDER BY id.
pub fn select_where(record_type: &RecordType, clauses: &[FilterClause]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let wc = where_clause(&mut q, record_type, clauses);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_column_list(record_type),
        quoted(&record_type.name),
        wc,
        quoted(ID_FIELD)
    );
    q
}

pub fn select_by_id(record_type: &RecordType, id: &FieldValue) -> QueryBuf {
    select_where(record_type, &[id_clause(id.clone())])
}

/// INSERT the given assignments. Columns not supplied take their database default.
pub fn insert(record_type: &RecordType, assignments: &[(String, FieldValue)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = quoted(&record_type.name);
    let returning = select_column_list(record_type);
    if assignments.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(assignments.len());
    let mut placeholders = Vec::with_capacity(assignments.len());
    for (name, value) in assignments {
        cols.push(quoted(name));
        placeholders.push(q.placeholder(record_type, name, value));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// UPDATE rows matching `clauses`; `updated_at` is always refreshed.
/// With `returning`, the updated rows come back; otherwise only the affected count is useful.
pub fn update_where(
    record_type: &RecordType,
    assignments: &[(String, FieldValue)],
    clauses: &[FilterClause],
    returning: bool,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets: Vec<String> = assignments
        .iter()
        .map(|(name, value)| {
            let ph = q.placeholder(record_type, name, value);
            format!("{} = {}", quoted(name), ph)
        })
        .collect();
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let wc = where_clause(&mut q, record_type, clauses);
    let table = quoted(&record_type.name);
    let returning_clause = if returning {
        format!(" RETURNING {}", select_column_list(record_type))
    } else {
        String::new()
    };
    q.sql = format!("UPDATE {} SET {}{}{}", table, sets.join(", "), wc, returning_clause);
    q
}

/// DELETE by id, returning the deleted row.
pub fn delete_by_id(record_type: &RecordType, id: &FieldValue) -> QueryBuf {
    let mut q = QueryBuf::new();
    let wc = where_clause(&mut q, record_type, &[id_clause(id.clone())]);
    q.sql = format!(
        "DELETE FROM {}{} RETURNING {}",
        quoted(&record_type.name),
        wc,
        select_column_list(record_type)
    );
    q
}
