//! Typed object stores over the workspace database.
//!
//! Each record type is a [`Collection`]: a table with a primary key strategy,
//! an ordered column list and a set of named secondary indexes. Callers only
//! see records; SQL and row layout stay inside this module.

use crate::models::{AttendanceRecord, AttendanceStatus, Role, Student, User};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::ops::Bound;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated in {collection}: {message}")]
    ConstraintViolation {
        collection: &'static str,
        message: String,
    },
    #[error("no record with key {key} in {collection}")]
    NotFound { collection: &'static str, key: i64 },
    #[error("unknown index {index} on {collection}")]
    UnknownIndex {
        collection: &'static str,
        index: String,
    },
    #[error("index {index} on {collection} takes {expected} value(s)")]
    IndexArity {
        collection: &'static str,
        index: &'static str,
        expected: usize,
    },
    #[error("index {index} on {collection} is not unique")]
    NotUnique {
        collection: &'static str,
        index: &'static str,
    },
    #[error("record for {collection} is missing its key")]
    MissingKey { collection: &'static str },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// Storage assigns the key on insert.
    AutoIncrement,
    /// The caller supplies the key.
    Explicit,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Int(i64),
    Text(String),
    Pair(i64, i64),
}

impl IndexValue {
    fn arity(&self) -> usize {
        match self {
            IndexValue::Pair(..) => 2,
            _ => 1,
        }
    }

    fn push_values(&self, out: &mut Vec<Value>) {
        match self {
            IndexValue::Int(v) => out.push(Value::Integer(*v)),
            IndexValue::Text(v) => out.push(Value::Text(v.clone())),
            IndexValue::Pair(a, b) => {
                out.push(Value::Integer(*a));
                out.push(Value::Integer(*b));
            }
        }
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Int(v)
    }
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Text(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Text(v)
    }
}

impl From<(i64, i64)> for IndexValue {
    fn from(v: (i64, i64)) -> Self {
        IndexValue::Pair(v.0, v.1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexQuery {
    Eq(IndexValue),
    Range {
        lower: Bound<IndexValue>,
        upper: Bound<IndexValue>,
    },
}

impl IndexQuery {
    pub fn eq(v: impl Into<IndexValue>) -> Self {
        IndexQuery::Eq(v.into())
    }

    /// `[lower, upper]`
    pub fn inclusive(lower: impl Into<IndexValue>, upper: impl Into<IndexValue>) -> Self {
        IndexQuery::Range {
            lower: Bound::Included(lower.into()),
            upper: Bound::Included(upper.into()),
        }
    }

    /// `[lower, upper)`
    pub fn half_open(lower: impl Into<IndexValue>, upper: impl Into<IndexValue>) -> Self {
        IndexQuery::Range {
            lower: Bound::Included(lower.into()),
            upper: Bound::Excluded(upper.into()),
        }
    }

    fn values(&self) -> Vec<&IndexValue> {
        match self {
            IndexQuery::Eq(v) => vec![v],
            IndexQuery::Range { lower, upper } => [lower, upper]
                .into_iter()
                .filter_map(|b| match b {
                    Bound::Included(v) | Bound::Excluded(v) => Some(v),
                    Bound::Unbounded => None,
                })
                .collect(),
        }
    }
}

pub trait Collection: Sized {
    const NAME: &'static str;
    const KEY_COLUMN: &'static str;
    const KEY_STRATEGY: KeyStrategy;
    /// Non-key columns, in the order `values` produces and `from_row` reads
    /// them (after the key at position 0).
    const COLUMNS: &'static [&'static str];
    const INDEXES: &'static [IndexDef];

    fn key(&self) -> Option<i64>;
    fn with_key(self, key: i64) -> Self;
    fn values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn index(name: &str) -> StoreResult<&'static IndexDef> {
        Self::INDEXES
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: Self::NAME,
                index: name.to_string(),
            })
    }
}

fn select_list<C: Collection>() -> String {
    let mut cols = vec![C::KEY_COLUMN];
    cols.extend_from_slice(C::COLUMNS);
    cols.join(", ")
}

fn map_write_err(collection: &'static str, e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(f, msg) if f.code == ErrorCode::ConstraintViolation => {
            StoreError::ConstraintViolation {
                collection,
                message: msg.unwrap_or_else(|| f.to_string()),
            }
        }
        other => StoreError::Sqlite(other),
    }
}

fn query_records<C: Collection>(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
) -> StoreResult<Vec<C>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |r| C::from_row(r))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every record, ordered by primary key.
pub fn get_all<C: Collection>(conn: &Connection) -> StoreResult<Vec<C>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_list::<C>(),
        C::NAME,
        C::KEY_COLUMN
    );
    query_records(conn, &sql, Vec::new())
}

pub fn get_by_key<C: Collection>(conn: &Connection, key: i64) -> StoreResult<Option<C>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_list::<C>(),
        C::NAME,
        C::KEY_COLUMN
    );
    let rec = conn.query_row(&sql, [key], |r| C::from_row(r)).optional()?;
    Ok(rec)
}

/// Equality or range lookup on a named secondary index. No match is an
/// empty result, not an error. Results are ordered by the index columns,
/// then by primary key.
pub fn get_by_index<C: Collection>(
    conn: &Connection,
    index_name: &str,
    query: &IndexQuery,
) -> StoreResult<Vec<C>> {
    let index = C::index(index_name)?;
    let arity = index.columns.len();
    for v in query.values() {
        if v.arity() != arity {
            return Err(StoreError::IndexArity {
                collection: C::NAME,
                index: index.name,
                expected: arity,
            });
        }
    }

    let lhs = if arity == 1 {
        index.columns[0].to_string()
    } else {
        format!("({})", index.columns.join(", "))
    };
    let rhs = if arity == 1 {
        "?".to_string()
    } else {
        format!("({})", vec!["?"; arity].join(", "))
    };

    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    match query {
        IndexQuery::Eq(v) => {
            clauses.push(format!("{lhs} = {rhs}"));
            v.push_values(&mut params);
        }
        IndexQuery::Range { lower, upper } => {
            match lower {
                Bound::Included(v) => {
                    clauses.push(format!("{lhs} >= {rhs}"));
                    v.push_values(&mut params);
                }
                Bound::Excluded(v) => {
                    clauses.push(format!("{lhs} > {rhs}"));
                    v.push_values(&mut params);
                }
                Bound::Unbounded => {}
            }
            match upper {
                Bound::Included(v) => {
                    clauses.push(format!("{lhs} <= {rhs}"));
                    v.push_values(&mut params);
                }
                Bound::Excluded(v) => {
                    clauses.push(format!("{lhs} < {rhs}"));
                    v.push_values(&mut params);
                }
                Bound::Unbounded => {}
            }
        }
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}, {}",
        select_list::<C>(),
        C::NAME,
        where_sql,
        index.columns.join(", "),
        C::KEY_COLUMN
    );
    query_records(conn, &sql, params)
}

/// Single-record lookup through a unique index.
pub fn get_unique<C: Collection>(
    conn: &Connection,
    index_name: &str,
    value: impl Into<IndexValue>,
) -> StoreResult<Option<C>> {
    let index = C::index(index_name)?;
    if !index.unique {
        return Err(StoreError::NotUnique {
            collection: C::NAME,
            index: index.name,
        });
    }
    let mut hits = get_by_index::<C>(conn, index_name, &IndexQuery::eq(value))?;
    Ok(hits.pop())
}

/// Inserts one record and returns it with its key filled in. A clash on the
/// primary key or a unique index is a `ConstraintViolation`.
pub fn add<C: Collection + Clone>(conn: &Connection, record: &C) -> StoreResult<C> {
    let key = record.key();
    if key.is_none() && C::KEY_STRATEGY == KeyStrategy::Explicit {
        return Err(StoreError::MissingKey {
            collection: C::NAME,
        });
    }

    let mut cols: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(k) = key {
        cols.push(C::KEY_COLUMN);
        params.push(Value::Integer(k));
    }
    cols.extend_from_slice(C::COLUMNS);
    params.extend(record.values());

    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        C::NAME,
        cols.join(", "),
        vec!["?"; cols.len()].join(", ")
    );
    conn.execute(&sql, params_from_iter(params.iter()))
        .map_err(|e| map_write_err(C::NAME, e))?;

    let assigned = key.unwrap_or_else(|| conn.last_insert_rowid());
    Ok(record.clone().with_key(assigned))
}

pub fn delete_by_key<C: Collection>(conn: &Connection, key: i64) -> StoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", C::NAME, C::KEY_COLUMN);
    let n = conn
        .execute(&sql, [key])
        .map_err(|e| map_write_err(C::NAME, e))?;
    if n == 0 {
        return Err(StoreError::NotFound {
            collection: C::NAME,
            key,
        });
    }
    Ok(())
}

pub fn count<C: Collection>(conn: &Connection) -> StoreResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", C::NAME);
    let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
    Ok(n as usize)
}

/// Highest primary key currently stored.
pub fn max_key<C: Collection>(conn: &Connection) -> StoreResult<Option<i64>> {
    let sql = format!("SELECT MAX({}) FROM {}", C::KEY_COLUMN, C::NAME);
    let v: Option<i64> = conn.query_row(&sql, [], |r| r.get(0))?;
    Ok(v)
}

// ── Collections ─────────────────────────────────────────────

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Role::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown role {s}").into()))
    }
}

impl FromSql for AttendanceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        AttendanceStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown status {s}").into()))
    }
}

impl Collection for User {
    const NAME: &'static str = "users";
    const KEY_COLUMN: &'static str = "id";
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::AutoIncrement;
    const COLUMNS: &'static [&'static str] = &["name", "role", "password"];
    const INDEXES: &'static [IndexDef] = &[IndexDef {
        name: "Name",
        columns: &["name"],
        unique: true,
    }];

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn with_key(mut self, key: i64) -> Self {
        self.id = Some(key);
        self
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Text(self.role.as_str().to_string()),
            Value::Text(self.password.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            role: row.get(2)?,
            password: row.get(3)?,
        })
    }
}

impl Collection for Student {
    const NAME: &'static str = "students";
    const KEY_COLUMN: &'static str = "student_id";
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::Explicit;
    const COLUMNS: &'static [&'static str] = &["name", "class", "roll_no"];
    const INDEXES: &'static [IndexDef] = &[
        IndexDef {
            name: "Class",
            columns: &["class"],
            unique: false,
        },
        IndexDef {
            name: "ClassAndRollNo",
            columns: &["class", "roll_no"],
            unique: true,
        },
    ];

    fn key(&self) -> Option<i64> {
        Some(self.student_id)
    }

    fn with_key(mut self, key: i64) -> Self {
        self.student_id = key;
        self
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.name.clone()),
            Value::Integer(self.class),
            Value::Integer(self.roll_no),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            student_id: row.get(0)?,
            name: row.get(1)?,
            class: row.get(2)?,
            roll_no: row.get(3)?,
        })
    }
}

impl Collection for AttendanceRecord {
    const NAME: &'static str = "attendance";
    const KEY_COLUMN: &'static str = "id";
    const KEY_STRATEGY: KeyStrategy = KeyStrategy::AutoIncrement;
    const COLUMNS: &'static [&'static str] = &["student_id", "name", "class", "date", "status"];
    const INDEXES: &'static [IndexDef] = &[
        IndexDef {
            name: "Date",
            columns: &["date"],
            unique: false,
        },
        IndexDef {
            name: "StudentId",
            columns: &["student_id"],
            unique: false,
        },
    ];

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn with_key(mut self, key: i64) -> Self {
        self.id = Some(key);
        self
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.student_id),
            Value::Text(self.name.clone()),
            Value::Integer(self.class),
            Value::Text(self.date.clone()),
            Value::Text(self.status.as_str().to_string()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AttendanceRecord {
            id: Some(row.get(0)?),
            student_id: row.get(1)?,
            name: row.get(2)?,
            class: row.get(3)?,
            date: row.get(4)?,
            status: row.get(5)?,
        })
    }
}
