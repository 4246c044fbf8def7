//! SQLite execution through `rusqlite`.
//!
//! Results are read eagerly into a [`BufferedCursor`]; SQLite storage classes
//! map onto [`Value`] as `INTEGER -> Int`, `REAL -> Float`, `TEXT -> Text`,
//! `BLOB -> Bytes` and `NULL -> Null`.

use crate::client::{BufferedCursor, Cursor, ExecResult, Executor, Transaction, Transactional};
use crate::error::OrmResult;
use crate::monitor::QueryType;
use crate::value::Value;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql, Transaction as SqliteTransaction, params_from_iter};

/// Timestamps are bound as text, with fractional seconds only when present.
const BIND_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::UInt(v) => {
                let v = i64::try_from(*v)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                ToSqlOutput::Owned(SqlValue::Integer(v))
            }
            Value::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(SqlValue::Text(ts.format(BIND_TIMESTAMP_FORMAT).to_string()))
            }
        })
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Int(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Bytes(b.to_vec()),
        },
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

fn sqlite_exec(conn: &Connection, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
    let mut stmt = conn.prepare(sql)?;
    let affected = stmt.execute(params_from_iter(args.iter()))?;
    let last_insert_id = (affected > 0 && QueryType::from_sql(sql) == QueryType::Insert)
        .then(|| conn.last_insert_rowid());
    Ok(ExecResult {
        rows_affected: affected as u64,
        last_insert_id,
    })
}

fn sqlite_query(conn: &Connection, sql: &str, args: &[Value]) -> OrmResult<BufferedCursor> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|&s| s.to_string()).collect();
    let width = columns.len();
    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let mut buffered = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_value_ref(row.get_ref(i)?));
        }
        buffered.push(values);
    }
    tracing::trace!(target: "sqlgom.sql", rows = buffered.len(), "sqlite rows buffered");
    Ok(BufferedCursor::new(columns, buffered))
}

impl Executor for Connection {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        sqlite_exec(self, sql, args)
    }

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        Ok(Box::new(sqlite_query(self, sql, args)?))
    }

    fn in_transaction(&self) -> bool {
        !self.is_autocommit()
    }
}

impl Executor for SqliteTransaction<'_> {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        sqlite_exec(self, sql, args)
    }

    fn query<'a>(&'a self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor + 'a>> {
        Ok(Box::new(sqlite_query(self, sql, args)?))
    }

    fn in_transaction(&self) -> bool {
        true
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn commit(self) -> OrmResult<()> {
        Ok(SqliteTransaction::commit(self)?)
    }

    fn rollback(self) -> OrmResult<()> {
        Ok(SqliteTransaction::rollback(self)?)
    }
}

impl Transactional for Connection {
    type Tx<'a> = SqliteTransaction<'a>;

    fn begin(&self) -> OrmResult<Self::Tx<'_>> {
        Ok(self.unchecked_transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, at TEXT, blob BLOB)",
        )
        .unwrap();
        conn
    }

    #[test]
    fn exec_reports_insert_id_only_for_inserts() {
        let conn = conn();
        let res = conn
            .exec("INSERT INTO t (name) VALUES (?)", &[Value::from("a")])
            .unwrap();
        assert_eq!(res.rows_affected, 1);
        assert_eq!(res.last_insert_id, Some(1));

        let res = conn
            .exec("UPDATE t SET name = ? WHERE id = ?", &[Value::from("b"), Value::from(1)])
            .unwrap();
        assert_eq!(res.last_insert_id, None);
    }

    #[test]
    fn values_round_trip_through_storage_classes() {
        let conn = conn();
        let at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        conn.exec(
            "INSERT INTO t (name, at, blob) VALUES (?, ?, ?)",
            &[Value::Null, Value::Timestamp(at), Value::Bytes(vec![0, 1])],
        )
        .unwrap();

        let mut cur = conn.query("SELECT id, name, at, blob FROM t", &[]).unwrap();
        assert_eq!(cur.columns(), ["id", "name", "at", "blob"]);
        assert!(cur.next().unwrap());
        assert_eq!(
            cur.scan().unwrap(),
            vec![
                Value::Int(1),
                Value::Null,
                Value::Text("2024-01-02 03:04:05".into()),
                Value::Bytes(vec![0, 1]),
            ]
        );
    }

    #[test]
    fn oversized_unsigned_is_a_bind_error() {
        let conn = conn();
        let err = conn
            .exec("INSERT INTO t (name) VALUES (?)", &[Value::UInt(u64::MAX)])
            .unwrap_err();
        assert!(matches!(err, crate::OrmError::Backend(_)));
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let conn = conn();
        {
            let tx = conn.begin().unwrap();
            tx.exec("INSERT INTO t (name) VALUES ('x')", &[]).unwrap();
            assert!(tx.in_transaction());
        }
        let mut cur = conn.query("SELECT count(*) FROM t", &[]).unwrap();
        cur.next().unwrap();
        assert_eq!(cur.scan().unwrap(), vec![Value::Int(0)]);
    }
}
