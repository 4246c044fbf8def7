//! Builder and statement tests against the scripted backend.

use crate::args;
use crate::coerce::TypeHint;
use crate::config::DbConfig;
use crate::error::OrmError;
use crate::memory::MemoryBackend;
use crate::qb::{QuerySource, total_pages};
use crate::record::{FieldDecl, FieldValue, Record, assign};
use crate::value::Value;
use chrono::NaiveDate;
use proptest::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
struct Note {
    id: i64,
    title: String,
    due: Option<NaiveDate>,
    touched: bool,
}

impl Record for Note {
    const TABLE: Option<&'static str> = Some("notes");

    fn declared_fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::scalar::<i64>("id", None, None, true),
            FieldDecl::scalar::<String>("title", Some("title"), None, false),
            FieldDecl::scalar::<Option<NaiveDate>>("due", Some("due"), Some(TypeHint::Date), false),
            FieldDecl::ignored("touched"),
        ]
    }

    fn set_field(&mut self, path: &[usize], value: Value) -> bool {
        match path {
            [0] => assign(&mut self.id, value),
            [1] => assign(&mut self.title, value),
            [2] => assign(&mut self.due, value),
            _ => false,
        }
    }

    fn field_value(&self, path: &[usize]) -> Option<Value> {
        match path {
            [0] => Some(self.id.to_value()),
            [1] => Some(self.title.to_value()),
            [2] => Some(self.due.to_value()),
            _ => None,
        }
    }

    fn before_update(&mut self) {
        self.touched = true;
    }
}

fn quiet(db: &MemoryBackend) -> QuerySource<'_> {
    QuerySource::with_config(db, DbConfig::new().log_sql(false))
}

fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}

#[test]
fn test_select_basic() {
    let db = MemoryBackend::new();
    let sql = quiet(&db).table("users").to_sql().unwrap();
    assert_eq!(sql, "SELECT * FROM users");
}

#[test]
fn test_full_assembly_order() {
    let db = MemoryBackend::new();
    let (sql, args) = quiet(&db)
        .table("orders")
        .select("status, count(*) AS n")
        .and_where("created_at >= ?", args!["2024-01-01"])
        .or_where("vip = ?", args![true])
        .in_list("region", ["eu", "us"])
        .group_by("status")
        .order_by("n DESC")
        .page(3, 10)
        .build()
        .unwrap();

    assert_eq!(
        sql,
        "SELECT status, count(*) AS n FROM orders WHERE created_at >= ? OR vip = ? \
         AND region IN (?, ?) GROUP BY status ORDER BY n DESC LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        args,
        args!["2024-01-01", true, "eu", "us"]
    );
}

#[test]
fn test_placeholders_align_with_args() {
    let db = MemoryBackend::new();
    let (sql, args) = quiet(&db)
        .table("t")
        .in_list("a", [1, 2, 3])
        .and_where("b BETWEEN ? AND ?", args![10, 20])
        .or_where("c = ?", args!["x"])
        .and_where("d IS NOT NULL", args![])
        .build()
        .unwrap();
    assert_eq!(placeholder_count(&sql), args.len());
    assert_eq!(args, args![1, 2, 3, 10, 20, "x"]);
    assert!(sql.contains("a IN (?, ?, ?)"));
}

#[derive(Debug, Clone)]
enum ClauseOp {
    Where(Vec<i64>),
    Or(Vec<i64>),
    In(Vec<i64>),
}

fn arb_clause() -> impl Strategy<Value = ClauseOp> {
    let values = || prop::collection::vec(any::<i64>(), 0..4);
    prop_oneof![
        values().prop_map(ClauseOp::Where),
        values().prop_map(ClauseOp::Or),
        values().prop_map(ClauseOp::In),
    ]
}

fn fragment(values: &[i64]) -> String {
    if values.is_empty() {
        return "x IS NOT NULL".to_string();
    }
    (0..values.len())
        .map(|i| format!("c{i} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

proptest! {
    #[test]
    fn test_placeholders_align_for_any_clause_sequence(
        ops in prop::collection::vec(arb_clause(), 1..8)
    ) {
        let db = MemoryBackend::new();
        let mut qb = quiet(&db).table("t");
        let mut expected = Vec::new();
        for op in &ops {
            qb = match op {
                ClauseOp::Where(v) => qb.and_where(&fragment(v), v.iter().map(|&i| Value::from(i)).collect()),
                ClauseOp::Or(v) => qb.or_where(&fragment(v), v.iter().map(|&i| Value::from(i)).collect()),
                ClauseOp::In(v) => qb.in_list("k", v.clone()),
            };
            let (ClauseOp::Where(v) | ClauseOp::Or(v) | ClauseOp::In(v)) = op;
            expected.extend(v.iter().map(|&i| Value::from(i)));
        }
        let (sql, args) = qb.build().unwrap();
        prop_assert_eq!(placeholder_count(&sql), args.len());
        prop_assert_eq!(args, expected);
        prop_assert!(sql.matches(" WHERE ").count() <= 1);
    }
}

#[test]
fn test_empty_in_is_not_emitted() {
    let db = MemoryBackend::new();
    let sql = quiet(&db)
        .table("t")
        .in_list("id", Vec::<i64>::new())
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t");
}

#[test]
fn test_root_source_yields_isolated_builders() {
    let db = MemoryBackend::new();
    let root = quiet(&db);

    let a = root.table("t").and_where("a = ?", args![1]);
    let b = root.table("t").and_where("b = ?", args![2]);
    let fresh = root.table("t");

    assert_eq!(a.to_sql().unwrap(), "SELECT * FROM t WHERE a = ?");
    assert_eq!(b.to_sql().unwrap(), "SELECT * FROM t WHERE b = ?");
    assert_eq!(fresh.to_sql().unwrap(), "SELECT * FROM t");
}

#[test]
fn test_derived_builder_refines_in_place() {
    let db = MemoryBackend::new();
    let q = quiet(&db).table("t").and_where("a = ?", args![1]);
    let q = q.and_where("b = ?", args![2]);
    let (sql, args) = q.build().unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ?");
    assert_eq!(args, args![1, 2]);
}

#[test]
fn test_page_offsets() {
    let db = MemoryBackend::new();
    let src = quiet(&db);
    let offset = |cur: i64| src.table("t").page(cur, 20).state().limit;
    assert_eq!(offset(1), Some((0, 20)));
    assert_eq!(offset(2), Some((20, 20)));
    assert_eq!(offset(0), Some((0, 20)));
    assert_eq!(offset(-3), Some((0, 20)));
}

#[test]
fn test_non_positive_page_size_has_no_window() {
    let db = MemoryBackend::new();
    let src = quiet(&db);
    assert_eq!(src.table("t").page(1, 0).to_sql().unwrap(), "SELECT * FROM t");
    assert_eq!(src.table("t").page(2, -5).to_sql().unwrap(), "SELECT * FROM t");
    assert_eq!(src.table("t").limit(10, 0).state().limit, None);

    // A later empty window replaces an earlier one.
    let sql = src.table("t").page(2, 10).limit(0, -1).to_sql().unwrap();
    assert_eq!(sql, "SELECT * FROM t");
}

#[test]
fn test_missing_table_is_config_error() {
    let db = MemoryBackend::new();
    let err = quiet(&db).and_where("a = ?", args![1]).build().unwrap_err();
    assert!(err.is_config());
    assert!(db.statements().is_empty());
}

#[test]
fn test_sort_and_limit() {
    let db = MemoryBackend::new();
    let sql = quiet(&db)
        .table("t")
        .sort("id", "DESC")
        .limit(5, 10)
        .to_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t ORDER BY id DESC LIMIT 10 OFFSET 5");
}

#[test]
fn test_maps_skip_empty_strings() {
    let db = MemoryBackend::new();
    let (sql, args) = quiet(&db)
        .table("t")
        .maps([("name", "bob"), ("city", ""), ("zip", "123")])
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t WHERE name = ? AND zip = ?");
    assert_eq!(args, args!["bob", "123"]);
}

#[test]
fn test_find_uses_model_table() {
    let db = MemoryBackend::new();
    db.push_rows(
        &["id", "title", "due"],
        vec![args![1, "first", "2024-06-01"], args![2, "second", Value::Null]],
    );
    let notes: Vec<Note> = quiet(&db).builder().find().unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].due, NaiveDate::from_ymd_opt(2024, 6, 1));
    assert_eq!(notes[1].due, None);
    assert_eq!(db.last_sql().as_deref(), Some("SELECT * FROM notes"));
}

#[test]
fn test_get_adds_limit_one_and_reports_not_found() {
    let db = MemoryBackend::new();
    let err = quiet(&db)
        .model::<Note>()
        .and_where("title = ?", args!["x"])
        .get::<Note>()
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        db.last_sql().as_deref(),
        Some("SELECT * FROM notes WHERE title = ? LIMIT 1")
    );
}

#[test]
fn test_get_for_update_requires_tx() {
    let db = MemoryBackend::new();
    let err = quiet(&db).model::<Note>().get_for_update::<Note>().unwrap_err();
    assert!(err.is_config());

    let tx = MemoryBackend::new();
    tx.push_rows(&["id", "title"], vec![args![4, "locked"]]);
    let note: Note = quiet(&db).tx(&tx).get_for_update().unwrap();
    assert_eq!(note.id, 4);
    assert_eq!(
        tx.last_sql().as_deref(),
        Some("SELECT * FROM notes LIMIT 1 FOR UPDATE")
    );
    assert!(db.statements().is_empty());
}

#[test]
fn test_find_by_id_uses_key_column() {
    let db = MemoryBackend::new();
    db.push_rows(&["id", "title"], vec![args![9, "nine"]]);
    let note: Note = quiet(&db).find_by_id(9).unwrap();
    assert_eq!(note.title, "nine");
    let stmts = db.statements();
    let (sql, args) = &stmts[0];
    assert_eq!(sql, "SELECT * FROM notes WHERE id = ? LIMIT 1");
    assert_eq!(args, &args![9]);
}

#[test]
fn test_count_and_scalars() {
    let db = MemoryBackend::new();
    db.push_rows(&["count(*)"], vec![args![42]])
        .push_rows(&["max(score)"], vec![vec![Value::Null]])
        .push_rows(&["name"], vec![vec![Value::Bytes(b"ann".to_vec())]]);

    let src = quiet(&db);
    assert_eq!(src.table("t").count().unwrap(), 42);
    assert_eq!(src.table("t").select_int("max(score)").unwrap(), 0);
    assert_eq!(src.table("t").select_str("name").unwrap(), "ann");

    let sqls: Vec<_> = db.statements().into_iter().map(|(s, _)| s).collect();
    assert_eq!(
        sqls,
        [
            "SELECT count(*) FROM t",
            "SELECT max(score) FROM t LIMIT 1",
            "SELECT name FROM t LIMIT 1",
        ]
    );
}

#[test]
fn test_exists() {
    let db = MemoryBackend::new();
    db.push_rows(&["1"], vec![args![1]]).push_rows(&["1"], vec![]);
    let q = quiet(&db).table("t").and_where("a = ?", args![1]);
    assert!(q.exists().unwrap());
    assert!(!q.exists().unwrap());
    assert_eq!(
        db.last_sql().as_deref(),
        Some("SELECT 1 FROM t WHERE a = ? LIMIT 1")
    );
}

#[test]
fn test_update_args_precede_where_args() {
    let db = MemoryBackend::new();
    db.push_exec(3, None);
    let n = quiet(&db)
        .table("t")
        .and_where("id > ?", args![10])
        .update("a = ?, b = b + ?", args!["x", 1])
        .unwrap();
    assert_eq!(n, 3);
    let stmts = db.statements();
    let (sql, args) = &stmts[0];
    assert_eq!(sql, "UPDATE t SET a = ?, b = b + ? WHERE id > ?");
    assert_eq!(args, &args!["x", 1, 10]);
}

#[test]
fn test_update_map_keeps_given_order() {
    let db = MemoryBackend::new();
    quiet(&db)
        .table("t")
        .and_where("id = ?", args![1])
        .update_map(vec![("z", Value::from(1)), ("a", Value::from("y"))])
        .unwrap();
    assert_eq!(
        db.last_sql().as_deref(),
        Some("UPDATE t SET z = ?, a = ? WHERE id = ?")
    );

    let err = quiet(&db)
        .table("t")
        .and_where("id = ?", args![1])
        .update_map(Vec::<(String, Value)>::new())
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
}

#[test]
fn test_unfiltered_delete_and_update_are_refused() {
    let db = MemoryBackend::new();
    let q = quiet(&db).table("t");
    assert!(matches!(q.delete(), Err(OrmError::Validation(_))));
    assert!(matches!(q.update("a = 1", vec![]), Err(OrmError::Validation(_))));
    assert!(db.statements().is_empty());
}

#[test]
fn test_insert_skips_unset_key_and_writes_back_id() {
    let db = MemoryBackend::new();
    db.push_exec(1, Some(77));
    let mut note = Note {
        title: "hello".into(),
        due: NaiveDate::from_ymd_opt(2024, 3, 9),
        ..Note::default()
    };
    quiet(&db).insert(&mut note).unwrap();
    assert_eq!(note.id, 77);

    let stmts = db.statements();
    let (sql, args) = &stmts[0];
    assert_eq!(sql, "INSERT INTO notes (title, due) VALUES (?, ?)");
    assert_eq!(args, &args!["hello", "2024-03-09"]);
}

#[test]
fn test_insert_keeps_explicit_key() {
    let db = MemoryBackend::new();
    db.push_exec(1, Some(5));
    let mut note = Note {
        id: 12,
        title: "x".into(),
        ..Note::default()
    };
    quiet(&db).insert(&mut note).unwrap();
    assert_eq!(note.id, 12);
    assert_eq!(
        db.last_sql().as_deref(),
        Some("INSERT INTO notes (id, title, due) VALUES (?, ?, ?)")
    );
}

#[test]
fn test_flush_and_delete_record_use_key() {
    let db = MemoryBackend::new();
    db.push_exec(1, None).push_exec(1, None);
    let src = quiet(&db);
    let mut note = Note {
        id: 3,
        title: "t".into(),
        ..Note::default()
    };
    assert_eq!(src.flush(&mut note).unwrap(), 1);
    assert!(note.touched);
    assert_eq!(src.delete_record(&note).unwrap(), 1);

    let stmts = db.statements();
    assert_eq!(stmts[0].0, "UPDATE notes SET title = ?, due = ? WHERE id = ?");
    assert_eq!(stmts[0].1, args!["t", Value::Null, 3]);
    assert_eq!(stmts[1].0, "DELETE FROM notes WHERE id = ?");

    let unsaved = Note::default();
    assert!(matches!(
        src.delete_record(&unsaved),
        Err(OrmError::Validation(_))
    ));
}

#[test]
fn test_paginate_counts_on_first_page() {
    let db = MemoryBackend::new();
    db.push_rows(&["count(*)"], vec![args![45]]);
    let (q, pages) = quiet(&db).table("t").paginate(1, 20, 0).unwrap();
    assert_eq!(pages, 3);
    assert_eq!(q.state().limit, Some((0, 20)));
}

#[test]
fn test_paginate_trusts_known_total_after_first_page() {
    let db = MemoryBackend::new();
    let (q, pages) = quiet(&db).table("t").paginate(2, 0, 7).unwrap();
    assert_eq!(pages, 7);
    assert_eq!(q.state().limit, Some((20, 20)));
    assert!(db.statements().is_empty());
}

#[test]
fn test_paginate_with_no_rows() {
    let db = MemoryBackend::new();
    db.push_rows(&["count(*)"], vec![args![0]]);
    let (q, pages) = quiet(&db).table("t").paginate(-1, 10, 5).unwrap();
    assert_eq!(pages, 0);
    assert_eq!(q.state().limit, None);
}

#[test]
fn test_total_pages() {
    assert_eq!(total_pages(20, 40), 2);
    assert_eq!(total_pages(20, 41), 3);
    assert_eq!(total_pages(20, 1), 1);
    assert_eq!(total_pages(20, 0), 0);
    assert_eq!(total_pages(0, 10), 0);
}

#[test]
fn test_raw_add_and_save() {
    let db = MemoryBackend::new();
    db.push_exec(1, Some(1)).push_exec(1, None);
    let src = quiet(&db);
    src.add("users", "name, age", args!["ann", 30]).unwrap();
    src.save("users", "name,age", 1, args!["ann", 31]).unwrap();

    let stmts = db.statements();
    assert_eq!(stmts[0].0, "INSERT INTO users (name, age) VALUES (?, ?)");
    assert_eq!(stmts[1].0, "UPDATE users SET name = ?, age = ? WHERE id = ?");
    assert_eq!(stmts[1].1, args!["ann", 31, 1]);
}

#[test]
fn test_query_maps() {
    let db = MemoryBackend::new();
    db.push_rows(&["id", "ok"], vec![args!["5", "1"]]);
    let rows = quiet(&db).query_maps("SELECT id, ok FROM t", &[]).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&Value::Int(5)));
    assert_eq!(rows[0].get("ok"), Some(&Value::Bool(true)));
}

#[test]
fn test_backend_error_passes_through() {
    let db = MemoryBackend::new();
    db.push_error("connection lost");
    let err = quiet(&db).table("t").list().unwrap_err();
    assert!(matches!(err, OrmError::Backend(_)));
    assert_eq!(err.to_string(), "connection lost");
}
