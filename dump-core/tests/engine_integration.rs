//! Exercises the Dump Engine end to end against a fake in-memory
//! `MysqlExecutor` (no live MySQL server is available to this workspace).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read as _;
use std::sync::Arc;

use dump_core::{
    CellValue, DumpEngine, DumpOptions, DumpSession, MySqlCatalog, MysqlExecutor, NameList,
    PlainSink, Sink, TextRow,
};
use dump_common::DumpResult;

/// Replies driven by simple SQL-shape matching rather than a full parser —
/// enough to stand in for a server across the handful of queries the
/// catalog adapter actually issues.
#[derive(Debug, Default)]
struct FakeExecutor {
    tables: Vec<String>,
    views: Vec<String>,
    columns: HashMap<String, Vec<(&'static str, &'static str, &'static str)>>,
    create_table: HashMap<String, String>,
    table_rows: HashMap<String, Vec<Vec<CellValue>>>,
    executed: Vec<String>,
}

fn backtick_name(sql: &str) -> String {
    let start = sql.find('`').unwrap_or(0) + 1;
    let rest = &sql[start..];
    let end = rest.find('`').unwrap_or(rest.len());
    rest[..end].to_string()
}

fn row(columns: &[&str], values: Vec<CellValue>) -> TextRow {
    let cols: Arc<[String]> = columns.iter().map(|s| s.to_string()).collect::<Vec<_>>().into();
    TextRow::new(cols, values)
}

fn raw(bytes: &[u8]) -> CellValue {
    CellValue::Raw(bytes.to_vec())
}

impl MysqlExecutor for FakeExecutor {
    fn query_rows(&mut self, sql: &str) -> DumpResult<Vec<TextRow>> {
        if sql.contains("TABLE_TYPE='BASE TABLE'") {
            return Ok(self.tables.iter().map(|t| row(&["TABLE_NAME"], vec![raw(t.as_bytes())])).collect());
        }
        if sql.contains("TABLE_TYPE='VIEW'") {
            return Ok(self.views.iter().map(|v| row(&["TABLE_NAME"], vec![raw(v.as_bytes())])).collect());
        }
        if sql.starts_with("SHOW TRIGGERS") || sql.contains("INFORMATION_SCHEMA.ROUTINES") || sql.contains("INFORMATION_SCHEMA.EVENTS") {
            return Ok(Vec::new());
        }
        if sql.starts_with("SHOW COLUMNS FROM") {
            let table = backtick_name(sql);
            let cols = self.columns.get(&table).cloned().unwrap_or_default();
            return Ok(cols
                .into_iter()
                .map(|(name, ty, extra)| row(&["Field", "Type", "Extra"], vec![raw(name.as_bytes()), raw(ty.as_bytes()), raw(extra.as_bytes())]))
                .collect());
        }
        if sql.starts_with("SHOW CREATE TABLE") {
            let table = backtick_name(sql);
            let ddl = self.create_table.get(&table).cloned().unwrap_or_default();
            return Ok(vec![row(&["Table", "Create Table"], vec![raw(table.as_bytes()), raw(ddl.as_bytes())])]);
        }
        Ok(Vec::new())
    }

    fn for_each_row(&mut self, sql: &str, visit: &mut dyn FnMut(TextRow) -> DumpResult<()>) -> DumpResult<()> {
        let table = backtick_name(&sql[sql.find(" FROM ").map(|i| i + 6).unwrap_or(0)..]);
        for values in self.table_rows.get(&table).cloned().unwrap_or_default() {
            visit(row(&[], values))?;
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> DumpResult<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn server_variable(&mut self, _name: &str) -> DumpResult<Option<String>> {
        Ok(Some("utf8mb4".to_string()))
    }

    fn server_version(&mut self) -> DumpResult<String> {
        Ok("8.0.35".to_string())
    }
}

fn temp_path(tag: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("dump-core-engine-test-{tag}-{}.sql", std::process::id()))
}

fn read_file(path: &std::path::Path) -> String {
    let mut contents = String::new();
    File::open(path).unwrap().read_to_string(&mut contents).unwrap();
    contents
}

#[test]
fn simple_table_dumps_null_and_hex_blob_row() {
    let mut executor = FakeExecutor::default();
    executor.tables = vec!["t".to_string()];
    executor.columns.insert("t".to_string(), vec![("a", "int", ""), ("b", "blob", "")]);
    executor.create_table.insert("t".to_string(), "CREATE TABLE `t` (`a` int, `b` blob)".to_string());
    executor.table_rows.insert("t".to_string(), vec![vec![CellValue::Null, raw(b"DEADBEEF")]]);

    let catalog = MySqlCatalog::new(executor, "mydb".to_string());
    let path = temp_path("simple");
    let sink: Box<dyn Sink> = Box::new(PlainSink::to_path(&path));
    let session = DumpSession::new(catalog, sink, DumpOptions::default(), "mydb".to_string());

    DumpEngine::run(session, None).unwrap();

    let contents = read_file(&path);
    assert!(contents.contains("INSERT INTO `t` VALUES (NULL,0xDEADBEEF);"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn virtual_column_forces_complete_insert() {
    let mut executor = FakeExecutor::default();
    executor.tables = vec!["t".to_string()];
    executor.columns.insert(
        "t".to_string(),
        vec![("a", "int", "VIRTUAL GENERATED"), ("b", "int", "")],
    );
    executor.create_table.insert(
        "t".to_string(),
        "CREATE TABLE `t` (`a` int GENERATED ALWAYS AS (1) VIRTUAL, `b` int)".to_string(),
    );
    executor.table_rows.insert("t".to_string(), vec![vec![raw(b"7")]]);

    let catalog = MySqlCatalog::new(executor, "mydb".to_string());
    let path = temp_path("virtual");
    let sink: Box<dyn Sink> = Box::new(PlainSink::to_path(&path));
    let session = DumpSession::new(catalog, sink, DumpOptions::default(), "mydb".to_string());

    DumpEngine::run(session, None).unwrap();

    let contents = read_file(&path);
    assert!(contents.contains("INSERT INTO `t` (`b`) VALUES (7);"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn extended_insert_splits_batch_at_net_buffer_length() {
    let mut executor = FakeExecutor::default();
    executor.tables = vec!["t".to_string()];
    executor.columns.insert("t".to_string(), vec![("a", "int", "")]);
    executor.create_table.insert("t".to_string(), "CREATE TABLE `t` (`a` int)".to_string());
    executor.table_rows.insert(
        "t".to_string(),
        vec![vec![raw(b"111111111111111111111111111111")], vec![raw(b"2")]],
    );

    let catalog = MySqlCatalog::new(executor, "mydb".to_string());
    let mut opts = DumpOptions::default();
    opts.net_buffer_length = 50;
    let path = temp_path("batch");
    let sink: Box<dyn Sink> = Box::new(PlainSink::to_path(&path));
    let session = DumpSession::new(catalog, sink, opts, "mydb".to_string());

    DumpEngine::run(session, None).unwrap();

    let contents = read_file(&path);
    assert_eq!(contents.matches("INSERT INTO `t`").count(), 2);
    std::fs::remove_file(&path).ok();
}

#[test]
fn unresolved_include_table_aborts_before_data() {
    let mut executor = FakeExecutor::default();
    executor.tables = vec!["users".to_string()];
    executor.columns.insert("users".to_string(), vec![("id", "int", "")]);
    executor.create_table.insert("users".to_string(), "CREATE TABLE `users` (`id` int)".to_string());

    let catalog = MySqlCatalog::new(executor, "mydb".to_string());
    let mut opts = DumpOptions::default();
    opts.include_tables = NameList::parse(["users", "orders"]).unwrap();
    let path = temp_path("unresolved");
    let sink: Box<dyn Sink> = Box::new(PlainSink::to_path(&path));
    let session = DumpSession::new(catalog, sink, opts, "mydb".to_string());

    let result = DumpEngine::run(session, None);
    assert!(result.is_err());
    let contents = read_file(&path);
    assert!(!contents.contains("INSERT INTO"));
    std::fs::remove_file(&path).ok();
}

#[test]
fn no_create_info_suppresses_create_statements() {
    let mut executor = FakeExecutor::default();
    executor.tables = vec!["t".to_string()];
    executor.columns.insert("t".to_string(), vec![("a", "int", "")]);
    executor.create_table.insert("t".to_string(), "CREATE TABLE `t` (`a` int)".to_string());
    executor.table_rows.insert("t".to_string(), vec![vec![raw(b"1")]]);

    let catalog = MySqlCatalog::new(executor, "mydb".to_string());
    let mut opts = DumpOptions::default();
    opts.no_create_info = true;
    let path = temp_path("no-create-info");
    let sink: Box<dyn Sink> = Box::new(PlainSink::to_path(&path));
    let session = DumpSession::new(catalog, sink, opts, "mydb".to_string());

    DumpEngine::run(session, None).unwrap();

    let contents = read_file(&path);
    assert!(!contents.contains("CREATE TABLE"));
    assert!(contents.contains("INSERT INTO `t` VALUES (1);"));
    std::fs::remove_file(&path).ok();
}
