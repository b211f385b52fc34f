use std::sync::Arc;

use dump_common::{DumpError, DumpResult};
use mysql::prelude::Queryable;
use tracing::instrument;

use crate::value::CellValue;

/// One row of a catalog or data query, keyed by the column names the
/// server reported alongside it.
#[derive(Debug, Clone)]
pub struct TextRow {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl TextRow {
    pub fn new(columns: Arc<[String]>, values: Vec<CellValue>) -> Self {
        TextRow { columns, values }
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))?;
        self.values.get(idx)
    }

    pub fn at(&self, idx: usize) -> Option<&CellValue> {
        self.values.get(idx)
    }

    pub fn get_string(&self, name: &str) -> DumpResult<String> {
        match self.get(name) {
            Some(CellValue::Raw(bytes)) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Some(CellValue::Null) | None => Err(DumpError::Query(format!(
                "expected a value for column `{name}`, found none"
            ))),
        }
    }

    pub fn into_values(self) -> Vec<CellValue> {
        self.values
    }
}

/// The metadata+query facade the catalog adapter is built on (§4.1). This
/// is the seam that makes dialect SQL-building testable against a fake
/// server reply without a live connection — the live implementation is a
/// thin wrapper over `mysql::Conn`.
pub trait MysqlExecutor: std::fmt::Debug {
    /// Runs `sql` and materializes every row. Only used for small catalog
    /// listing/DDL-retrieval queries, never for table data.
    fn query_rows(&mut self, sql: &str) -> DumpResult<Vec<TextRow>>;

    /// Runs `sql` and invokes `visit` once per row as it arrives off the
    /// wire, without buffering the whole result set client-side (§4.5
    /// stage 1 — "request unbuffered result streaming").
    fn for_each_row(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(TextRow) -> DumpResult<()>,
    ) -> DumpResult<()>;

    /// Executes a statement with no result set expected (`SET`, `LOCK
    /// TABLES`, `START TRANSACTION`, ...).
    fn execute(&mut self, sql: &str) -> DumpResult<()>;

    fn server_variable(&mut self, name: &str) -> DumpResult<Option<String>>;

    fn server_version(&mut self) -> DumpResult<String>;
}

/// Live executor backed by a single `mysql::Conn`. The connection is
/// requested with unbuffered, unprepared `COM_QUERY` semantics throughout
/// — every row is read directly off the wire as the caller iterates.
#[derive(Debug)]
pub struct LiveExecutor {
    conn: mysql::Conn,
}

impl LiveExecutor {
    pub fn connect(opts: mysql::Opts) -> DumpResult<Self> {
        let conn = mysql::Conn::new(opts).map_err(|e| DumpError::Connection(e.to_string()))?;
        Ok(LiveExecutor { conn })
    }

    fn columns_of(result: &mysql::QueryResult<'_, '_, '_, mysql::Text>) -> Arc<[String]> {
        result
            .columns()
            .map(|cols| cols.iter().map(|c| c.name_str().into_owned()).collect::<Vec<_>>())
            .unwrap_or_default()
            .into()
    }
}

impl MysqlExecutor for LiveExecutor {
    #[instrument(skip(self))]
    fn query_rows(&mut self, sql: &str) -> DumpResult<Vec<TextRow>> {
        let mut result = self
            .conn
            .query_iter(sql)
            .map_err(|e| DumpError::Query(format!("query failed: {sql} ({e})")))?;
        let columns = Self::columns_of(&result);

        let mut rows = Vec::new();
        for row in result.by_ref() {
            let row = row.map_err(|e| DumpError::Query(e.to_string()))?;
            let values = row.unwrap().into_iter().map(CellValue::from).collect();
            rows.push(TextRow::new(columns.clone(), values));
        }
        Ok(rows)
    }

    #[instrument(skip(self, visit))]
    fn for_each_row(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(TextRow) -> DumpResult<()>,
    ) -> DumpResult<()> {
        let mut result = self
            .conn
            .query_iter(sql)
            .map_err(|e| DumpError::Query(format!("query failed: {sql} ({e})")))?;
        let columns = Self::columns_of(&result);

        for row in result.by_ref() {
            let row = row.map_err(|e| DumpError::Query(e.to_string()))?;
            let values = row.unwrap().into_iter().map(CellValue::from).collect();
            visit(TextRow::new(columns.clone(), values))?;
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> DumpResult<()> {
        self.conn
            .query_drop(sql)
            .map_err(|e| DumpError::Query(format!("statement failed: {sql} ({e})")))
    }

    fn server_variable(&mut self, name: &str) -> DumpResult<Option<String>> {
        self.conn
            .query_first::<String, _>(format!("SELECT @@{name}"))
            .map_err(|e| DumpError::Query(e.to_string()))
    }

    fn server_version(&mut self) -> DumpResult<String> {
        self.conn
            .query_first::<String, _>("SELECT VERSION()")
            .map_err(|e| DumpError::Query(e.to_string()))?
            .ok_or_else(|| DumpError::Query("server did not report a version".into()))
    }
}
