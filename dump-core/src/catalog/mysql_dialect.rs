use once_cell::sync::Lazy;
use regex::Regex;
use tracing::instrument;

use dump_common::{DumpError, DumpOptions, DumpResult};

use crate::catalog::executor::MysqlExecutor;
use crate::catalog::{CatalogAdapter, ObjectLists};
use crate::typing::ColumnDescriptor;
use crate::value::{quote_string, CellValue};

/// Matches an optional `ALGORITHM=...` clause, an optional `DEFINER=...[
/// SQL SECURITY ...]` clause, and captures whatever kind of object the
/// statement creates (§4.1 — the same anchor used for `CREATE VIEW`,
/// generalized so `CREATE TRIGGER`/`CREATE PROCEDURE` share it).
static CREATE_DEFINER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(CREATE(?:\s+ALGORITHM=(?:UNDEFINED|MERGE|TEMPTABLE))?)\s+(?:(DEFINER=`[^`]*`@`[^`]*`(?:\s+SQL SECURITY (?:DEFINER|INVOKER))?)\s+)?(.+)$",
    )
    .expect("static regex is valid")
});

static AUTO_INCREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r" AUTO_INCREMENT=\d+").expect("static regex is valid")
});

struct SplitDefiner {
    create_part: String,
    definer_part: Option<String>,
    rest: String,
}

/// Splits `CREATE [ALGORITHM=...] [DEFINER=... [SQL SECURITY ...]] <rest>`
/// into its pieces, or fails with a `QueryError` if the server's DDL text
/// doesn't have the expected shape.
fn split_definer(body: &str) -> DumpResult<SplitDefiner> {
    let caps = CREATE_DEFINER_RE
        .captures(body.trim())
        .ok_or_else(|| DumpError::Query(format!("unrecognized CREATE statement shape: {body}")))?;
    Ok(SplitDefiner {
        create_part: caps[1].to_string(),
        definer_part: caps.get(2).map(|m| m.as_str().to_string()),
        rest: caps[3].to_string(),
    })
}

/// `mysqldump`-compatible Catalog Adapter (component B) for MySQL-dialect
/// servers. Generic over [`MysqlExecutor`] so the dialect SQL-building
/// logic below is exercised in tests against a fake server reply.
#[derive(Debug)]
pub struct MySqlCatalog<E> {
    executor: E,
    database: String,
}

impl<E: MysqlExecutor> MySqlCatalog<E> {
    pub fn new(executor: E, database: String) -> Self {
        MySqlCatalog { executor, database }
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    fn list_names(&mut self, sql: &str, column: &str) -> DumpResult<Vec<String>> {
        self.executor
            .query_rows(sql)?
            .into_iter()
            .map(|row| row.get_string(column))
            .collect()
    }

    /// Builds the full object enumeration (§4.5 stage 5) honoring the
    /// per-kind toggles (`skip_triggers`, `routines`, `events`).
    pub fn enumerate(&mut self, opts: &DumpOptions) -> DumpResult<ObjectLists> {
        let mut lists = ObjectLists {
            tables: self.list_tables()?,
            views: self.list_views()?,
            ..Default::default()
        };
        if !opts.skip_triggers {
            lists.triggers = self.list_triggers()?;
        }
        if opts.routines {
            lists.procedures = self.list_procedures()?;
        }
        if opts.events {
            lists.events = self.list_events()?;
        }
        Ok(lists)
    }
}

impl<E: MysqlExecutor> CatalogAdapter for MySqlCatalog<E> {
    #[instrument(skip(self))]
    fn list_tables(&mut self) -> DumpResult<Vec<String>> {
        let sql = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE='BASE TABLE' AND TABLE_SCHEMA={}",
            quote_string(self.database.as_bytes())
        );
        self.list_names(&sql, "TABLE_NAME")
    }

    #[instrument(skip(self))]
    fn list_views(&mut self) -> DumpResult<Vec<String>> {
        let sql = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA={}",
            quote_string(self.database.as_bytes())
        );
        self.list_names(&sql, "TABLE_NAME")
    }

    #[instrument(skip(self))]
    fn list_triggers(&mut self) -> DumpResult<Vec<String>> {
        let sql = format!("SHOW TRIGGERS FROM `{}`", self.database);
        self.list_names(&sql, "Trigger")
    }

    #[instrument(skip(self))]
    fn list_procedures(&mut self) -> DumpResult<Vec<String>> {
        let sql = format!(
            "SELECT SPECIFIC_NAME FROM INFORMATION_SCHEMA.ROUTINES WHERE ROUTINE_TYPE='PROCEDURE' AND ROUTINE_SCHEMA={}",
            quote_string(self.database.as_bytes())
        );
        self.list_names(&sql, "SPECIFIC_NAME")
    }

    #[instrument(skip(self))]
    fn list_events(&mut self) -> DumpResult<Vec<String>> {
        let sql = format!(
            "SELECT EVENT_NAME FROM INFORMATION_SCHEMA.EVENTS WHERE EVENT_SCHEMA={}",
            quote_string(self.database.as_bytes())
        );
        self.list_names(&sql, "EVENT_NAME")
    }

    #[instrument(skip(self))]
    fn columns_of(&mut self, table: &str) -> DumpResult<Vec<ColumnDescriptor>> {
        let rows = self.executor.query_rows(&format!("SHOW COLUMNS FROM `{table}`"))?;
        rows.into_iter()
            .map(|row| {
                let name = row.get_string("Field")?;
                let raw_sql = row.get_string("Type")?;
                let extra = row.get_string("Extra").unwrap_or_default();
                Ok(ColumnDescriptor::classify(name, raw_sql, &extra))
            })
            .collect()
    }

    #[instrument(skip(self, opts))]
    fn create_table_ddl(&mut self, table: &str, opts: &DumpOptions) -> DumpResult<String> {
        let row = self
            .executor
            .query_rows(&format!("SHOW CREATE TABLE `{table}`"))?
            .into_iter()
            .next()
            .ok_or_else(|| DumpError::Query(format!("SHOW CREATE TABLE `{table}` returned no rows")))?;
        let mut body = row.get_string("Create Table")?;
        if opts.reset_auto_increment {
            body = AUTO_INCREMENT_RE.replace(&body, "").into_owned();
        }

        let mut out = String::new();
        out.push_str("/*!40101 SET @saved_cs_client     = @@character_set_client */;\n");
        out.push_str("/*!50503 SET character_set_client = utf8mb4 */;\n");
        out.push_str(&body);
        out.push_str(";\n");
        out.push_str("/*!40101 SET character_set_client = @saved_cs_client */;\n");
        Ok(out)
    }

    #[instrument(skip(self, opts))]
    fn create_view_ddl(&mut self, view: &str, opts: &DumpOptions) -> DumpResult<String> {
        let row = self
            .executor
            .query_rows(&format!("SHOW CREATE VIEW `{view}`"))?
            .into_iter()
            .next()
            .ok_or_else(|| DumpError::Query(format!("SHOW CREATE VIEW `{view}` returned no rows")))?;
        let body = row.get_string("Create View")?;
        let split = split_definer(&body)?;

        let mut out = String::new();
        out.push_str(&format!("/*!50001 {} */\n", split.create_part));
        if let (Some(definer), false) = (split.definer_part.as_ref(), opts.skip_definer) {
            out.push_str(&format!("/*!50013 {definer} */\n"));
        }
        out.push_str(&format!("/*!50001 {} */;\n", split.rest));
        Ok(out)
    }

    #[instrument(skip(self, opts))]
    fn create_trigger_ddl(&mut self, trigger: &str, opts: &DumpOptions) -> DumpResult<String> {
        let row = self
            .executor
            .query_rows(&format!("SHOW CREATE TRIGGER `{trigger}`"))?
            .into_iter()
            .next()
            .ok_or_else(|| DumpError::Query(format!("SHOW CREATE TRIGGER `{trigger}` returned no rows")))?;
        let body = row.get_string("SQL Original Statement")?;
        let split = split_definer(&body)?;

        let mut out = String::new();
        if opts.add_drop_trigger {
            out.push_str(&format!("DROP TRIGGER IF EXISTS `{trigger}`;\n"));
        }
        out.push_str("DELIMITER ;;\n");
        out.push_str(&split.create_part);
        out.push(' ');
        if let (Some(definer), false) = (split.definer_part.as_ref(), opts.skip_definer) {
            out.push_str(definer);
            out.push(' ');
        }
        out.push_str(&split.rest);
        out.push_str(" ;;\n");
        out.push_str("DELIMITER ;\n");
        Ok(out)
    }

    #[instrument(skip(self, opts))]
    fn create_procedure_ddl(&mut self, procedure: &str, opts: &DumpOptions) -> DumpResult<String> {
        let row = self
            .executor
            .query_rows(&format!("SHOW CREATE PROCEDURE `{procedure}`"))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                DumpError::Query(format!("SHOW CREATE PROCEDURE `{procedure}` returned no rows"))
            })?;
        let body = row.get_string("Create Procedure")?;
        let cs_client = row.get_string("character_set_client").unwrap_or_else(|_| "utf8".into());
        let split = split_definer(&body)?;

        let mut out = String::new();
        out.push_str(&format!("/*!50003 DROP PROCEDURE IF EXISTS `{procedure}` */;\n"));
        out.push_str("/*!50003 SET @saved_cs_client      = @@character_set_client */;\n");
        out.push_str(&format!("/*!50003 SET character_set_client = {cs_client} */;\n"));
        out.push_str("DELIMITER ;;\n");
        out.push_str(&split.create_part);
        out.push(' ');
        if let (Some(definer), false) = (split.definer_part.as_ref(), opts.skip_definer) {
            out.push_str(definer);
            out.push(' ');
        }
        out.push_str(&split.rest);
        out.push_str(" ;;\n");
        out.push_str("DELIMITER ;\n");
        out.push_str("/*!50003 SET character_set_client = @saved_cs_client */;\n");
        Ok(out)
    }

    #[instrument(skip(self, opts))]
    fn create_event_ddl(&mut self, event: &str, opts: &DumpOptions) -> DumpResult<String> {
        let row = self
            .executor
            .query_rows(&format!("SHOW CREATE EVENT `{event}`"))?
            .into_iter()
            .next()
            .ok_or_else(|| DumpError::Query(format!("SHOW CREATE EVENT `{event}` returned no rows")))?;
        let body = row.get_string("Create Event")?;
        let sql_mode = row.get_string("sql_mode").unwrap_or_default();
        let time_zone = row.get_string("time_zone").unwrap_or_else(|_| "SYSTEM".into());
        let cs_client = row.get_string("character_set_client").unwrap_or_else(|_| "utf8".into());
        let collation = row.get_string("collation_connection").unwrap_or_else(|_| "utf8_general_ci".into());
        let split = split_definer(&body)?;

        let mut out = String::new();
        out.push_str("/*!50106 SET @saved_time_zone      = @@time_zone */;\n");
        out.push_str(&format!("/*!50106 SET time_zone             = '{time_zone}' */;\n"));
        out.push_str("/*!50003 SET @saved_cs_client       = @@character_set_client */;\n");
        out.push_str("/*!50003 SET @saved_cs_results      = @@character_set_results */;\n");
        out.push_str("/*!50003 SET @saved_col_conn        = @@collation_connection */;\n");
        out.push_str(&format!("/*!50003 SET character_set_client  = {cs_client} */;\n"));
        out.push_str(&format!("/*!50003 SET character_set_results = {cs_client} */;\n"));
        out.push_str(&format!("/*!50003 SET collation_connection  = {collation} */;\n"));
        out.push_str("/*!50003 SET @saved_sql_mode        = @@sql_mode */;\n");
        out.push_str(&format!("/*!50003 SET sql_mode              = '{sql_mode}' */;\n"));
        out.push_str("DELIMITER ;;\n");
        out.push_str(&split.create_part);
        out.push(' ');
        if let (Some(definer), false) = (split.definer_part.as_ref(), opts.skip_definer) {
            out.push_str(definer);
            out.push(' ');
        }
        out.push_str(&split.rest);
        out.push_str(" ;;\n");
        out.push_str("DELIMITER ;\n");
        out.push_str("/*!50003 SET sql_mode              = @saved_sql_mode */;\n");
        out.push_str("/*!50106 SET time_zone             = @saved_time_zone */;\n");
        out.push_str("/*!50003 SET collation_connection  = @saved_col_conn */;\n");
        out.push_str("/*!50003 SET character_set_client  = @saved_cs_client */;\n");
        out.push_str("/*!50003 SET character_set_results = @saved_cs_results */;\n");
        Ok(out)
    }

    fn server_variable(&mut self, name: &str) -> DumpResult<Option<String>> {
        self.executor.server_variable(name)
    }

    fn server_version(&mut self) -> DumpResult<String> {
        self.executor.server_version()
    }

    fn execute(&mut self, sql: &str) -> DumpResult<()> {
        self.executor.execute(sql)
    }

    fn select_rows(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(Vec<CellValue>) -> DumpResult<()>,
    ) -> DumpResult<()> {
        self.executor.for_each_row(sql, &mut |row| visit(row.into_values()))
    }
}

/// Builds a view's stand-in `CREATE TABLE IF NOT EXISTS` (§4.5 "View
/// stand-ins") from its column descriptors. Pure — no catalog round-trip,
/// the columns were already fetched via `columns_of`.
pub fn view_stub_ddl(view: &str, columns: &[ColumnDescriptor]) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("`{}` {}", c.name, c.raw_sql))
        .collect::<Vec<_>>()
        .join(",\n  ");
    format!("CREATE TABLE IF NOT EXISTS `{view}` (\n  {cols}\n);\n")
}

/// `backup_parameters` (§4.1): saves and overrides session character set
/// and, unless `skip_tz_utc`, pins the connection to UTC for the
/// duration of the dump. Returned as lines meant to be both executed
/// against the live connection and written verbatim into the dump
/// preamble.
pub fn backup_parameters_lines(opts: &DumpOptions) -> Vec<String> {
    let mut lines = vec![
        "SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT;".to_string(),
        "SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS;".to_string(),
        "SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION;".to_string(),
        format!("SET NAMES {};", opts.default_character_set),
    ];
    if !opts.skip_tz_utc {
        lines.push("SET @OLD_TIME_ZONE=@@TIME_ZONE;".to_string());
        lines.push("SET TIME_ZONE='+00:00';".to_string());
    }
    lines.push("SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0;".to_string());
    lines.push("SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0;".to_string());
    lines.push("SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO';".to_string());
    lines.push("SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0;".to_string());
    lines
}

/// Symmetric restore of `backup_parameters_lines`, in reverse order.
pub fn restore_parameters_lines(opts: &DumpOptions) -> Vec<String> {
    let mut lines = vec![
        "SET SQL_NOTES=@OLD_SQL_NOTES;".to_string(),
        "SET SQL_MODE=@OLD_SQL_MODE;".to_string(),
        "SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS;".to_string(),
        "SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS;".to_string(),
    ];
    if !opts.skip_tz_utc {
        lines.push("SET TIME_ZONE=@OLD_TIME_ZONE;".to_string());
    }
    lines.push("SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION;".to_string());
    lines.push("SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS;".to_string());
    lines.push("SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT;".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::executor::TextRow;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// A fake executor driven by a canned queue of replies, keyed by
    /// nothing more than call order — enough to exercise the dialect
    /// SQL-building/post-processing logic without a live server.
    #[derive(Debug, Default)]
    struct FakeExecutor {
        rows_queue: VecDeque<Vec<TextRow>>,
        executed: Vec<String>,
    }

    impl FakeExecutor {
        fn push_rows(&mut self, columns: &[&str], values: Vec<Vec<CellValue>>) {
            let columns: Arc<[String]> = columns.iter().map(|s| s.to_string()).collect::<Vec<_>>().into();
            let rows = values
                .into_iter()
                .map(|v| TextRow::new(columns.clone(), v))
                .collect();
            self.rows_queue.push_back(rows);
        }
    }

    impl MysqlExecutor for FakeExecutor {
        fn query_rows(&mut self, _sql: &str) -> DumpResult<Vec<TextRow>> {
            Ok(self.rows_queue.pop_front().unwrap_or_default())
        }

        fn for_each_row(
            &mut self,
            sql: &str,
            visit: &mut dyn FnMut(TextRow) -> DumpResult<()>,
        ) -> DumpResult<()> {
            for row in self.query_rows(sql)? {
                visit(row)?;
            }
            Ok(())
        }

        fn execute(&mut self, sql: &str) -> DumpResult<()> {
            self.executed.push(sql.to_string());
            Ok(())
        }

        fn server_variable(&mut self, _name: &str) -> DumpResult<Option<String>> {
            Ok(Some("utf8".to_string()))
        }

        fn server_version(&mut self) -> DumpResult<String> {
            Ok("8.0.35".to_string())
        }
    }

    fn raw(bytes: &[u8]) -> CellValue {
        CellValue::Raw(bytes.to_vec())
    }

    #[test]
    fn create_table_ddl_strips_auto_increment_when_requested() {
        let mut exec = FakeExecutor::default();
        exec.push_rows(
            &["Table", "Create Table"],
            vec![vec![
                raw(b"t"),
                raw(b"CREATE TABLE `t` (`id` int) AUTO_INCREMENT=42"),
            ]],
        );
        let mut catalog = MySqlCatalog::new(exec, "db".to_string());
        let mut opts = DumpOptions::default();
        opts.reset_auto_increment = true;
        let ddl = catalog.create_table_ddl("t", &opts).unwrap();
        assert!(!ddl.contains("AUTO_INCREMENT"));
        assert!(ddl.contains("CREATE TABLE `t`"));
    }

    #[test]
    fn create_view_ddl_wraps_definer_with_version_guard() {
        let mut exec = FakeExecutor::default();
        exec.push_rows(
            &["View", "Create View", "character_set_client", "collation_connection"],
            vec![vec![
                raw(b"v"),
                raw(b"CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `v` AS select 1"),
                raw(b"utf8"),
                raw(b"utf8_general_ci"),
            ]],
        );
        let mut catalog = MySqlCatalog::new(exec, "db".to_string());
        let ddl = catalog.create_view_ddl("v", &DumpOptions::default()).unwrap();
        assert!(ddl.contains("/*!50013 DEFINER=`root`@`localhost` SQL SECURITY DEFINER */"));
        assert!(ddl.contains("/*!50001 VIEW `v` AS select 1 */;"));
    }

    #[test]
    fn create_view_ddl_drops_definer_when_skip_definer() {
        let mut exec = FakeExecutor::default();
        exec.push_rows(
            &["View", "Create View", "character_set_client", "collation_connection"],
            vec![vec![
                raw(b"v"),
                raw(b"CREATE DEFINER=`root`@`localhost` VIEW `v` AS select 1"),
                raw(b"utf8"),
                raw(b"utf8_general_ci"),
            ]],
        );
        let mut catalog = MySqlCatalog::new(exec, "db".to_string());
        let mut opts = DumpOptions::default();
        opts.skip_definer = true;
        let ddl = catalog.create_view_ddl("v", &opts).unwrap();
        assert!(!ddl.contains("DEFINER"));
    }

    #[test]
    fn view_stub_ddl_lists_columns_with_raw_types() {
        let columns = vec![
            ColumnDescriptor::classify("a", "int", ""),
            ColumnDescriptor::classify("b", "varchar(20)", ""),
        ];
        let stub = view_stub_ddl("v", &columns);
        assert!(stub.starts_with("CREATE TABLE IF NOT EXISTS `v`"));
        assert!(stub.contains("`a` int"));
        assert!(stub.contains("`b` varchar(20)"));
    }

    #[test]
    fn backup_and_restore_lines_are_symmetric_pairs() {
        let opts = DumpOptions::default();
        let backup = backup_parameters_lines(&opts);
        let restore = restore_parameters_lines(&opts);
        assert!(backup.iter().any(|l| l.contains("UNIQUE_CHECKS=0")));
        assert!(restore.iter().any(|l| l.contains("UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS")));
    }

    #[test]
    fn skip_tz_utc_omits_time_zone_pin() {
        let mut opts = DumpOptions::default();
        opts.skip_tz_utc = true;
        let backup = backup_parameters_lines(&opts);
        assert!(!backup.iter().any(|l| l.contains("TIME_ZONE")));
    }
}
