use dump_common::{DumpError, DumpResult, MatchSet, NoData};
use tracing::{info, instrument, warn};

use crate::catalog::CatalogAdapter;
use crate::catalog::mysql_dialect::{backup_parameters_lines, restore_parameters_lines, view_stub_ddl};
use crate::hook::{self, RowHook};
use crate::session::DumpSession;
use crate::typing::ColumnDescriptor;
use crate::value::{encode_cell, quote_string};

/// Orchestrates the staged pipeline (§4.5): connect (already done by the
/// time a session exists) → enumerate → emit schema → emit data → restore.
/// Stateless — every stage reads and mutates the session passed to it.
pub struct DumpEngine;

impl DumpEngine {
    /// Runs a complete dump to conclusion on `session`, consuming it. Any
    /// unexpected server reply or sink write failure aborts immediately;
    /// no partial recovery is attempted (§4.5, §7). The sink is always
    /// given a chance to close, even on an aborted run — §5: "the sink is
    /// closed best-effort" — since `close()` may itself have work to do
    /// (e.g. a footer or checksum a future `Sink` implementation writes),
    /// not merely whatever a `Drop` impl happens to flush.
    #[instrument(skip(session, hook))]
    pub fn run<C: CatalogAdapter>(
        mut session: DumpSession<C>,
        mut hook: Option<RowHook>,
    ) -> DumpResult<()> {
        let _guard = session.span().clone().entered();
        session.sink.open()?;

        let stages_result = Self::run_stages(&mut session, &mut hook);
        let close_result = session.sink.close();

        match stages_result {
            Ok(()) => close_result,
            Err(err) => {
                if let Err(close_err) = close_result {
                    warn!(error = %close_err, "sink close failed while aborting dump after an earlier error");
                }
                Err(err)
            }
        }
    }

    fn run_stages<C: CatalogAdapter>(
        session: &mut DumpSession<C>,
        hook: &mut Option<RowHook>,
    ) -> DumpResult<()> {
        Self::preamble(session)?;
        if session.opts.databases {
            Self::database_wrapper(session)?;
        }

        let (tables, views) = Self::enumerate(session)?;

        if session.opts.single_transaction {
            session.catalog.execute("SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ")?;
            session
                .catalog
                .execute("START TRANSACTION /*!40100 WITH CONSISTENT SNAPSHOT */")?;
        }

        for table in &tables {
            Self::emit_table(session, table, hook.as_mut())?;
        }

        if session.opts.single_transaction {
            session.catalog.execute("COMMIT")?;
        }

        if !session.opts.skip_triggers && !session.opts.no_create_info {
            for trigger in session.objects.triggers.clone() {
                let ddl = session.catalog.create_trigger_ddl(&trigger, &session.opts)?;
                session.sink.write_str(&ddl)?;
            }
        }

        if !session.opts.no_create_info {
            for view in &views {
                let columns = session.columns_of(view)?;
                let stub = view_stub_ddl(view, &columns);
                session.sink.write_str(&stub)?;
            }
            for view in &views {
                session.sink.write_str(&format!("DROP TABLE IF EXISTS `{view}`;\n"))?;
                let ddl = session.catalog.create_view_ddl(view, &session.opts)?;
                session.sink.write_str(&ddl)?;
            }
        }

        if session.opts.routines && !session.opts.no_create_info {
            for procedure in session.objects.procedures.clone() {
                let ddl = session.catalog.create_procedure_ddl(&procedure, &session.opts)?;
                session.sink.write_str(&ddl)?;
            }
        }

        if session.opts.events && !session.opts.no_create_info {
            for event in session.objects.events.clone() {
                let ddl = session.catalog.create_event_ddl(&event, &session.opts)?;
                session.sink.write_str(&ddl)?;
            }
        }

        Self::postamble(session)
    }

    #[instrument(skip(session))]
    fn preamble<C: CatalogAdapter>(session: &mut DumpSession<C>) -> DumpResult<()> {
        if !session.opts.skip_comments {
            let version = session.catalog.server_version()?;
            let host = session.host.clone().unwrap_or_default();
            session
                .sink
                .write_str(&format!("-- Host: {host}    Database: {}\n", session.database))?;
            session.sink.write_str("-- ------------------------------------------------------\n")?;
            session.sink.write_str(&format!("-- Server version\t{version}\n"))?;
        }
        let lines = backup_parameters_lines(&session.opts);
        for line in lines {
            session.sink.write_str(&line)?;
            session.sink.write_str("\n")?;
            session.catalog.execute(line.trim_end_matches(';'))?;
        }
        let init_commands = session.opts.init_commands.clone();
        for command in init_commands {
            session.catalog.execute(&command)?;
        }
        info!("preamble written");
        Ok(())
    }

    #[instrument(skip(session))]
    fn database_wrapper<C: CatalogAdapter>(session: &mut DumpSession<C>) -> DumpResult<()> {
        let charset = session
            .catalog
            .server_variable("character_set_database")?
            .unwrap_or_else(|| "utf8mb4".to_string());
        let collation = session
            .catalog
            .server_variable("collation_database")?
            .unwrap_or_else(|| "utf8mb4_general_ci".to_string());
        if session.opts.add_drop_database {
            session
                .sink
                .write_str(&format!("DROP DATABASE IF EXISTS `{}`;\n", session.database))?;
        }
        session.sink.write_str(&format!(
            "CREATE DATABASE IF NOT EXISTS `{}` /*!40100 DEFAULT CHARACTER SET {} COLLATE {} */;\n",
            session.database, charset, collation
        ))?;
        session.sink.write_str(&format!("USE `{}`;\n", session.database))?;
        Ok(())
    }

    /// Enumerates object names, filters tables/views through their
    /// include/exclude sets (§4.4), and fails with `ConfigError` if any
    /// literal `include-tables`/`include-views` entry went unmatched
    /// (§3, §4.5 stage 6). Triggers/procedures/events have no name
    /// filter — only the enable/disable toggles applied at enumeration.
    #[instrument(skip(session))]
    fn enumerate<C: CatalogAdapter>(
        session: &mut DumpSession<C>,
    ) -> DumpResult<(Vec<String>, Vec<String>)> {
        session.objects.tables = session.catalog.list_tables()?;
        session.objects.views = session.catalog.list_views()?;
        session.objects.triggers = if session.opts.skip_triggers {
            Vec::new()
        } else {
            session.catalog.list_triggers()?
        };
        session.objects.procedures = if session.opts.routines {
            session.catalog.list_procedures()?
        } else {
            Vec::new()
        };
        session.objects.events = if session.opts.events {
            session.catalog.list_events()?
        } else {
            Vec::new()
        };

        let mut table_match = MatchSet::new(
            session.opts.include_tables.clone(),
            session.opts.exclude_tables.clone(),
        );
        let tables: Vec<String> = session
            .objects
            .tables
            .iter()
            .filter(|t| table_match.retain(t))
            .cloned()
            .collect();

        let mut view_match = MatchSet::new(
            session.opts.effective_include_views().clone(),
            session.opts.exclude_tables.clone(),
        );
        let views: Vec<String> = session
            .objects
            .views
            .iter()
            .filter(|v| view_match.retain(v))
            .cloned()
            .collect();

        let mut unresolved: Vec<String> = table_match
            .include
            .unseen_literals()
            .into_iter()
            .chain(view_match.include.unseen_literals())
            .map(str::to_string)
            .collect();
        unresolved.sort();
        unresolved.dedup();
        if !unresolved.is_empty() {
            return Err(DumpError::Config(format!(
                "requested name(s) not found in catalog: {}",
                unresolved.join(", ")
            )));
        }

        info!(
            tables = tables.len(),
            views = views.len(),
            triggers = session.objects.triggers.len(),
            procedures = session.objects.procedures.len(),
            events = session.objects.events.len(),
            "enumeration complete"
        );
        Ok((tables, views))
    }

    #[instrument(skip(session, hook))]
    fn emit_table<C: CatalogAdapter>(
        session: &mut DumpSession<C>,
        table: &str,
        mut hook: Option<&mut RowHook>,
    ) -> DumpResult<()> {
        let columns = session.columns_of(table)?;

        if session.opts.add_drop_table {
            session.sink.write_str(&format!("DROP TABLE IF EXISTS `{table}`;\n"))?;
        }
        if !session.opts.no_create_info {
            let ddl = session.catalog.create_table_ddl(table, &session.opts)?;
            session.sink.write_str(&ddl)?;
        }

        if Self::skips_data(&mut session.opts.no_data, table) {
            return Ok(());
        }

        Self::row_emit_loop(session, table, &columns, hook.as_deref_mut())
    }

    fn skips_data(no_data: &mut NoData, table: &str) -> bool {
        match no_data {
            NoData::None => false,
            NoData::All => true,
            NoData::Tables(list) => list.matches(table),
        }
    }

    #[instrument(skip(session, columns, hook))]
    fn row_emit_loop<C: CatalogAdapter>(
        session: &mut DumpSession<C>,
        table: &str,
        columns: &[ColumnDescriptor],
        mut hook: Option<&mut RowHook>,
    ) -> DumpResult<()> {
        let opts = &session.opts;
        let projected: Vec<&ColumnDescriptor> = columns.iter().filter(|c| !c.is_virtual).collect();
        let has_virtual = projected.len() != columns.len();
        let complete_insert = opts.complete_insert || has_virtual;

        let projection = columns
            .iter()
            .filter(|c| !c.is_virtual)
            .map(|c| {
                if opts.hex_blob && c.is_blob {
                    if c.type_keyword == "bit" {
                        format!("LPAD(HEX(`{}`),2,'0') AS `{}`", c.name, c.name)
                    } else {
                        format!("HEX(`{}`) AS `{}`", c.name, c.name)
                    }
                } else {
                    format!("`{}`", c.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {projection} FROM `{table}`");
        if !opts.where_clause.is_empty() {
            sql.push_str(&format!(" WHERE {}", opts.where_clause));
        } else if let Some(spec) = opts.keep_data.get(table) {
            let rows = spec
                .rows
                .iter()
                .map(|r| quote_string(r.as_bytes()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE `{}` IN ({rows})", spec.column));
        }

        if !opts.skip_comments {
            session.sink.write_str(&format!("--\n-- Dumping data for table `{table}`\n--\n"))?;
        }

        if opts.lock_tables {
            session.catalog.execute(&format!("LOCK TABLES `{table}` READ LOCAL"))?;
        }
        if opts.add_locks {
            session.sink.write_str(&format!("LOCK TABLES `{table}` WRITE;\n"))?;
        }
        if opts.disable_keys {
            session.sink.write_str(&format!("/*!40000 ALTER TABLE `{table}` DISABLE KEYS */;\n"))?;
        }
        if opts.no_autocommit {
            session.sink.write_str("SET autocommit=0;\n")?;
        }

        let insert_verb = if opts.insert_ignore { "INSERT IGNORE" } else { "INSERT" };
        let column_names = if complete_insert {
            format!(
                " ({})",
                projected.iter().map(|c| format!("`{}`", c.name)).collect::<Vec<_>>().join(",")
            )
        } else {
            String::new()
        };

        let mut line_size: usize = 0;
        let mut first_in_batch = true;
        let mut rows_seen: u64 = 0;
        let mut bytes_seen: u64 = 0;

        session.catalog.select_rows(&sql, &mut |row| {
            let mut tuple = String::with_capacity(32);
            tuple.push('(');
            for (i, (value, descriptor)) in row.into_iter().zip(projected.iter().copied()).enumerate() {
                if i > 0 {
                    tuple.push(',');
                }
                let value = hook::apply(hook.as_deref_mut(), table, &descriptor.name, value, &[]);
                tuple.push_str(&encode_cell(&value, descriptor, opts));
            }
            tuple.push(')');

            let chunk = if first_in_batch || !opts.extended_insert {
                let header = format!("{insert_verb} INTO `{table}`{column_names} VALUES {tuple}");
                first_in_batch = false;
                header
            } else {
                format!(",{tuple}")
            };

            session.sink.write_str(&chunk)?;
            line_size += chunk.len();
            rows_seen += 1;
            bytes_seen += chunk.len() as u64;

            if line_size as u64 > opts.net_buffer_length as u64 || !opts.extended_insert {
                session.sink.write_str(";\n")?;
                line_size = 0;
                first_in_batch = true;
            }
            Ok(())
        })?;

        if !first_in_batch {
            session.sink.write_str(";\n")?;
        }
        session.record_rows(rows_seen, bytes_seen);

        if opts.disable_keys {
            session.sink.write_str(&format!("/*!40000 ALTER TABLE `{table}` ENABLE KEYS */;\n"))?;
        }
        if opts.add_locks {
            session.sink.write_str("UNLOCK TABLES;\n")?;
        }
        if opts.lock_tables {
            session.catalog.execute("UNLOCK TABLES")?;
        }
        if opts.no_autocommit {
            session.sink.write_str("COMMIT;\n")?;
        }
        session.sink.write_str("\n")?;

        Ok(())
    }

    #[instrument(skip(session))]
    fn postamble<C: CatalogAdapter>(session: &mut DumpSession<C>) -> DumpResult<()> {
        for line in restore_parameters_lines(&session.opts) {
            session.sink.write_str(&line)?;
            session.sink.write_str("\n")?;
            session.catalog.execute(line.trim_end_matches(';'))?;
        }
        if !session.opts.skip_comments && !session.opts.skip_dump_date {
            session
                .sink
                .write_str(&format!("-- Dump completed on {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")))?;
        }
        info!(rows = session.rows_written(), bytes = session.bytes_written(), "dump complete");
        Ok(())
    }
}
