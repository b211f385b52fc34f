pub mod executor;
pub mod mysql_dialect;

use dump_common::{DumpOptions, DumpResult};

use crate::typing::ColumnDescriptor;
use crate::value::CellValue;

/// The four ordered object sequences built during enumeration (§3). Order
/// inside each list is the catalog's natural order — the dump engine
/// never re-sorts it.
#[derive(Debug, Clone, Default)]
pub struct ObjectLists {
    pub tables: Vec<String>,
    pub views: Vec<String>,
    pub triggers: Vec<String>,
    pub procedures: Vec<String>,
    pub events: Vec<String>,
}

/// Translates dump operations into dialect-specific SQL and formats the
/// server's replies into dump text (component B, §4.1). Implementors own
/// nothing about *how* rows get encoded or batched — that is the value
/// encoder's and dump engine's job respectively; the adapter only speaks
/// catalog metadata, DDL text, and raw row data.
pub trait CatalogAdapter {
    fn list_tables(&mut self) -> DumpResult<Vec<String>>;
    fn list_views(&mut self) -> DumpResult<Vec<String>>;
    fn list_triggers(&mut self) -> DumpResult<Vec<String>>;
    fn list_procedures(&mut self) -> DumpResult<Vec<String>>;
    fn list_events(&mut self) -> DumpResult<Vec<String>>;

    fn columns_of(&mut self, table: &str) -> DumpResult<Vec<ColumnDescriptor>>;

    fn create_table_ddl(&mut self, table: &str, opts: &DumpOptions) -> DumpResult<String>;
    fn create_view_ddl(&mut self, view: &str, opts: &DumpOptions) -> DumpResult<String>;
    fn create_trigger_ddl(&mut self, trigger: &str, opts: &DumpOptions) -> DumpResult<String>;
    fn create_procedure_ddl(&mut self, procedure: &str, opts: &DumpOptions) -> DumpResult<String>;
    fn create_event_ddl(&mut self, event: &str, opts: &DumpOptions) -> DumpResult<String>;

    fn server_variable(&mut self, name: &str) -> DumpResult<Option<String>>;
    fn server_version(&mut self) -> DumpResult<String>;

    /// Runs `sql` against the live connection for session bookkeeping
    /// statements (`SET`, `LOCK TABLES`, `START TRANSACTION`, ...). Never
    /// used for anything that produces dump text — the engine builds that
    /// text itself from the same option set.
    fn execute(&mut self, sql: &str) -> DumpResult<()>;

    /// Streams a table's (or arbitrary query's) rows without client-side
    /// buffering (§4.5 stage 1, §4.6).
    fn select_rows(
        &mut self,
        sql: &str,
        visit: &mut dyn FnMut(Vec<CellValue>) -> DumpResult<()>,
    ) -> DumpResult<()>;
}
