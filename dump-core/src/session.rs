use std::collections::HashMap;
use std::sync::Arc;

use dump_common::DumpOptions;
use tracing::Span;

use crate::catalog::{CatalogAdapter, ObjectLists};
use crate::sink::Sink;
use crate::typing::ColumnDescriptor;

/// Owns everything a single `start` invocation touches (§3): the live
/// catalog connection, the sink, the frozen option set, the enumerated
/// object lists, and the per-table column-type cache. Dropped (and its
/// sink closed) when the run ends, whether by completion or abort.
pub struct DumpSession<C> {
    pub catalog: C,
    pub sink: Box<dyn Sink>,
    pub opts: DumpOptions,
    pub database: String,
    /// Used only for the header comment (§4.5 stage 3) — never consulted
    /// for connection logic, the catalog is already connected by the time
    /// a session exists.
    pub host: Option<String>,
    pub objects: ObjectLists,
    column_cache: HashMap<String, Arc<[ColumnDescriptor]>>,
    span: Span,
    rows_written: u64,
    bytes_written: u64,
}

impl<C: CatalogAdapter> DumpSession<C> {
    pub fn new(catalog: C, sink: Box<dyn Sink>, opts: DumpOptions, database: String) -> Self {
        let span = tracing::info_span!("dump_session", database = %database);
        DumpSession {
            catalog,
            sink,
            opts,
            database,
            host: None,
            objects: ObjectLists::default(),
            column_cache: HashMap::new(),
            span,
            rows_written: 0,
            bytes_written: 0,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Columns for `table`, fetched once per session and shared cheaply
    /// thereafter (§3 — "cheaply shareable `Arc<[ColumnDescriptor]>` across
    /// the row-emit loop").
    pub fn columns_of(&mut self, table: &str) -> dump_common::DumpResult<Arc<[ColumnDescriptor]>> {
        if let Some(cached) = self.column_cache.get(table) {
            return Ok(cached.clone());
        }
        let cols: Arc<[ColumnDescriptor]> = self.catalog.columns_of(table)?.into();
        self.column_cache.insert(table.to_string(), cols.clone());
        Ok(cols)
    }

    /// Diagnostic-only counters (§3 note — never consulted for control
    /// flow, only surfaced through `tracing`).
    pub fn record_rows(&mut self, count: u64, bytes: u64) {
        self.rows_written += count;
        self.bytes_written += bytes;
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
