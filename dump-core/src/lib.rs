pub mod catalog;
pub mod connect;
pub mod engine;
pub mod hook;
pub mod session;
pub mod sink;
pub mod typing;
pub mod value;

pub use catalog::executor::{LiveExecutor, MysqlExecutor, TextRow};
pub use catalog::mysql_dialect::MySqlCatalog;
pub use catalog::{CatalogAdapter, ObjectLists};
pub use connect::{connect, start};
pub use engine::DumpEngine;
pub use hook::RowHook;
pub use session::DumpSession;
pub use sink::{sink_for, PlainSink, Sink};
pub use typing::ColumnDescriptor;
pub use value::CellValue;

pub use dump_common::{
    Compression, Dialect, Dsn, DumpError, DumpOptions, DumpResult, KeepDataSpec, MatchSet,
    NameList, NoData, Pattern,
};
