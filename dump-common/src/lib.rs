pub mod dsn;
pub mod error;
pub mod matcher;
pub mod options;

pub use dsn::{Dialect, Dsn};
pub use error::{DumpError, DumpResult};
pub use matcher::{MatchSet, NameList, Pattern};
pub use options::{Compression, DumpOptions, KeepDataSpec, NoData};
