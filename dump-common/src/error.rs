use thiserror::Error;

/// Error taxonomy for the dump pipeline.
///
/// Every variant maps to one of the categories in the error handling design:
/// bad options or DSN is `Config`, a failed/refused connection is
/// `Connection`, an unexpected catalog reply is `Query`, and a failed sink
/// write or close is `Sink`. There is no retry anywhere in this crate —
/// any of these aborts the run and is handed back to the caller.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("config error: {0}")]
    Config(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("sink error: {0}")]
    Sink(String),
}

pub type DumpResult<T> = Result<T, DumpError>;

impl From<std::io::Error> for DumpError {
    fn from(err: std::io::Error) -> Self {
        DumpError::Sink(err.to_string())
    }
}

impl From<regex::Error> for DumpError {
    fn from(err: regex::Error) -> Self {
        DumpError::Config(format!("invalid pattern: {err}"))
    }
}
