use std::collections::HashMap;
use std::str::FromStr;

use crate::error::DumpError;

/// The closed set of dialects a connection string may name. Only `MySql`
/// is implemented by this crate's Catalog Adapter today; the others parse
/// cleanly but are rejected by the dump engine at `start()` (design note
/// 9(a): dispatch on a fixed variant, never a dynamically-looked-up class).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    PgSql,
    DbLib,
    Sqlite,
}

impl FromStr for Dialect {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Dialect::MySql),
            "pgsql" => Ok(Dialect::PgSql),
            "dblib" => Ok(Dialect::DbLib),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(DumpError::Config(format!("unknown dialect: {other}"))),
        }
    }
}

/// A parsed `<dialect>:<k1>=<v1>;<k2>=<v2>;...` connection string.
///
/// Key lookups are case-insensitive; values are preserved verbatim
/// (§6 — "parsing is case-insensitive for keys, preserves values verbatim").
#[derive(Debug, Clone)]
pub struct Dsn {
    pub dialect: Dialect,
    attributes: HashMap<String, String>,
}

impl Dsn {
    /// Parses the connection string and validates presence of the
    /// required attributes for the chosen dialect. Missing dialect,
    /// missing `dbname`, or (for non-sqlite dialects) missing both `host`
    /// and `unix_socket` is a fatal `ConfigError`.
    pub fn parse(raw: &str) -> Result<Self, DumpError> {
        let (dialect_part, rest) = raw
            .split_once(':')
            .ok_or_else(|| DumpError::Config("connection string is missing a dialect".into()))?;
        if dialect_part.is_empty() {
            return Err(DumpError::Config(
                "connection string is missing a dialect".into(),
            ));
        }
        let dialect: Dialect = dialect_part.parse()?;

        let mut attributes = HashMap::new();
        for entry in rest.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                DumpError::Config(format!("malformed connection attribute: {entry}"))
            })?;
            attributes.insert(key.trim().to_ascii_lowercase(), value.to_string());
        }

        let dsn = Dsn { dialect, attributes };

        if dsn.dbname().is_none() {
            return Err(DumpError::Config(
                "connection string is missing dbname".into(),
            ));
        }
        if dialect != Dialect::Sqlite && dsn.host().is_none() && dsn.unix_socket().is_none() {
            return Err(DumpError::Config(
                "connection string is missing host or unix_socket".into(),
            ));
        }

        Ok(dsn)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(&key.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn dbname(&self) -> Option<&str> {
        self.get("dbname")
    }

    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    pub fn unix_socket(&self) -> Option<&str> {
        self.get("unix_socket")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mysql_dsn() {
        let dsn = Dsn::parse("mysql:host=127.0.0.1;dbname=mydb;user=root").unwrap();
        assert_eq!(dsn.dialect, Dialect::MySql);
        assert_eq!(dsn.host(), Some("127.0.0.1"));
        assert_eq!(dsn.dbname(), Some("mydb"));
        assert_eq!(dsn.get("USER"), Some("root"));
    }

    #[test]
    fn sqlite_does_not_require_host() {
        let dsn = Dsn::parse("sqlite:dbname=/tmp/test.db").unwrap();
        assert_eq!(dsn.dialect, Dialect::Sqlite);
        assert!(dsn.host().is_none());
    }

    #[test]
    fn missing_dbname_is_fatal() {
        assert!(Dsn::parse("mysql:host=localhost").is_err());
    }

    #[test]
    fn missing_host_is_fatal_for_mysql() {
        assert!(Dsn::parse("mysql:dbname=mydb").is_err());
    }

    #[test]
    fn unknown_dialect_is_fatal() {
        assert!(Dsn::parse("oracle:host=localhost;dbname=mydb").is_err());
    }
}
