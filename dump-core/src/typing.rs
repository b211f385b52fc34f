use once_cell::sync::Lazy;
use std::collections::HashSet;

/// §Glossary — numeric keyword membership. `bit` is deliberately in both
/// this set and [`BLOB_TYPES`]: it is numeric for SQL purposes but the
/// select side projects it through `LPAD(HEX(col),2,'0')` and the value
/// encoder emits it as `0x...` (§4.2).
static NUMERIC_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bit", "tinyint", "smallint", "mediumint", "int", "integer", "bigint", "real", "double",
        "float", "decimal", "numeric",
    ]
    .into_iter()
    .collect()
});

/// §Glossary — BLOB-like keyword membership.
static BLOB_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "tinyblob",
        "blob",
        "mediumblob",
        "longblob",
        "binary",
        "varbinary",
        "bit",
        "geometry",
        "point",
        "linestring",
        "polygon",
        "multipoint",
        "multilinestring",
        "multipolygon",
        "geometrycollection",
    ]
    .into_iter()
    .collect()
});

/// Per-`(table, column)` classification (§3). An unrecognized keyword is
/// not itself an error (§7 `EncodingError` note) — it simply classifies as
/// neither numeric nor BLOB, i.e. a quoted string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Lowercase keyword, e.g. `varchar` out of `varchar(255)`.
    pub type_keyword: String,
    /// The original type expression exactly as the catalog reported it,
    /// e.g. `varchar(255)`. Used verbatim when building a view's stand-in
    /// column list (§4.5).
    pub raw_sql: String,
    pub is_numeric: bool,
    pub is_blob: bool,
    pub is_virtual: bool,
}

impl ColumnDescriptor {
    /// `raw_sql` is the `Type` field from `SHOW COLUMNS`, `extra` is the
    /// `Extra` field (carries `VIRTUAL GENERATED` / `STORED GENERATED`
    /// for generated columns).
    pub fn classify(name: impl Into<String>, raw_sql: impl Into<String>, extra: &str) -> Self {
        let raw_sql = raw_sql.into();
        let keyword = raw_sql
            .split('(')
            .next()
            .unwrap_or(&raw_sql)
            .trim()
            .to_ascii_lowercase();
        // keep only the leading keyword, drop trailing attributes like
        // "unsigned" that can follow without parens, e.g. "int unsigned"
        let keyword = keyword
            .split_whitespace()
            .next()
            .unwrap_or(&keyword)
            .to_string();

        let is_numeric = NUMERIC_TYPES.contains(keyword.as_str());
        let is_blob = BLOB_TYPES.contains(keyword.as_str());
        let is_virtual = extra.contains("VIRTUAL GENERATED") || extra.contains("STORED GENERATED");

        ColumnDescriptor {
            name: name.into(),
            type_keyword: keyword,
            raw_sql,
            is_numeric,
            is_blob,
            is_virtual,
        }
    }
}
