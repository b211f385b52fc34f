use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::DumpError;
use crate::matcher::NameList;

/// Sink variant. `None` is the only codec this crate mandates (§6); an
/// embedder wiring in gzip/zstd layers it on top of the `Sink` trait
/// instead of extending this enum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum Compression {
    #[default]
    None,
}

/// `no-data`: either a blanket boolean or a list of table-name patterns to
/// skip. Design note 9(a): a bare `true` always wins over table-level
/// membership, even for tables that are not excluded elsewhere.
#[derive(Debug, Clone, Default, Serialize)]
pub enum NoData {
    #[default]
    None,
    All,
    Tables(NameList),
}

/// One `keep-data` restriction: `WHERE col IN (rows)` appended to a
/// table's row select.
#[derive(Debug, Clone, Serialize)]
pub struct KeepDataSpec {
    pub column: String,
    pub rows: Vec<String>,
}

/// The frozen option set for one dump session (§3, §6). Constructed either
/// directly (the normal path for a Rust caller) or via [`DumpOptions::from_entries`]
/// for callers holding a dynamic key/value bag (e.g. a config layer merging
/// CLI flags with a file) — that path rejects unknown keys at construction
/// time, per design note 2.
///
/// `Serialize` (SPEC_FULL §4.9) renders each field under the key name
/// §6's option table documents, so a caller embedding this crate can
/// render or diff the frozen option set without reinventing that table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DumpOptions {
    pub include_tables: NameList,
    pub exclude_tables: NameList,
    /// Seeded from `include_tables` when not given explicitly (design note 9c).
    pub include_views: Option<NameList>,

    #[serde(rename = "no-data")]
    pub no_data: NoData,
    #[serde(rename = "keep-data")]
    pub keep_data: HashMap<String, KeepDataSpec>,
    #[serde(rename = "where")]
    pub where_clause: String,

    pub compress: Compression,
    pub default_character_set: String,
    /// §6 spells this with an underscore, unlike its kebab-case siblings.
    #[serde(rename = "init_commands")]
    pub init_commands: Vec<String>,

    pub reset_auto_increment: bool,
    pub add_drop_database: bool,
    pub add_drop_table: bool,
    pub add_drop_trigger: bool,
    pub add_locks: bool,
    pub lock_tables: bool,
    pub complete_insert: bool,
    pub databases: bool,
    pub disable_keys: bool,
    pub extended_insert: bool,
    pub events: bool,
    pub hex_blob: bool,
    pub insert_ignore: bool,
    /// §6 spells this with an underscore, unlike its kebab-case siblings.
    #[serde(rename = "net_buffer_length")]
    pub net_buffer_length: usize,
    pub no_autocommit: bool,
    pub no_create_info: bool,
    pub routines: bool,
    pub single_transaction: bool,
    pub skip_triggers: bool,
    pub skip_tz_utc: bool,
    pub skip_comments: bool,
    pub skip_dump_date: bool,
    pub skip_definer: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        DumpOptions {
            include_tables: NameList::empty(),
            exclude_tables: NameList::empty(),
            include_views: None,

            no_data: NoData::None,
            keep_data: HashMap::new(),
            where_clause: String::new(),

            compress: Compression::None,
            default_character_set: "utf8".to_string(),
            init_commands: Vec::new(),

            reset_auto_increment: false,
            add_drop_database: false,
            add_drop_table: false,
            add_drop_trigger: true,
            add_locks: true,
            lock_tables: true,
            complete_insert: false,
            databases: false,
            disable_keys: true,
            extended_insert: true,
            events: false,
            hex_blob: true,
            insert_ignore: false,
            net_buffer_length: 1_000_000,
            no_autocommit: true,
            no_create_info: false,
            routines: false,
            single_transaction: true,
            skip_triggers: false,
            skip_tz_utc: false,
            skip_comments: false,
            skip_dump_date: false,
            skip_definer: false,
        }
    }
}

impl DumpOptions {
    /// The filter applied to views: `include_views` if set, else
    /// `include_tables` (design note 9c — `exclude_tables` is reused for
    /// views unconditionally, there is no separate `exclude_views`).
    pub fn effective_include_views(&self) -> &NameList {
        self.include_views.as_ref().unwrap_or(&self.include_tables)
    }

    pub fn skips_all_data(&self) -> bool {
        matches!(self.no_data, NoData::All)
    }

    /// Builds a validated option set from a dynamic key/value bag,
    /// rejecting any key this crate does not recognize (§3 — "Unknown
    /// keys are rejected at construction time").
    pub fn from_entries(entries: HashMap<String, Value>) -> Result<Self, DumpError> {
        let mut opts = DumpOptions::default();

        for (key, value) in entries {
            match key.as_str() {
                "include-tables" => opts.include_tables = parse_name_list(&value)?,
                "exclude-tables" => opts.exclude_tables = parse_name_list(&value)?,
                "include-views" => opts.include_views = Some(parse_name_list(&value)?),
                "no-data" => opts.no_data = parse_no_data(&value)?,
                "keep-data" => opts.keep_data = parse_keep_data(&value)?,
                "where" => opts.where_clause = expect_string(&value, "where")?,
                "compress" => {
                    let s = expect_string(&value, "compress")?;
                    if s.eq_ignore_ascii_case("none") {
                        opts.compress = Compression::None;
                    } else {
                        return Err(DumpError::Config(format!(
                            "unsupported compress variant: {s}"
                        )));
                    }
                }
                "default-character-set" => {
                    opts.default_character_set = expect_string(&value, "default-character-set")?
                }
                "init_commands" => opts.init_commands = parse_string_list(&value)?,
                "reset-auto-increment" => opts.reset_auto_increment = expect_bool(&value, key.as_str())?,
                "add-drop-database" => opts.add_drop_database = expect_bool(&value, key.as_str())?,
                "add-drop-table" => opts.add_drop_table = expect_bool(&value, key.as_str())?,
                "add-drop-trigger" => opts.add_drop_trigger = expect_bool(&value, key.as_str())?,
                "add-locks" => opts.add_locks = expect_bool(&value, key.as_str())?,
                "lock-tables" => opts.lock_tables = expect_bool(&value, key.as_str())?,
                "complete-insert" => opts.complete_insert = expect_bool(&value, key.as_str())?,
                "databases" => opts.databases = expect_bool(&value, key.as_str())?,
                "disable-keys" => opts.disable_keys = expect_bool(&value, key.as_str())?,
                "extended-insert" => opts.extended_insert = expect_bool(&value, key.as_str())?,
                "events" => opts.events = expect_bool(&value, key.as_str())?,
                "hex-blob" => opts.hex_blob = expect_bool(&value, key.as_str())?,
                "insert-ignore" => opts.insert_ignore = expect_bool(&value, key.as_str())?,
                "net_buffer_length" => {
                    opts.net_buffer_length = expect_u64(&value, key.as_str())? as usize
                }
                "no-autocommit" => opts.no_autocommit = expect_bool(&value, key.as_str())?,
                "no-create-info" => opts.no_create_info = expect_bool(&value, key.as_str())?,
                "routines" => opts.routines = expect_bool(&value, key.as_str())?,
                "single-transaction" => opts.single_transaction = expect_bool(&value, key.as_str())?,
                "skip-triggers" => opts.skip_triggers = expect_bool(&value, key.as_str())?,
                "skip-tz-utc" => opts.skip_tz_utc = expect_bool(&value, key.as_str())?,
                "skip-comments" => opts.skip_comments = expect_bool(&value, key.as_str())?,
                "skip-dump-date" => opts.skip_dump_date = expect_bool(&value, key.as_str())?,
                "skip-definer" => opts.skip_definer = expect_bool(&value, key.as_str())?,
                unknown => {
                    return Err(DumpError::Config(format!("unknown option: {unknown}")))
                }
            }
        }

        Ok(opts)
    }
}

fn expect_bool(value: &Value, key: &str) -> Result<bool, DumpError> {
    value
        .as_bool()
        .ok_or_else(|| DumpError::Config(format!("option {key} must be a boolean")))
}

fn expect_string(value: &Value, key: &str) -> Result<String, DumpError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| DumpError::Config(format!("option {key} must be a string")))
}

fn expect_u64(value: &Value, key: &str) -> Result<u64, DumpError> {
    value
        .as_u64()
        .ok_or_else(|| DumpError::Config(format!("option {key} must be a non-negative integer")))
}

fn parse_string_list(value: &Value) -> Result<Vec<String>, DumpError> {
    value
        .as_array()
        .ok_or_else(|| DumpError::Config("expected an array of strings".into()))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| DumpError::Config("expected an array of strings".into()))
        })
        .collect()
}

fn parse_name_list(value: &Value) -> Result<NameList, DumpError> {
    NameList::parse(parse_string_list(value)?)
}

fn parse_no_data(value: &Value) -> Result<NoData, DumpError> {
    if let Some(b) = value.as_bool() {
        return Ok(if b { NoData::All } else { NoData::None });
    }
    Ok(NoData::Tables(parse_name_list(value)?))
}

fn parse_keep_data(value: &Value) -> Result<HashMap<String, KeepDataSpec>, DumpError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DumpError::Config("keep-data must be an object".into()))?;
    let mut out = HashMap::with_capacity(obj.len());
    for (table, spec) in obj {
        let spec_obj = spec
            .as_object()
            .ok_or_else(|| DumpError::Config(format!("keep-data.{table} must be an object")))?;
        let column = spec_obj
            .get("col")
            .and_then(Value::as_str)
            .ok_or_else(|| DumpError::Config(format!("keep-data.{table}.col is required")))?
            .to_string();
        let rows = spec_obj
            .get("rows")
            .map(parse_string_list)
            .transpose()?
            .unwrap_or_default();
        out.insert(table.clone(), KeepDataSpec { column, rows });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_spec_table() {
        let opts = DumpOptions::default();
        assert!(opts.add_locks);
        assert!(opts.lock_tables);
        assert!(opts.disable_keys);
        assert!(opts.extended_insert);
        assert!(opts.hex_blob);
        assert!(opts.single_transaction);
        assert!(opts.no_autocommit);
        assert!(opts.add_drop_trigger);
        assert!(!opts.add_drop_table);
        assert!(!opts.databases);
        assert_eq!(opts.net_buffer_length, 1_000_000);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut entries = HashMap::new();
        entries.insert("bogus-option".to_string(), json!(true));
        assert!(DumpOptions::from_entries(entries).is_err());
    }

    #[test]
    fn include_views_falls_back_to_include_tables() {
        let mut entries = HashMap::new();
        entries.insert("include-tables".to_string(), json!(["users"]));
        let opts = DumpOptions::from_entries(entries).unwrap();
        let mut views = opts.effective_include_views().clone();
        assert!(views.matches("users"));
    }

    #[test]
    fn keep_data_parses_column_and_rows() {
        let mut entries = HashMap::new();
        entries.insert(
            "keep-data".to_string(),
            json!({ "users": { "col": "id", "rows": ["1", "2"] } }),
        );
        let opts = DumpOptions::from_entries(entries).unwrap();
        let spec = opts.keep_data.get("users").unwrap();
        assert_eq!(spec.column, "id");
        assert_eq!(spec.rows, vec!["1", "2"]);
    }

    #[test]
    fn serializes_under_the_spec_table_key_names() {
        let value = serde_json::to_value(DumpOptions::default()).unwrap();
        assert_eq!(value["where"], json!(""));
        assert_eq!(value["net_buffer_length"], json!(1_000_000));
        assert_eq!(value["init_commands"], json!([]));
        assert_eq!(value["default-character-set"], json!("utf8"));
        assert_eq!(value["single-transaction"], json!(true));
        assert!(value.get("net-buffer-length").is_none());
    }
}
