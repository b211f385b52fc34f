use std::collections::HashSet;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::DumpError;

/// One entry of an include/exclude list. An entry starting with `/` is a
/// regex (delimited by the matching trailing `/`); anything else is matched
/// by exact equality.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self, DumpError> {
        if let Some(body) = raw.strip_prefix('/') {
            let body = body.strip_suffix('/').unwrap_or(body);
            let re = Regex::new(body)?;
            Ok(Pattern::Regex(re))
        } else {
            Ok(Pattern::Literal(raw.to_string()))
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Literal(lit) => lit == name,
            Pattern::Regex(re) => re.is_match(name),
        }
    }
}

/// `regex::Regex` has no `Serialize` impl (and this crate does not pull
/// in the `regex` crate's own `serde` feature just for this one spot) —
/// written back out through the same leading-`/` convention it was parsed
/// from (§9 design note), using `Regex::as_str()` to recover the source
/// pattern.
impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Pattern::Literal(lit) => serializer.serialize_str(lit),
            Pattern::Regex(re) => serializer.serialize_str(&format!("/{}/", re.as_str())),
        }
    }
}

/// An ordered set of patterns plus bookkeeping of which literal names have
/// been seen during enumeration. Used both for `include-tables` (where an
/// unseen literal after enumeration is a fatal error, §3) and for
/// `exclude-tables` (where no such bookkeeping matters).
#[derive(Debug, Clone, Default)]
pub struct NameList {
    patterns: Vec<Pattern>,
    seen_literals: HashSet<String>,
}

/// Serializes as the pattern list alone — `seen_literals` is per-run
/// enumeration bookkeeping, not part of the configuration surface a
/// caller would render or diff (SPEC_FULL §4.9).
impl Serialize for NameList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.patterns.serialize(serializer)
    }
}

impl NameList {
    pub fn empty() -> Self {
        NameList::default()
    }

    pub fn parse<I, S>(raw: I) -> Result<Self, DumpError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = raw
            .into_iter()
            .map(|s| Pattern::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NameList {
            patterns,
            seen_literals: HashSet::new(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True iff any regex matches, or literal membership holds (§4.4).
    /// Marks a matched literal as seen so `unseen_literals` can report
    /// include-list entries that never showed up in the catalog.
    pub fn matches(&mut self, name: &str) -> bool {
        let mut matched = false;
        for pattern in &self.patterns {
            match pattern {
                Pattern::Literal(lit) => {
                    if lit == name {
                        matched = true;
                        self.seen_literals.insert(lit.clone());
                    }
                }
                Pattern::Regex(re) => {
                    if re.is_match(name) {
                        matched = true;
                    }
                }
            }
        }
        matched
    }

    /// Literal entries that never matched a catalog name. A non-empty
    /// result after enumeration is a fatal error for `include-tables`
    /// (and `include-views`) per §3.
    pub fn unseen_literals(&self) -> Vec<&str> {
        self.patterns
            .iter()
            .filter_map(|p| match p {
                Pattern::Literal(lit) if !self.seen_literals.contains(lit) => Some(lit.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Combines an include list with an exclude list. Exclusion always wins
/// (§4.4): a name present in `exclude` is skipped unconditionally, even if
/// it would also satisfy `include`.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    pub include: NameList,
    pub exclude: NameList,
}

impl MatchSet {
    pub fn new(include: NameList, exclude: NameList) -> Self {
        MatchSet { include, exclude }
    }

    /// Whether `name` should be retained in the dump.
    pub fn retain(&mut self, name: &str) -> bool {
        if self.exclude.matches(name) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        self.include.matches(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_exact_match_only() {
        let mut list = NameList::parse(["users", "orders"]).unwrap();
        assert!(list.matches("users"));
        assert!(!list.matches("users2"));
        assert!(list.unseen_literals().contains(&"orders"));
    }

    #[test]
    fn regex_entry_matches_by_pattern() {
        let mut list = NameList::parse(["/^tmp_/"]).unwrap();
        assert!(list.matches("tmp_staging"));
        assert!(!list.matches("staging_tmp"));
        assert!(list.unseen_literals().is_empty());
    }

    #[test]
    fn serializes_as_the_original_pattern_strings() {
        let list = NameList::parse(["users", "/^tmp_/"]).unwrap();
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!(["users", "/^tmp_/"]));
    }

    #[test]
    fn exclude_wins_over_include() {
        let include = NameList::parse(["users"]).unwrap();
        let exclude = NameList::parse(["users"]).unwrap();
        let mut set = MatchSet::new(include, exclude);
        assert!(!set.retain("users"));
    }

    #[test]
    fn empty_include_retains_everything_not_excluded() {
        let mut set = MatchSet::new(NameList::empty(), NameList::parse(["secrets"]).unwrap());
        assert!(set.retain("users"));
        assert!(!set.retain("secrets"));
    }

    #[test]
    fn unresolved_include_entry_is_reported() {
        let mut list = NameList::parse(["users", "orders"]).unwrap();
        list.matches("users");
        assert_eq!(list.unseen_literals(), vec!["orders"]);
    }
}
