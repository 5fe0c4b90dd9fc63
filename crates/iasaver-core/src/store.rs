//! User-editable blacklist storage.
//!
//! The local blacklist is persisted as one JSON array under
//! [`BLACKLIST_KEY`]. Older installs stored a plain array of domain strings;
//! [`RuleStore::load`] upgrades that shape to `{pattern, mode: "domain"}`
//! objects and writes the upgraded form back immediately.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{BlacklistError, Result};
use crate::kv::{KeyValueStore, PersistenceError};
use crate::rule::{parse_rule_payload, validate_rules, Rule};

/// Persistence key of the local blacklist.
pub const BLACKLIST_KEY: &str = "ia_saver_blacklist";

/// Default file name for exported blacklists.
pub const EXPORT_FILE_NAME: &str = "ia_saver_blacklist.json";

/// One persisted entry, in either the legacy or the current shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(String),
    Current(Rule),
}

/// Owner of the local rule list and its persisted form.
///
/// Every mutation writes the full list first and only then swaps the
/// in-memory copy, so a failed write leaves both unchanged.
pub struct RuleStore {
    kv: Arc<dyn KeyValueStore>,
    rules: Vec<Rule>,
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("rules", &self.rules)
            .finish()
    }
}

impl RuleStore {
    /// Opens the store and loads the persisted rules.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let mut store = Self {
            kv,
            rules: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    /// Reloads the rules from persistence, upgrading the legacy shape.
    pub fn load(&mut self) -> Result<&[Rule]> {
        let value = self.kv.get_value(BLACKLIST_KEY)?;

        let entries: Vec<StoredEntry> = match value {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                PersistenceError(format!("stored blacklist is unreadable: {e}"))
            })?,
        };

        let mut upgraded = 0usize;
        let rules: Vec<Rule> = entries
            .into_iter()
            .map(|entry| match entry {
                StoredEntry::Legacy(pattern) => {
                    upgraded += 1;
                    Rule::domain(pattern)
                }
                StoredEntry::Current(rule) => rule,
            })
            .collect();

        if upgraded > 0 {
            self.persist(&rules)?;
            info!("Upgraded {} legacy blacklist entries to domain rules", upgraded);
        }

        debug!("Loaded {} local blacklist entries", rules.len());
        self.rules = rules;
        Ok(&self.rules)
    }

    /// Returns the current rules.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the store holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends a validated rule that is not already present.
    pub fn add(&mut self, rule: Rule) -> Result<()> {
        if let Err(e) = rule.validate() {
            warn!("Rejected blacklist entry {}: {}", rule, e);
            return Err(e);
        }

        if self.rules.contains(&rule) {
            return Err(BlacklistError::DuplicateRule {
                pattern: rule.pattern,
                mode: rule.mode,
            });
        }

        let mut rules = self.rules.clone();
        rules.push(rule);
        self.persist(&rules)?;
        self.rules = rules;
        Ok(())
    }

    /// Removes and returns the rule at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Rule> {
        if index >= self.rules.len() {
            return Err(BlacklistError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            });
        }

        let mut rules = self.rules.clone();
        let removed = rules.remove(index);
        self.persist(&rules)?;
        self.rules = rules;
        Ok(removed)
    }

    /// Replaces the whole list, all or nothing.
    ///
    /// Every rule must pass its mode validation and the list must not contain
    /// the same entry twice. On failure the store is left untouched.
    pub fn replace_all(&mut self, rules: Vec<Rule>) -> Result<()> {
        if let Err(e) = validate_rules(&rules).and_then(|()| check_unique(&rules)) {
            warn!("Rejected blacklist replacement: {}", e);
            return Err(e);
        }

        self.persist(&rules)?;
        info!("Replaced local blacklist with {} entries", rules.len());
        self.rules = rules;
        Ok(())
    }

    /// Imports a JSON rule payload, replacing the current list.
    ///
    /// Returns the number of imported rules.
    pub fn import_json(&mut self, payload: &str) -> Result<usize> {
        let rules = parse_rule_payload(payload).inspect_err(|e| {
            warn!("Rejected blacklist import: {}", e);
        })?;
        let count = rules.len();
        self.replace_all(rules)?;
        Ok(count)
    }

    /// Serializes the current list for export (pretty JSON, two-space indent).
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.rules)
            .map_err(|e| BlacklistError::Persistence(e.into()))
    }

    fn persist(&self, rules: &[Rule]) -> Result<()> {
        let value = serde_json::to_value(rules).map_err(PersistenceError::from)?;
        self.kv.set_value(BLACKLIST_KEY, &value)?;
        Ok(())
    }
}

fn check_unique(rules: &[Rule]) -> Result<()> {
    let mut seen = HashSet::with_capacity(rules.len());
    for rule in rules {
        if !seen.insert(rule) {
            return Err(BlacklistError::Validation(format!(
                "Invalid blacklist data format: duplicate entry {rule}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use crate::rule::RuleMode;
    use serde_json::json;

    fn setup() -> (Arc<dyn KeyValueStore>, RuleStore) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = RuleStore::open(kv.clone()).unwrap();
        (kv, store)
    }

    #[test]
    fn empty_on_first_use() {
        let (kv, store) = setup();
        assert!(store.is_empty());
        assert!(kv.get_value(BLACKLIST_KEY).unwrap().is_none());
    }

    #[test]
    fn add_then_load() {
        let (kv, mut store) = setup();
        store.add(Rule::domain("example.com")).unwrap();

        let reopened = RuleStore::open(kv).unwrap();
        assert_eq!(reopened.rules(), &[Rule::domain("example.com")]);
    }

    #[test]
    fn add_duplicate_rejected() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("example.com")).unwrap();

        let err = store.add(Rule::domain("example.com")).unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::DuplicateRule { ref pattern, mode: RuleMode::Domain } if pattern == "example.com"
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_pattern_different_mode_is_distinct() {
        let (_kv, mut store) = setup();
        store.add(Rule::prefix("https://a.com/*")).unwrap();
        store.add(Rule::exact("https://a.com/")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_invalid_rejected() {
        let (kv, mut store) = setup();
        let err = store.add(Rule::prefix("https://a.com/no-star")).unwrap_err();
        assert!(matches!(err, BlacklistError::Validation(_)));
        assert!(store.is_empty());
        assert!(kv.get_value(BLACKLIST_KEY).unwrap().is_none());
    }

    #[test]
    fn remove() {
        let (kv, mut store) = setup();
        store.add(Rule::domain("a.com")).unwrap();
        store.add(Rule::domain("b.com")).unwrap();

        let removed = store.remove(0).unwrap();
        assert_eq!(removed, Rule::domain("a.com"));
        assert_eq!(store.rules(), &[Rule::domain("b.com")]);
        assert_eq!(
            kv.get_value(BLACKLIST_KEY).unwrap(),
            Some(json!([{"pattern": "b.com", "mode": "domain"}]))
        );
    }

    #[test]
    fn remove_out_of_range() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("a.com")).unwrap();

        let err = store.remove(1).unwrap_err();
        assert!(matches!(
            err,
            BlacklistError::IndexOutOfRange { index: 1, len: 1 }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn legacy_upgrade() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        kv.set_value(BLACKLIST_KEY, &json!(["a.com", "b.com"])).unwrap();

        let store = RuleStore::open(kv.clone()).unwrap();
        assert_eq!(
            store.rules(),
            &[Rule::domain("a.com"), Rule::domain("b.com")]
        );

        // The upgraded form replaced the legacy one in storage
        assert_eq!(
            kv.get_value(BLACKLIST_KEY).unwrap(),
            Some(json!([
                {"pattern": "a.com", "mode": "domain"},
                {"pattern": "b.com", "mode": "domain"}
            ]))
        );

        let reloaded = RuleStore::open(kv).unwrap();
        assert_eq!(reloaded.rules(), store.rules());
    }

    #[test]
    fn unreadable_store_is_an_error() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        kv.set_value(BLACKLIST_KEY, &json!({"not": "a list"})).unwrap();

        let err = RuleStore::open(kv).unwrap_err();
        assert!(matches!(err, BlacklistError::Persistence(_)));
    }

    #[test]
    fn replace_all() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("old.com")).unwrap();

        store
            .replace_all(vec![Rule::domain("new.com"), Rule::exact("https://x.com/a")])
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.rules()[0], Rule::domain("new.com"));
    }

    #[test]
    fn replace_all_rejects_duplicates() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("old.com")).unwrap();

        let result = store.replace_all(vec![Rule::domain("a.com"), Rule::domain("a.com")]);
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
        assert_eq!(store.rules(), &[Rule::domain("old.com")]);
    }

    #[test]
    fn import_invalid_mode_leaves_store_unchanged() {
        let (kv, mut store) = setup();
        store.add(Rule::domain("keep.com")).unwrap();
        let before = kv.get_value(BLACKLIST_KEY).unwrap();

        let result = store.import_json(
            r#"[{"pattern":"a.com","mode":"domain"},{"pattern":"b.com","mode":"wildcard"}]"#,
        );
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
        assert_eq!(store.rules(), &[Rule::domain("keep.com")]);
        assert_eq!(kv.get_value(BLACKLIST_KEY).unwrap(), before);
    }

    #[test]
    fn import_invalid_shape_leaves_store_unchanged() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("keep.com")).unwrap();

        let result = store.import_json(r#"[{"pattern":"https://a.com/x*","mode":"exact"}]"#);
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
        assert_eq!(store.rules(), &[Rule::domain("keep.com")]);
    }

    #[test]
    fn export_import_roundtrip() {
        let (_kv, mut store) = setup();
        store.add(Rule::domain("a.com")).unwrap();
        store.add(Rule::prefix("https://b.com/search*")).unwrap();

        let exported = store.export_json().unwrap();
        assert!(exported.contains("\n  {"));

        let (_kv2, mut other) = setup();
        assert_eq!(other.import_json(&exported).unwrap(), 2);
        assert_eq!(other.rules(), store.rules());
    }
}
