//! Blacklist combining the local store with the remote list.
//!
//! Store mutations are mirrored into the engine right away, so a rule added
//! or removed during a session takes effect on the next check.

use std::sync::Arc;

use tracing::info;

use crate::engine::{BlacklistEngine, MergedRuleSet};
use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::remote::{RemoteRuleFetch, RemoteRules};
use crate::rule::Rule;
use crate::store::RuleStore;

/// Local store plus evaluation engine.
#[derive(Debug)]
pub struct Blacklist {
    store: RuleStore,
    engine: BlacklistEngine,
}

impl Blacklist {
    /// Loads the local rules; the external list starts empty.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let store = RuleStore::open(kv)?;
        let engine = BlacklistEngine::new(store.rules().to_vec(), Vec::new());
        Ok(Self { store, engine })
    }

    /// Fetches the remote list and installs it. Failures install nothing.
    pub async fn refresh_external(&mut self, fetch: &RemoteRuleFetch) -> RemoteRules {
        let outcome = fetch.fetch_outcome().await;
        self.engine.set_external_rules(outcome.clone().into_rules());
        outcome
    }

    /// Local rules in insertion order.
    pub fn local_rules(&self) -> &[Rule] {
        self.store.rules()
    }

    /// External rules from the last refresh.
    pub fn external_rules(&self) -> &[Rule] {
        self.engine.external_rules()
    }

    /// Adds a local rule.
    pub fn add(&mut self, rule: Rule) -> Result<()> {
        info!("Adding blacklist entry {}", rule);
        self.store.add(rule)?;
        self.sync_local();
        Ok(())
    }

    /// Removes the local rule at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Rule> {
        let removed = self.store.remove(index)?;
        info!("Removed blacklist entry {}", removed);
        self.sync_local();
        Ok(removed)
    }

    /// Replaces all local rules.
    pub fn replace_all(&mut self, rules: Vec<Rule>) -> Result<()> {
        self.store.replace_all(rules)?;
        self.sync_local();
        Ok(())
    }

    /// Imports a JSON payload as the new local list.
    pub fn import_json(&mut self, payload: &str) -> Result<usize> {
        let count = self.store.import_json(payload)?;
        self.sync_local();
        Ok(count)
    }

    /// Exports the local list as pretty JSON.
    pub fn export_json(&self) -> Result<String> {
        self.store.export_json()
    }

    /// Current evaluation set.
    pub fn merged(&self) -> MergedRuleSet {
        self.engine.merged()
    }

    /// Checks `url` against the current evaluation set.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.engine.is_blacklisted(url)
    }

    fn sync_local(&mut self) {
        self.engine.set_local_rules(self.store.rules().to_vec());
    }
}
