//! Blacklist merge and evaluation.
//!
//! ## Merge
//!
//! The evaluation set is the local rules followed by every remote rule not
//! already present (same pattern and mode). It is derived on demand and never
//! persisted, so it cannot drift from its two sources.
//!
//! ## Evaluation
//!
//! A URL is blacklisted iff any rule matches. There are no allow rules and no
//! priorities. A candidate that does not parse as a URL is reported as not
//! blacklisted (fail open) and logged.

use std::collections::HashSet;

use tracing::{debug, warn};
use url::Url;

use crate::rule::{Rule, RuleMode};

/// Local rules plus the remote rules they do not already contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedRuleSet {
    rules: Vec<Rule>,
}

impl MergedRuleSet {
    /// Merges the two sources. Later duplicates are dropped.
    pub fn merge(local: &[Rule], external: &[Rule]) -> Self {
        let mut seen: HashSet<(&str, RuleMode)> = HashSet::with_capacity(local.len());
        let mut rules = Vec::with_capacity(local.len() + external.len());

        for rule in local {
            seen.insert((rule.pattern.as_str(), rule.mode));
            rules.push(rule.clone());
        }

        for rule in external {
            if seen.insert((rule.pattern.as_str(), rule.mode)) {
                rules.push(rule.clone());
            }
        }

        Self { rules }
    }

    /// Returns the merged rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the number of merged rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rule is present.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the first rule matching `url`, if any.
    ///
    /// Returns `None` for candidates that fail to parse.
    pub fn matching_rule(&self, url: &str) -> Option<&Rule> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Invalid URL in blacklist check: {} ({})", url, e);
                return None;
            }
        };

        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        let found = self.rules.iter().find(|rule| rule.matches(url, &host));

        if let Some(rule) = found {
            debug!("{} matched blacklist entry {}", url, rule);
        }
        found
    }

    /// Checks whether `url` is blacklisted.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.matching_rule(url).is_some()
    }
}

/// Merges local and external rules into one evaluation set.
pub fn merge(local: &[Rule], external: &[Rule]) -> MergedRuleSet {
    MergedRuleSet::merge(local, external)
}

/// Checks `url` against a merged rule set.
pub fn is_blacklisted(url: &str, rules: &MergedRuleSet) -> bool {
    rules.is_blacklisted(url)
}

/// Owns both rule sources and derives the evaluation set from them.
#[derive(Debug, Clone, Default)]
pub struct BlacklistEngine {
    local: Vec<Rule>,
    external: Vec<Rule>,
}

impl BlacklistEngine {
    /// Creates an engine from both sources.
    pub fn new(local: Vec<Rule>, external: Vec<Rule>) -> Self {
        Self { local, external }
    }

    /// Replaces the local rules (after a store mutation).
    pub fn set_local_rules(&mut self, rules: Vec<Rule>) {
        self.local = rules;
    }

    /// Replaces the external rules (once the remote fetch resolves).
    pub fn set_external_rules(&mut self, rules: Vec<Rule>) {
        self.external = rules;
    }

    /// Returns the local rules.
    pub fn local_rules(&self) -> &[Rule] {
        &self.local
    }

    /// Returns the external rules.
    pub fn external_rules(&self) -> &[Rule] {
        &self.external
    }

    /// Derives the current evaluation set.
    pub fn merged(&self) -> MergedRuleSet {
        MergedRuleSet::merge(&self.local, &self.external)
    }

    /// Checks `url` against a fresh snapshot of the evaluation set.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        self.merged().is_blacklisted(url)
    }
}
