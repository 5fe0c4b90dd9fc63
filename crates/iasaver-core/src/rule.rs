//! Blacklist rules.
//!
//! A [`Rule`] pairs a pattern with a [`RuleMode`]. Two rules are the same
//! entry iff both the pattern (case-sensitive, as stored) and the mode are
//! equal, which is exactly the derived `PartialEq`.
//!
//! Rule lists coming from outside (remote list, import file) go through
//! [`parse_rule_payload`], the single deserialization boundary. Locally added
//! rules additionally go through [`Rule::validate`].

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BlacklistError, Result};

/// Matching strategy applied to a rule's pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Blocks the domain and all of its subdomains.
    Domain,
    /// Blocks every URL starting with the pattern (minus a trailing `*`).
    Prefix,
    /// Blocks only the literal URL.
    Exact,
}

impl RuleMode {
    /// All modes, in the order a settings surface lists them.
    pub const ALL: [RuleMode; 3] = [RuleMode::Domain, RuleMode::Prefix, RuleMode::Exact];

    /// Returns the mode name as stored and exported.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleMode::Domain => "domain",
            RuleMode::Prefix => "prefix",
            RuleMode::Exact => "exact",
        }
    }

    /// Parses a mode from its stored name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "domain" => Some(RuleMode::Domain),
            "prefix" => Some(RuleMode::Prefix),
            "exact" => Some(RuleMode::Exact),
            _ => None,
        }
    }

    /// Returns the input hint shown when a pattern is rejected.
    pub fn hint(&self) -> &'static str {
        match self {
            RuleMode::Domain => "Enter a valid domain (e.g. example.com)",
            RuleMode::Prefix => {
                "Enter a valid URL that starts with http(s) and ends with * (e.g. https://example.com/path*)"
            }
            RuleMode::Exact => "Enter a valid full URL without * (e.g. https://example.com/page)",
        }
    }
}

impl fmt::Display for RuleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single blacklist entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    /// Pattern whose shape depends on `mode`.
    pub pattern: String,
    /// How the pattern is matched against a URL.
    pub mode: RuleMode,
}

impl Rule {
    /// Creates a new rule without validating it.
    pub fn new(pattern: impl Into<String>, mode: RuleMode) -> Self {
        Self {
            pattern: pattern.into(),
            mode,
        }
    }

    /// Creates a domain rule.
    pub fn domain(pattern: impl Into<String>) -> Self {
        Self::new(pattern, RuleMode::Domain)
    }

    /// Creates a prefix rule.
    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self::new(pattern, RuleMode::Prefix)
    }

    /// Creates an exact rule.
    pub fn exact(pattern: impl Into<String>) -> Self {
        Self::new(pattern, RuleMode::Exact)
    }

    /// Checks that the pattern has the shape its mode requires.
    ///
    /// - `domain`: ASCII letters, digits, `.` and `-` only
    /// - `prefix`: `http://` or `https://` scheme, trailing `*`
    /// - `exact`: absolute URL without any `*`
    pub fn validate(&self) -> Result<()> {
        let valid = !self.pattern.is_empty()
            && match self.mode {
                RuleMode::Domain => self
                    .pattern
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'),
                RuleMode::Prefix => {
                    (self.pattern.starts_with("http://") || self.pattern.starts_with("https://"))
                        && self.pattern.ends_with('*')
                }
                RuleMode::Exact => {
                    !self.pattern.contains('*') && Url::parse(&self.pattern).is_ok()
                }
            };

        if valid {
            Ok(())
        } else {
            Err(BlacklistError::Validation(format!(
                "Invalid input \"{}\" for mode \"{}\". {}",
                self.pattern,
                self.mode,
                self.mode.hint()
            )))
        }
    }

    /// Checks whether a candidate URL matches this rule.
    ///
    /// `host` is the candidate's lower-cased hostname (empty when the URL has
    /// none). Only domain rules look at it; the other modes compare the raw
    /// URL string without normalization.
    pub fn matches(&self, url: &str, host: &str) -> bool {
        match self.mode {
            RuleMode::Exact => url == self.pattern,
            RuleMode::Prefix => {
                let prefix = self.pattern.strip_suffix('*').unwrap_or(&self.pattern);
                url.starts_with(prefix)
            }
            RuleMode::Domain => {
                let pattern = self.pattern.to_lowercase();
                host == pattern
                    || host
                        .strip_suffix(pattern.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.pattern, self.mode)
    }
}

/// Parses an externally supplied rule list.
///
/// The payload must be a JSON array whose every element carries a non-empty
/// `pattern` and a `mode` from the closed set. A single bad element rejects
/// the whole payload.
pub fn parse_rule_payload(payload: &str) -> Result<Vec<Rule>> {
    let rules: Vec<Rule> = serde_json::from_str(payload)
        .map_err(|e| BlacklistError::Validation(format!("Invalid blacklist data format: {e}")))?;

    if let Some(index) = rules.iter().position(|r| r.pattern.is_empty()) {
        return Err(BlacklistError::Validation(format!(
            "Invalid blacklist data format: entry {index} has an empty pattern"
        )));
    }

    Ok(rules)
}

/// Validates every rule against its mode, failing on the first bad one.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    for (index, rule) in rules.iter().enumerate() {
        rule.validate().map_err(|e| {
            BlacklistError::Validation(format!("Entry {index}: {e}"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== RuleMode Tests ====================

    #[test]
    fn rule_mode_as_str() {
        assert_eq!(RuleMode::Domain.as_str(), "domain");
        assert_eq!(RuleMode::Prefix.as_str(), "prefix");
        assert_eq!(RuleMode::Exact.as_str(), "exact");
    }

    #[test]
    fn rule_mode_parse() {
        assert_eq!(RuleMode::parse("domain"), Some(RuleMode::Domain));
        assert_eq!(RuleMode::parse("prefix"), Some(RuleMode::Prefix));
        assert_eq!(RuleMode::parse("exact"), Some(RuleMode::Exact));
        assert_eq!(RuleMode::parse("Domain"), None);
        assert_eq!(RuleMode::parse("regex"), None);
    }

    #[test]
    fn rule_mode_serde_names() {
        let json = serde_json::to_string(&Rule::prefix("https://a.com/*")).unwrap();
        assert_eq!(json, r#"{"pattern":"https://a.com/*","mode":"prefix"}"#);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn validate_domain() {
        assert!(Rule::domain("example.com").validate().is_ok());
        assert!(Rule::domain("Sub-Domain.Example.COM").validate().is_ok());
        assert!(Rule::domain("localhost").validate().is_ok());
        assert!(Rule::domain("").validate().is_err());
        assert!(Rule::domain("*.example.com").validate().is_err());
        assert!(Rule::domain("https://example.com").validate().is_err());
        assert!(Rule::domain("example.com/path").validate().is_err());
        assert!(Rule::domain("exämple.com").validate().is_err());
    }

    #[test]
    fn validate_prefix() {
        assert!(Rule::prefix("https://example.com/search*").validate().is_ok());
        assert!(Rule::prefix("http://example.com*").validate().is_ok());
        assert!(Rule::prefix("https://example.com/search").validate().is_err());
        assert!(Rule::prefix("ftp://example.com/*").validate().is_err());
        assert!(Rule::prefix("example.com/*").validate().is_err());
    }

    #[test]
    fn validate_exact() {
        assert!(Rule::exact("https://example.com/a").validate().is_ok());
        assert!(Rule::exact("https://example.com/search?q=test&ie=UTF-8")
            .validate()
            .is_ok());
        assert!(Rule::exact("https://example.com/*").validate().is_err());
        assert!(Rule::exact("example.com/a").validate().is_err());
        assert!(Rule::exact("not a url").validate().is_err());
    }

    #[test]
    fn validation_error_carries_hint() {
        let err = Rule::domain("bad domain").validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("\"domain\""));
        assert!(msg.contains("e.g. example.com"));
    }

    // ==================== Matching Tests ====================

    #[test]
    fn matches_domain_and_subdomains() {
        let rule = Rule::domain("example.com");
        assert!(rule.matches("https://example.com/x", "example.com"));
        assert!(rule.matches("https://sub.example.com/y", "sub.example.com"));
        assert!(rule.matches("https://a.b.example.com/", "a.b.example.com"));
        assert!(!rule.matches("https://notexample.com/z", "notexample.com"));
        assert!(!rule.matches("https://example.com.evil.org/", "example.com.evil.org"));
    }

    #[test]
    fn matches_domain_case_insensitive() {
        let rule = Rule::domain("Example.COM");
        assert!(rule.matches("https://WWW.example.com/", "www.example.com"));
    }

    #[test]
    fn matches_domain_ignores_empty_host() {
        let rule = Rule::domain("example.com");
        assert!(!rule.matches("mailto:someone@example.com", ""));
    }

    #[test]
    fn matches_prefix() {
        let rule = Rule::prefix("https://example.com/search*");
        assert!(rule.matches("https://example.com/search?q=1", "example.com"));
        assert!(rule.matches("https://example.com/search", "example.com"));
        assert!(!rule.matches("https://example.com/other", "example.com"));
        assert!(!rule.matches("http://example.com/search", "example.com"));
    }

    #[test]
    fn matches_prefix_without_star() {
        // Remote lists are only shape-checked, so the star may be missing.
        let rule = Rule::prefix("https://example.com/a");
        assert!(rule.matches("https://example.com/abc", "example.com"));
    }

    #[test]
    fn matches_exact() {
        let rule = Rule::exact("https://example.com/a");
        assert!(rule.matches("https://example.com/a", "example.com"));
        assert!(!rule.matches("https://example.com/a/", "example.com"));
        assert!(!rule.matches("https://example.com/A", "example.com"));
    }

    // ==================== Payload Tests ====================

    #[test]
    fn parse_valid_payload() {
        let rules = parse_rule_payload(
            r#"[{"pattern":"a.com","mode":"domain"},{"pattern":"https://b.com/*","mode":"prefix"}]"#,
        )
        .unwrap();
        assert_eq!(rules, vec![Rule::domain("a.com"), Rule::prefix("https://b.com/*")]);
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_rule_payload("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_missing_mode() {
        let result = parse_rule_payload(r#"[{"pattern":"a.com","mode":"domain"},{"pattern":"b.com"}]"#);
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        let result = parse_rule_payload(r#"[{"pattern":"a.com","mode":"regex"}]"#);
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
    }

    #[test]
    fn parse_rejects_empty_pattern() {
        let result = parse_rule_payload(r#"[{"pattern":"","mode":"domain"}]"#);
        assert!(matches!(result, Err(BlacklistError::Validation(_))));
    }

    #[test]
    fn parse_rejects_non_array() {
        assert!(parse_rule_payload(r#"{"pattern":"a.com","mode":"domain"}"#).is_err());
        assert!(parse_rule_payload("not json").is_err());
        assert!(parse_rule_payload(r#"["a.com"]"#).is_err());
    }

    #[test]
    fn validate_rules_reports_entry() {
        let rules = vec![Rule::domain("a.com"), Rule::exact("https://b.com/*")];
        let err = validate_rules(&rules).unwrap_err();
        assert!(err.to_string().starts_with("Entry 1:"));
    }
}
