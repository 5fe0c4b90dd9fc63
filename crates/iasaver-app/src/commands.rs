//! Command implementations.
//!
//! Every command writes its user-facing output to `out`; logging goes
//! through `tracing`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use iasaver_core::config::CONFIG_KEY;
use iasaver_core::store::EXPORT_FILE_NAME;
use iasaver_core::{
    Blacklist, HttpClient, KeyValueStore, PageSession, RemoteRules, Rule, RuleMode, SaverConfig,
    StatusCache,
};
use iasaver_storage::Database;
use tracing::info;

/// Opens the key/value store at `path`, or in the app data directory.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn KeyValueStore>> {
    let db = match path {
        Some(path) => Database::with_path(path),
        None => Database::new(),
    }
    .context("Failed to open database")?;

    Ok(Arc::new(db))
}

// === Blacklist ===

/// Prints the local entries, numbered from 1.
pub fn blacklist_list(kv: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let blacklist = Blacklist::open(kv)?;

    if blacklist.local_rules().is_empty() {
        writeln!(out, "No entries in blacklist.")?;
        return Ok(());
    }

    for (i, rule) in blacklist.local_rules().iter().enumerate() {
        writeln!(out, "{:>3}. {}", i + 1, rule)?;
    }
    Ok(())
}

/// Adds an entry in the given mode.
pub fn blacklist_add(
    kv: Arc<dyn KeyValueStore>,
    pattern: &str,
    mode: &str,
    out: &mut impl Write,
) -> Result<()> {
    let Some(mode) = RuleMode::parse(mode) else {
        let modes: Vec<_> = RuleMode::ALL.iter().map(RuleMode::as_str).collect();
        bail!("Unknown mode \"{}\" (expected one of: {})", mode, modes.join(", "));
    };

    let pattern = pattern.trim();
    if pattern.is_empty() {
        bail!("Please enter a value.");
    }

    let rule = Rule::new(pattern, mode);
    let mut blacklist = Blacklist::open(kv)?;
    blacklist.add(rule.clone())?;

    writeln!(out, "Added {rule}")?;
    Ok(())
}

/// Removes the entry shown as `number` by [`blacklist_list`].
pub fn blacklist_remove(kv: Arc<dyn KeyValueStore>, number: usize, out: &mut impl Write) -> Result<()> {
    let mut blacklist = Blacklist::open(kv)?;
    let Some(index) = number.checked_sub(1) else {
        bail!("Entry numbers start at 1");
    };

    let removed = blacklist.remove(index)?;
    writeln!(out, "Removed {removed}")?;
    Ok(())
}

/// Replaces the local entries with the contents of `file`.
pub fn blacklist_import(kv: Arc<dyn KeyValueStore>, file: &Path, out: &mut impl Write) -> Result<()> {
    let payload = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut blacklist = Blacklist::open(kv)?;
    let count = blacklist
        .import_json(&payload)
        .context("Error parsing blacklist file")?;

    writeln!(out, "Blacklist imported successfully. ({count} entries)")?;
    Ok(())
}

/// Writes the local entries to `file` (a directory gets the default file
/// name), or to `out` when no file is given.
pub fn blacklist_export(
    kv: Arc<dyn KeyValueStore>,
    file: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    let json = Blacklist::open(kv)?.export_json()?;

    match file {
        None => writeln!(out, "{json}")?,
        Some(path) => {
            let path: PathBuf = if path.is_dir() {
                path.join(EXPORT_FILE_NAME)
            } else {
                path.to_path_buf()
            };
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Exported blacklist to {:?}", path);
            writeln!(out, "Exported blacklist to {}", path.display())?;
        }
    }
    Ok(())
}

// === Config ===

/// Prints the current settings as JSON.
pub fn config_show(kv: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let config = SaverConfig::load(&kv)?;
    writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
    Ok(())
}

/// Changes one setting.
pub fn config_set(
    kv: Arc<dyn KeyValueStore>,
    field: &str,
    value: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut config = SaverConfig::load(&kv)?;
    config.set_field(field, value).map_err(anyhow::Error::msg)?;
    config.save(&kv)?;

    info!("Setting {} changed to {}", field, value);
    writeln!(out, "{field} = {value}")?;
    Ok(())
}

/// Drops the stored settings so defaults apply again.
pub fn config_reset(kv: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    kv.delete_value(CONFIG_KEY)?;
    writeln!(out, "Settings reset to defaults.")?;
    Ok(())
}

// === Cache ===

/// Removes expired archive status entries.
pub fn cache_prune(kv: Arc<dyn KeyValueStore>, out: &mut impl Write) -> Result<()> {
    let config = SaverConfig::load(&kv)?;
    let removed = StatusCache::new(kv, config.status_cache_ttl()).prune(Utc::now())?;

    writeln!(out, "Removed {removed} expired cache entries.")?;
    Ok(())
}

// === Check ===

/// Runs a page session for `url` and prints its outcome.
pub async fn check(
    kv: Arc<dyn KeyValueStore>,
    client: Arc<dyn HttpClient>,
    url: &str,
    out: &mut impl Write,
) -> Result<()> {
    let config = SaverConfig::load(&kv)?;
    let session = PageSession::new(kv, client, config);
    let mut status_line: std::io::Result<()> = Ok(());
    let report = session
        .run_with_status(url, |badge| {
            status_line = writeln!(out, "{}", badge.tooltip);
        })
        .await?;
    status_line?;

    if let RemoteRules::Degraded(reason) = &report.remote {
        writeln!(out, "External blacklist unavailable ({reason}), using local entries only")?;
    }

    writeln!(out, "{}", report.outcome)?;
    if let Some(badge) = &report.badge {
        writeln!(out, "  status: {} ({})", badge.color, badge.icon)?;
        writeln!(out, "  link:   {}", badge.link)?;
    }

    if report.outcome.is_failure() {
        bail!("Archiving did not complete for {}", report.outcome.url());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use iasaver_core::{FetchError, HttpResponse, MemoryStore};
    use serde_json::json;
    use std::collections::HashMap;

    fn store() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    /// Serves fixed bodies by URL; everything else fails.
    struct StaticClient(HashMap<String, (u16, String)>);

    #[async_trait]
    impl HttpClient for StaticClient {
        async fn get(&self, url: &str) -> std::result::Result<HttpResponse, FetchError> {
            match self.0.get(url) {
                Some((status, body)) => Ok(HttpResponse {
                    status: *status,
                    status_text: String::new(),
                    body: body.clone(),
                    final_url: url.to_string(),
                }),
                None => Err(FetchError::Transport(format!("no route to {url}"))),
            }
        }
    }

    // ==================== Blacklist Tests ====================

    #[test]
    fn test_list_empty() {
        let mut out = Vec::new();
        blacklist_list(store(), &mut out).unwrap();
        assert_eq!(output(out), "No entries in blacklist.\n");
    }

    #[test]
    fn test_add_and_list() {
        let kv = store();
        let mut out = Vec::new();
        blacklist_add(kv.clone(), " example.com ", "domain", &mut out).unwrap();
        blacklist_add(kv.clone(), "https://a.com/docs/*", "prefix", &mut out).unwrap();

        let mut out = Vec::new();
        blacklist_list(kv, &mut out).unwrap();
        assert_eq!(
            output(out),
            "  1. example.com [domain]\n  2. https://a.com/docs/* [prefix]\n"
        );
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let kv = store();
        let mut out = Vec::new();

        let err = blacklist_add(kv.clone(), "not a domain", "domain", &mut out).unwrap_err();
        assert!(err.to_string().contains("Enter a valid domain"));

        let err = blacklist_add(kv.clone(), "example.com", "regex", &mut out).unwrap_err();
        assert!(err.to_string().contains("domain, prefix, exact"));

        assert!(blacklist_add(kv.clone(), "   ", "domain", &mut out).is_err());

        blacklist_add(kv.clone(), "example.com", "domain", &mut out).unwrap();
        let err = blacklist_add(kv, "example.com", "domain", &mut out).unwrap_err();
        assert!(err.to_string().contains("already in the blacklist"));
    }

    #[test]
    fn test_remove_by_number() {
        let kv = store();
        let mut out = Vec::new();
        blacklist_add(kv.clone(), "a.com", "domain", &mut out).unwrap();
        blacklist_add(kv.clone(), "b.com", "domain", &mut out).unwrap();

        assert!(blacklist_remove(kv.clone(), 0, &mut out).is_err());
        assert!(blacklist_remove(kv.clone(), 3, &mut out).is_err());

        let mut out = Vec::new();
        blacklist_remove(kv.clone(), 1, &mut out).unwrap();
        assert_eq!(output(out), "Removed a.com [domain]\n");

        let blacklist = Blacklist::open(kv).unwrap();
        assert_eq!(blacklist.local_rules(), &[Rule::domain("b.com")]);
    }

    #[test]
    fn test_export_import_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = store();
        let mut out = Vec::new();
        blacklist_add(source.clone(), "a.com", "domain", &mut out).unwrap();
        blacklist_add(source.clone(), "https://b.com/x", "exact", &mut out).unwrap();

        // Exporting to a directory uses the default file name
        blacklist_export(source, Some(dir.path()), &mut out).unwrap();
        let file = dir.path().join(EXPORT_FILE_NAME);
        let exported = fs::read_to_string(&file).unwrap();
        assert!(exported.contains("\n  {\n    \"pattern\": \"a.com\""));

        let target = store();
        let mut out = Vec::new();
        blacklist_import(target.clone(), &file, &mut out).unwrap();
        assert_eq!(output(out), "Blacklist imported successfully. (2 entries)\n");

        let blacklist = Blacklist::open(target).unwrap();
        assert_eq!(
            blacklist.local_rules(),
            &[Rule::domain("a.com"), Rule::exact("https://b.com/x")]
        );
    }

    #[test]
    fn test_import_invalid_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, r#"[{"pattern":"b.com","mode":"wildcard"}]"#).unwrap();

        let kv = store();
        let mut out = Vec::new();
        blacklist_add(kv.clone(), "a.com", "domain", &mut out).unwrap();

        let err = blacklist_import(kv.clone(), &file, &mut out).unwrap_err();
        assert!(err.to_string().contains("Error parsing blacklist file"));
        assert_eq!(
            Blacklist::open(kv).unwrap().local_rules(),
            &[Rule::domain("a.com")]
        );
    }

    #[test]
    fn test_export_stdout() {
        let kv = store();
        let mut out = Vec::new();
        blacklist_export(kv, None, &mut out).unwrap();
        assert_eq!(output(out), "[]\n");
    }

    // ==================== Config Tests ====================

    #[test]
    fn test_config_set_show_reset() {
        let kv = store();
        let mut out = Vec::new();

        config_set(kv.clone(), "show_badges", "false", &mut out).unwrap();
        assert!(!SaverConfig::load(&kv).unwrap().show_badges);
        assert!(config_set(kv.clone(), "nope", "1", &mut out).is_err());

        let mut out = Vec::new();
        config_show(kv.clone(), &mut out).unwrap();
        let shown: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(shown["show_badges"], json!(false));

        let mut out = Vec::new();
        config_reset(kv.clone(), &mut out).unwrap();
        assert_eq!(SaverConfig::load(&kv).unwrap(), SaverConfig::default());
    }

    // ==================== Cache Tests ====================

    #[test]
    fn test_cache_prune() {
        let kv = store();
        let cache = StatusCache::new(kv.clone(), chrono::Duration::minutes(5));
        cache.put("https://a.com/", json!({}), Utc::now() - chrono::Duration::hours(1));

        let mut out = Vec::new();
        cache_prune(kv, &mut out).unwrap();
        assert_eq!(output(out), "Removed 1 expired cache entries.\n");
    }

    // ==================== Check Tests ====================

    #[tokio::test]
    async fn test_check_blacklisted_page() {
        let kv = store();
        let mut out = Vec::new();
        blacklist_add(kv.clone(), "example.com", "domain", &mut out).unwrap();
        config_set(kv.clone(), "load_external_blacklist", "false", &mut out).unwrap();

        let client = Arc::new(StaticClient(HashMap::new()));
        let mut out = Vec::new();
        check(kv, client, "https://www.example.com/", &mut out)
            .await
            .unwrap();

        let text = output(out);
        assert!(text.starts_with("Archiving skipped (Blacklist)\n"));
        assert!(text.contains("status: gray (fas fa-ban)"));
    }

    #[tokio::test]
    async fn test_check_archives_page() {
        let page = "https://example.org/";
        let kv = store();
        let mut out = Vec::new();
        config_set(kv.clone(), "load_external_blacklist", "false", &mut out).unwrap();

        let mut replies = HashMap::new();
        replies.insert(page.to_string(), (200, String::new()));
        replies.insert(
            "https://archive.org/wayback/available?url=https%3A%2F%2Fexample.org%2F".to_string(),
            (200, r#"{"archived_snapshots":{}}"#.to_string()),
        );
        replies.insert(format!("https://web.archive.org/save/{page}"), (200, String::new()));

        let mut out = Vec::new();
        check(kv, Arc::new(StaticClient(replies)), page, &mut out)
            .await
            .unwrap();

        let text = output(out);
        assert!(text.starts_with("Checking archive status... 🔄\nFirst archiving successfully!"));
    }

    #[tokio::test]
    async fn test_check_reports_degraded_remote_list() {
        let kv = store();
        let mut out = Vec::new();
        config_set(
            kv.clone(),
            "external_blacklist_url",
            "https://lists.example.org/blacklist.json",
            &mut out,
        )
        .unwrap();
        blacklist_add(kv.clone(), "example.com", "domain", &mut out).unwrap();

        let mut replies = HashMap::new();
        replies.insert(
            "https://lists.example.org/blacklist.json".to_string(),
            (503, String::new()),
        );

        let mut out = Vec::new();
        check(kv, Arc::new(StaticClient(replies)), "https://example.com/", &mut out)
            .await
            .unwrap();

        let text = output(out);
        assert!(text.starts_with(
            "External blacklist unavailable (server answered with status 503), using local entries only\n"
        ));
        assert!(!text.contains("Checking archive status"));
    }

    #[tokio::test]
    async fn test_check_reports_failure() {
        let kv = store();
        let mut out = Vec::new();
        config_set(kv.clone(), "load_external_blacklist", "false", &mut out).unwrap();

        let client = Arc::new(StaticClient(HashMap::new()));
        let mut out = Vec::new();
        let result = check(kv, client, "https://unreachable.test/", &mut out).await;

        assert!(result.is_err());
        assert!(output(out).contains("\nFailed to load URL without cookies"));
    }
}
