//! Configuration loaded from `listwright.toml`.
//!
//! Missing keys take their defaults. `LISTWRIGHT_WEBDRIVER_URL` and
//! `LISTWRIGHT_LEDGER` take precedence over the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::pacing::PacingConfig;
use crate::retry::RetryPolicy;
use crate::state_machine::StageTimings;
use crate::surface::webdriver::SelectorConfig;
use crate::target::Target;

pub const DEFAULT_CONFIG_FILE: &str = "listwright.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Active completion records.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Records of fully complete, archived items.
    #[serde(default = "default_archive_ledger_path")]
    pub archive_ledger_path: PathBuf,

    /// One media folder per item key.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,

    /// Where media folders go once an item is archived.
    #[serde(default = "default_archive_root")]
    pub archive_root: PathBuf,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub stage: StageTimings,

    #[serde(default)]
    pub webdriver: WebDriverConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebDriverConfig {
    #[serde(default = "default_webdriver_url")]
    pub url: String,

    /// W3C `alwaysMatch` capabilities.
    #[serde(default = "default_capabilities")]
    pub capabilities: Value,

    /// Page each target's form starts on.
    #[serde(default)]
    pub start_urls: BTreeMap<Target, String>,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("ledger.json")
}

fn default_archive_ledger_path() -> PathBuf {
    PathBuf::from("ledger_archived.json")
}

fn default_media_root() -> PathBuf {
    PathBuf::from("images")
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("listing_done")
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_capabilities() -> Value {
    serde_json::json!({ "browserName": "chrome" })
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            capabilities: default_capabilities(),
            start_urls: BTreeMap::new(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            archive_ledger_path: default_archive_ledger_path(),
            media_root: default_media_root(),
            archive_root: default_archive_root(),
            pacing: PacingConfig::default(),
            retry: RetryPolicy::default(),
            stage: StageTimings::default(),
            webdriver: WebDriverConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `listwright.toml` from the working directory, or defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<AppConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Environment variables take precedence over the file.
        config.apply_overrides(
            std::env::var("LISTWRIGHT_WEBDRIVER_URL").ok(),
            std::env::var("LISTWRIGHT_LEDGER").ok(),
        );

        Ok(config)
    }

    /// Applies the environment overrides. A ledger override moves the archive
    /// ledger beside it as `<stem>_archived.<ext>`.
    fn apply_overrides(&mut self, webdriver_url: Option<String>, ledger: Option<String>) {
        if let Some(url) = webdriver_url
            && !url.is_empty()
        {
            self.webdriver.url = url;
        }
        if let Some(ledger) = ledger
            && !ledger.is_empty()
        {
            self.ledger_path = PathBuf::from(ledger);
            self.archive_ledger_path = archive_path_beside(&self.ledger_path);
        }
    }

    pub fn start_url(&self, target: Target) -> Option<&str> {
        self.webdriver.start_urls.get(&target).map(String::as_str)
    }
}

fn archive_path_beside(ledger: &Path) -> PathBuf {
    let stem = ledger
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match ledger.extension() {
        Some(ext) => format!("{stem}_archived.{}", ext.to_string_lossy()),
        None => format!("{stem}_archived"),
    };
    ledger.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.ledger_path, PathBuf::from("ledger.json"));
        assert_eq!(config.media_root, PathBuf::from("images"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.stage.poll_interval_ms, 250);
        assert_eq!(config.webdriver.url, "http://localhost:4444");
        assert!(config.start_url(Target::Flipkart).is_none());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            media_root = "/srv/images"

            [retry]
            max_attempts = 5

            [pacing]
            action_max_secs = 4.0

            [webdriver]
            url = "http://grid:4444"

            [webdriver.start_urls]
            flipkart = "https://seller.example/listings/new"

            [webdriver.selectors]
            modal = ".dialog"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.media_root, PathBuf::from("/srv/images"));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_min_secs, 1.0);
        assert_eq!(config.pacing.action_max_secs, 4.0);
        assert_eq!(config.pacing.action_min_secs, 0.5);
        assert_eq!(config.webdriver.url, "http://grid:4444");
        assert_eq!(
            config.start_url(Target::Flipkart),
            Some("https://seller.example/listings/new")
        );
        assert_eq!(config.webdriver.selectors.modal, ".dialog");
        assert_eq!(config.ledger_path, PathBuf::from("ledger.json"));
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("listwright.toml");
        std::fs::write(&path, "retry = 3").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn ledger_override_moves_the_archive_ledger_beside_it() {
        let mut config = AppConfig::default();
        config.apply_overrides(None, Some("/srv/shop/tracker.json".into()));
        assert_eq!(config.ledger_path, PathBuf::from("/srv/shop/tracker.json"));
        assert_eq!(
            config.archive_ledger_path,
            PathBuf::from("/srv/shop/tracker_archived.json")
        );
        assert_eq!(config.webdriver.url, "http://localhost:4444");

        config.apply_overrides(Some("http://grid:4444".into()), Some("state/ledger".into()));
        assert_eq!(config.webdriver.url, "http://grid:4444");
        assert_eq!(config.archive_ledger_path, PathBuf::from("state/ledger_archived"));
    }

    #[test]
    fn empty_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some(String::new()), Some(String::new()));
        assert_eq!(config.ledger_path, PathBuf::from("ledger.json"));
        assert_eq!(config.archive_ledger_path, PathBuf::from("ledger_archived.json"));
        assert_eq!(config.webdriver.url, "http://localhost:4444");
    }
}
