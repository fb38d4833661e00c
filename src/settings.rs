use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_SETTINGS: &str = r#"
db_path = "data/macrobell.sqlite"

[provider]
poll_interval_ms = 2000
timeout_secs = 180

[crawl]
menu_url = "https://www.tacobell.com/food?store={store}"
include_paths = ["/food/*"]
excluded_categories = ["groups", "drinks"]
max_depth = 1
limit = 50

[filter]
excluded_suffixes = [
    "box", "meal", "combo", "sauce", "packet", "salsa", "pack", "meal for 2", "meal for 4",
]
"#;

const CONFIG_FILE: &str = "macrobell.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "no Firecrawl configuration found: set FIRECRAWL_API_URL for self-host \
         or FIRECRAWL_API_KEY for cloud"
    )]
    NoProvider,
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    pub provider: ProviderSettings,
    pub crawl: CrawlSettings,
    pub filter: FilterSettings,
}

/// Page provider access. `api_url` selects a self-hosted instance, otherwise
/// `api_key` selects the cloud API.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// Menu entry point; `{store}` is replaced by the store id.
    pub menu_url: String,
    pub include_paths: Vec<String>,
    /// Menu sections never requested from the provider.
    pub excluded_categories: Vec<String>,
    pub max_depth: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    pub excluded_suffixes: Vec<String>,
}

impl Settings {
    /// Layer the built-in defaults, `macrobell.toml` (or `$MACROBELL_CONFIG`),
    /// `MACROBELL_*` variables and the Firecrawl credentials.
    pub fn load() -> Result<Self, SettingsError> {
        dotenv::dotenv().ok();

        let file = std::env::var("MACROBELL_CONFIG").unwrap_or_else(|_| CONFIG_FILE.to_string());
        Self::layered(
            &file,
            environment(),
            std::env::var("FIRECRAWL_API_KEY").ok(),
            std::env::var("FIRECRAWL_API_URL").ok(),
        )
    }

    fn layered(
        file: &str,
        env: config::Environment,
        api_key: Option<String>,
        api_url: Option<String>,
    ) -> Result<Self, SettingsError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml))
            .add_source(config::File::with_name(file).required(false))
            .add_source(env)
            .set_override_option("provider.api_key", api_key)?
            .set_override_option("provider.api_url", api_url)?
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    /// Built-in defaults only, no file or environment lookups.
    #[cfg(test)]
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_SETTINGS, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("built-in default settings must deserialize")
    }
}

/// `MACROBELL_*` variables; `__` separates sections and list settings are
/// comma separated.
fn environment() -> config::Environment {
    config::Environment::with_prefix("MACROBELL")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("crawl.include_paths")
        .with_list_parse_key("crawl.excluded_categories")
        .with_list_parse_key("filter.excluded_suffixes")
}

impl ProviderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CrawlSettings {
    pub fn store_url(&self, store_id: &str) -> String {
        self.menu_url.replace("{store}", store_id)
    }

    /// Excluded categories as crawl path excludes, e.g. `drinks` -> `/food/drinks`.
    pub fn exclude_paths(&self) -> Vec<String> {
        let prefix = self
            .include_paths
            .first()
            .map(|p| p.trim_end_matches('*').trim_end_matches('/'))
            .unwrap_or("");
        self.excluded_categories
            .iter()
            .map(|c| format!("{}/{}", prefix, c.trim_matches('/')))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_menu_scope() {
        let s = Settings::defaults();
        assert_eq!(s.crawl.limit, 50);
        assert_eq!(s.crawl.max_depth, 1);
        assert_eq!(s.crawl.include_paths, vec!["/food/*"]);
        assert_eq!(s.filter.excluded_suffixes.len(), 9);
        assert!(s.provider.api_key.is_none());
        assert!(s.provider.api_url.is_none());
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        environment().source(Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn env_overrides_lists_and_scalars() {
        let s = Settings::layered(
            "missing-macrobell.toml",
            env(&[
                ("MACROBELL_FILTER__EXCLUDED_SUFFIXES", "box,meal"),
                ("MACROBELL_CRAWL__EXCLUDED_CATEGORIES", "drinks"),
                ("MACROBELL_CRAWL__LIMIT", "10"),
                ("MACROBELL_DB_PATH", "/tmp/prices.sqlite"),
            ]),
            None,
            None,
        )
        .unwrap();
        assert_eq!(s.filter.excluded_suffixes, vec!["box", "meal"]);
        assert_eq!(s.crawl.excluded_categories, vec!["drinks"]);
        assert_eq!(s.crawl.include_paths, vec!["/food/*"]);
        assert_eq!(s.crawl.limit, 10);
        assert_eq!(s.db_path, PathBuf::from("/tmp/prices.sqlite"));
    }

    #[test]
    fn firecrawl_credentials_override_env() {
        let s = Settings::layered(
            "missing-macrobell.toml",
            env(&[("MACROBELL_PROVIDER__API_URL", "http://from-env:3002")]),
            Some("fc-key".into()),
            Some("http://localhost:3002".into()),
        )
        .unwrap();
        assert_eq!(s.provider.api_key.as_deref(), Some("fc-key"));
        assert_eq!(s.provider.api_url.as_deref(), Some("http://localhost:3002"));
        assert_eq!(s.provider.timeout_secs, 180);
    }

    #[test]
    fn no_overrides_keep_defaults() {
        let s = Settings::layered("missing-macrobell.toml", env(&[]), None, None).unwrap();
        assert_eq!(s.filter.excluded_suffixes.len(), 9);
        assert!(s.provider.api_key.is_none());
    }

    #[test]
    fn categories_become_path_excludes() {
        let s = Settings::defaults();
        assert_eq!(s.crawl.exclude_paths(), vec!["/food/groups", "/food/drinks"]);
    }

    #[test]
    fn store_url_substitutes_id() {
        let s = Settings::defaults();
        assert_eq!(
            s.crawl.store_url("000274"),
            "https://www.tacobell.com/food?store=000274"
        );
    }
}
