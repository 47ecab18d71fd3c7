//! Configuration management using the prefer crate.
//!
//! Resolution order, lowest to highest priority: built-in defaults, the
//! discovered (or `--config`) file, then environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::SourceTable;
use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "sciharvest.db";

/// Default PDF subdirectory name.
const PDF_SUBDIR: &str = "pdfs";

pub const DEFAULT_OPENALEX_URL: &str = "https://api.openalex.org/works";
pub const DEFAULT_OAI_URL: &str = "https://export.arxiv.org/oai2";
pub const DEFAULT_GROBID_URL: &str = "http://localhost:8070";
pub const DEFAULT_SENTIMENT_URL: &str = "https://api-inference.huggingface.co/models/distilbert/distilbert-base-uncased-finetuned-sst-2-english";

/// Harvester tunables.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub openalex_url: String,
    /// Sent as `mailto` to join OpenAlex's polite pool.
    pub openalex_email: Option<String>,
    pub oai_url: String,
    /// OpenAlex page size.
    pub page_size: usize,
    /// Completed records per harvester run.
    pub max_records: usize,
    /// Pause after each completed record.
    pub request_delay: Duration,
    pub oai_retries: u32,
    pub oai_retry_delay: Duration,
    /// Window used when no watermark is stored yet.
    pub lookback_days: i64,
    pub backfill_limit: usize,
    pub backfill_source: SourceTable,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            openalex_url: DEFAULT_OPENALEX_URL.to_string(),
            openalex_email: None,
            oai_url: DEFAULT_OAI_URL.to_string(),
            page_size: 10,
            max_records: 10,
            request_delay: Duration::from_millis(1000),
            oai_retries: 3,
            oai_retry_delay: Duration::from_secs(10),
            lookback_days: 7,
            backfill_limit: 20,
            backfill_source: SourceTable::Oai,
        }
    }
}

/// PDF download tunables.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    /// Timeout of the HEAD probe used by link correction.
    pub probe_timeout: Duration,
    /// User agent config, see [`crate::http_client::resolve_user_agent`].
    pub user_agent: Option<String>,
    /// Landing pages followed before giving up on a link.
    pub max_hops: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            probe_timeout: Duration::from_secs(5),
            user_agent: None,
            max_hops: 3,
        }
    }
}

/// Sentiment classifier endpoint.
#[derive(Debug, Clone)]
pub struct SentimentSettings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    /// Characters of a sentence sent to the model.
    pub max_chars: usize,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_SENTIMENT_URL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(30),
            max_chars: 512,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrobidSettings {
    pub url: String,
    pub timeout: Duration,
}

impl Default for GrobidSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_GROBID_URL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
    /// Directory for downloaded PDFs.
    pub pdf_dir: PathBuf,
    pub harvest: HarvestSettings,
    pub fetch: FetchSettings,
    pub sentiment: SentimentSettings,
    pub grobid: GrobidSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sciharvest");

        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            pdf_dir: data_dir.join(PDF_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            harvest: HarvestSettings::default(),
            fetch: FetchSettings::default(),
            sentiment: SentimentSettings::default(),
            grobid: GrobidSettings::default(),
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure data and PDF directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (dir, label) in [(&self.data_dir, "data"), (&self.pdf_dir, "PDF")] {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("Failed to create {} directory '{}': {}", label, dir.display(), e),
                )
            })?;
        }
        Ok(())
    }

    pub fn create_db_context(&self) -> DbContext {
        DbContext::new(&self.database_url())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(dir) = var("PDF_DIR") {
            self.pdf_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(email) = var("OPENALEX_EMAIL") {
            self.harvest.openalex_email = Some(email);
        }
        if let Some(url) = var("OPENALEX_URL") {
            self.harvest.openalex_url = url;
        }
        if let Some(url) = var("OAI_URL") {
            self.harvest.oai_url = url;
        }
        if let Some(url) = var("GROBID_URL") {
            self.grobid.url = url;
        }
        if let Some(url) = var("SENTIMENT_API_URL") {
            self.sentiment.api_url = url;
        }
        if let Some(token) = var("SENTIMENT_API_TOKEN") {
            self.sentiment.api_token = Some(token);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openalex_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oai_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oai_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oai_retry_delay_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill_source: Option<SourceTable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hops: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrobidConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Configuration file contents. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory, relative paths resolve against the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_dir: Option<String>,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub grobid: GrobidConfig,
    /// Path the config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer for file discovery.
    pub async fn load() -> Self {
        match prefer::load("sciharvest").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory of the config file, if it came from one.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
            settings.pdf_dir = settings.data_dir.join(PDF_SUBDIR);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref pdf_dir) = self.pdf_dir {
            settings.pdf_dir = self.resolve_path(pdf_dir, base_dir);
        }

        let h = &self.harvest;
        let hs = &mut settings.harvest;
        if let Some(ref url) = h.openalex_url {
            hs.openalex_url = url.clone();
        }
        if let Some(ref email) = h.openalex_email {
            hs.openalex_email = Some(email.clone());
        }
        if let Some(ref url) = h.oai_url {
            hs.oai_url = url.clone();
        }
        if let Some(n) = h.page_size {
            hs.page_size = n.max(1);
        }
        if let Some(n) = h.max_records {
            hs.max_records = n;
        }
        if let Some(ms) = h.request_delay_ms {
            hs.request_delay = Duration::from_millis(ms);
        }
        if let Some(n) = h.oai_retries {
            hs.oai_retries = n.max(1);
        }
        if let Some(secs) = h.oai_retry_delay_secs {
            hs.oai_retry_delay = Duration::from_secs(secs);
        }
        if let Some(days) = h.lookback_days {
            hs.lookback_days = days;
        }
        if let Some(n) = h.backfill_limit {
            hs.backfill_limit = n;
        }
        if let Some(source) = h.backfill_source {
            hs.backfill_source = source;
        }

        let f = &self.fetch;
        if let Some(secs) = f.timeout_secs {
            settings.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = f.probe_timeout_secs {
            settings.fetch.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(ref ua) = f.user_agent {
            settings.fetch.user_agent = Some(ua.clone());
        }
        if let Some(hops) = f.max_hops {
            settings.fetch.max_hops = hops;
        }

        let s = &self.sentiment;
        if let Some(ref url) = s.api_url {
            settings.sentiment.api_url = url.clone();
        }
        if let Some(ref token) = s.api_token {
            settings.sentiment.api_token = Some(token.clone());
        }
        if let Some(secs) = s.timeout_secs {
            settings.sentiment.timeout = Duration::from_secs(secs);
        }
        if let Some(chars) = s.max_chars {
            settings.sentiment.max_chars = chars.max(1);
        }

        if let Some(ref url) = self.grobid.url {
            settings.grobid.url = url.clone();
        }
        if let Some(secs) = self.grobid.timeout_secs {
            settings.grobid.timeout = Duration::from_secs(secs);
        }
    }
}

/// Load settings from the config file (explicit or discovered) and the environment.
pub async fn load_settings(config_path: Option<&Path>) -> Result<(Settings, Config), String> {
    let config = match config_path {
        Some(path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env_overrides();

    Ok((settings, config))
}
