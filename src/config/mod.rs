use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::captions::SelectionOrder;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Caption discovery settings
    pub youtube: YoutubeConfig,

    /// Rate-limit retry settings
    pub retry: RetryConfig,

    /// Outgoing request settings
    pub fetch: FetchConfig,

    /// Cookie file provisioning
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
}

/// Where caption tracks are discovered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Run the yt-dlp binary
    #[default]
    YtDlp,
    /// Query YouTube's player API directly
    #[serde(rename = "innertube")]
    #[value(name = "innertube")]
    InnerTube,
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "yt_dlp" | "yt-dlp" | "ytdlp" => Ok(Backend::YtDlp),
            "innertube" => Ok(Backend::InnerTube),
            other => anyhow::bail!("Unknown caption backend: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub backend: Backend,

    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Language codes tried in order
    pub preferred_languages: Vec<String>,

    /// Caption formats the decoder is allowed to use
    pub supported_formats: Vec<String>,

    /// Manual/auto-generated precedence
    pub selection_order: SelectionOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the first retry, in seconds
    pub initial_delay_secs: f64,

    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Pick a random User-Agent per request
    pub rotate_user_agents: bool,

    pub user_agents: Vec<String>,

    /// Random pause before each caption download
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Netscape cookie file handed to yt-dlp
    pub cookies_path: Option<PathBuf>,

    /// Remote location the cookie file is downloaded from when missing
    pub remote_url: Option<String>,

    /// Environment variable holding the bearer token for `remote_url`
    pub token_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            backend: Backend::YtDlp,
            yt_dlp_path: "yt-dlp".to_string(),
            preferred_languages: vec!["en".to_string(), "he".to_string()],
            supported_formats: vec!["json3".to_string()],
            selection_order: SelectionOrder::ManualFirst,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_secs: 2.0,
            backoff_multiplier: 2.0,
        }
    }
}

/// Upper bound accepted for `retry.initial_delay_secs`
pub const MAX_INITIAL_DELAY_SECS: f64 = 3600.0;

/// Upper bound accepted for `retry.backoff_multiplier`
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

impl RetryConfig {
    /// Saturates instead of panicking on values `validate` would reject
    pub fn initial_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.initial_delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            rotate_user_agents: true,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0".to_string(),
            ],
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            cookies_path: None,
            remote_url: None,
            token_env: "YT_COOKIES_TOKEN".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file (or defaults), then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::config_path(explicit)? {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_path(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Per-user configuration file location
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-transcriber").join("config.yaml"))
    }

    /// Resolve which configuration file to read, if any
    fn config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        // Current directory first for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        let user_config = Self::default_path()?;
        Ok(user_config.exists().then_some(user_config))
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("BIND_ADDRESS") {
            self.server.bind_address = bind;
        }

        if let Some(port) = lookup("PORT") {
            let host = self
                .server
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.bind_address = format!("{}:{}", host, port.trim());
        }

        if let Some(backend) = lookup("YT_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.youtube.backend = backend,
                Err(e) => tracing::warn!("Ignoring YT_BACKEND: {}", e),
            }
        }

        if let Some(path) = lookup("YT_COOKIES_PATH") {
            self.credentials.cookies_path = Some(PathBuf::from(path));
        }

        if let Some(url) = lookup("YT_COOKIES_URL") {
            self.credentials.remote_url = Some(url);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }

        let delay = self.retry.initial_delay_secs;
        if !(0.0..=MAX_INITIAL_DELAY_SECS).contains(&delay) {
            anyhow::bail!(
                "retry.initial_delay_secs must be between 0 and {}, got {}",
                MAX_INITIAL_DELAY_SECS,
                delay
            );
        }

        let multiplier = self.retry.backoff_multiplier;
        if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
            anyhow::bail!(
                "retry.backoff_multiplier must be between 1.0 and {}, got {}",
                MAX_BACKOFF_MULTIPLIER,
                multiplier
            );
        }

        if self.youtube.preferred_languages.is_empty() {
            anyhow::bail!("youtube.preferred_languages must not be empty");
        }

        if self.youtube.supported_formats.is_empty() {
            anyhow::bail!("youtube.supported_formats must not be empty");
        }

        if self.fetch.min_delay_ms > self.fetch.max_delay_ms {
            anyhow::bail!("fetch.min_delay_ms must not exceed fetch.max_delay_ms");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Bind Address: {}", self.server.bind_address);
        println!("  Backend: {:?}", self.youtube.backend);
        if self.youtube.backend == Backend::YtDlp {
            println!("  yt-dlp Path: {}", self.youtube.yt_dlp_path);
        }
        println!("  Languages: {}", self.youtube.preferred_languages.join(", "));
        println!("  Formats: {}", self.youtube.supported_formats.join(", "));
        println!("  Selection Order: {:?}", self.youtube.selection_order);
        println!(
            "  Retry: {} attempts, {}s initial delay, x{} backoff",
            self.retry.max_attempts, self.retry.initial_delay_secs, self.retry.backoff_multiplier
        );
        println!("  Rotate User-Agents: {}", self.fetch.rotate_user_agents);
        if let Some(path) = &self.credentials.cookies_path {
            println!("  Cookies File: {}", path.display());
        }
    }
}
