//! Cookie file provisioning for authenticated yt-dlp runs
//!
//! A cookie file on disk is used as-is. When it is missing and a remote location is
//! configured, it is downloaded once with a bearer token read from the environment.
//! Provisioning problems are reported, never fatal: extraction simply runs without cookies.

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::path::{Path, PathBuf};

use crate::config::CredentialsConfig;

/// Outcome of [`CookieProvisioner::ensure`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieStatus {
    /// The cookie file already existed
    Present(PathBuf),
    /// The cookie file was downloaded
    Fetched(PathBuf),
    /// Nothing is configured
    Skipped,
    Failed(String),
}

impl CookieStatus {
    /// Cookie file usable by the extractor, if any
    pub fn cookie_path(&self) -> Option<PathBuf> {
        match self {
            CookieStatus::Present(path) | CookieStatus::Fetched(path) => Some(path.clone()),
            CookieStatus::Skipped | CookieStatus::Failed(_) => None,
        }
    }
}

pub struct CookieProvisioner {
    client: Client,
    cookies_path: Option<PathBuf>,
    remote_url: Option<String>,
    token: Option<String>,
}

impl CookieProvisioner {
    pub fn new(
        client: Client,
        cookies_path: Option<PathBuf>,
        remote_url: Option<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            cookies_path,
            remote_url,
            token,
        }
    }

    /// Read the token from the environment variable named in the config
    pub fn from_config(config: &CredentialsConfig, client: Client) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty());

        Self::new(client, config.cookies_path.clone(), config.remote_url.clone(), token)
    }

    /// Make sure the cookie file exists, downloading it when possible
    pub async fn ensure(&self) -> CookieStatus {
        let Some(path) = &self.cookies_path else {
            return CookieStatus::Skipped;
        };

        if path.exists() {
            tracing::info!("Using cookie file {}", path.display());
            return CookieStatus::Present(path.clone());
        }

        let Some(url) = &self.remote_url else {
            tracing::warn!(
                "Cookie file {} not found and no remote location configured; continuing without cookies",
                path.display()
            );
            return CookieStatus::Skipped;
        };

        match self.download(url, path).await {
            Ok(()) => {
                tracing::info!("Downloaded cookie file to {}", path.display());
                CookieStatus::Fetched(path.clone())
            }
            Err(e) => {
                tracing::warn!("Cookie download failed, continuing without cookies: {:#}", e);
                CookieStatus::Failed(format!("{:#}", e))
            }
        }
    }

    async fn download(&self, url: &str, path: &Path) -> anyhow::Result<()> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("cookie server responded with HTTP {}", status.as_u16());
        }

        let body = response.bytes().await?;
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        fs_err::write(path, &body)?;
        Ok(())
    }
}
