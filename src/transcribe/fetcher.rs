use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::ExtractionError;

/// Downloads a located caption encoding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionFetch: Send + Sync {
    /// Single GET against the locator. Retrying is left to the caller.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, ExtractionError>;
}

/// User-Agent header applied to outgoing requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Leave reqwest's default headers alone
    Disabled,
    Fixed(String),
    /// Pick a random entry for every request
    Rotating(Vec<String>),
}

impl HeaderPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        match config.user_agents.as_slice() {
            [] => HeaderPolicy::Disabled,
            [single] => HeaderPolicy::Fixed(single.clone()),
            agents if config.rotate_user_agents => HeaderPolicy::Rotating(agents.to_vec()),
            [first, ..] => HeaderPolicy::Fixed(first.clone()),
        }
    }

    pub fn user_agent(&self) -> Option<String> {
        match self {
            HeaderPolicy::Disabled => None,
            HeaderPolicy::Fixed(agent) => Some(agent.clone()),
            HeaderPolicy::Rotating(agents) => agents.choose(&mut rand::thread_rng()).cloned(),
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self.user_agent() {
            Some(agent) => request.header(USER_AGENT, agent),
            None => request,
        }
    }
}

/// Random pause before each caption download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestPacing {
    min: Duration,
    max: Duration,
}

impl RequestPacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max: max.max(min) }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn next_delay(&self) -> Duration {
        if self.max.is_zero() || self.min == self.max {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn wait(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!("Pacing caption request by {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RequestPacing {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Build the shared HTTP client
pub fn build_client(config: &FetchConfig) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Map a reqwest failure onto the extraction taxonomy.
pub fn classify_request_error(err: reqwest::Error) -> ExtractionError {
    if err.is_timeout() || err.is_connect() {
        ExtractionError::TransientFailure(err.to_string())
    } else if let Some(status) = err.status() {
        ExtractionError::from_status(status.as_u16(), &err.to_string())
    } else {
        ExtractionError::from_message(err.to_string())
    }
}

/// reqwest-backed caption downloader
pub struct HttpCaptionFetcher {
    client: Client,
    headers: HeaderPolicy,
    pacing: RequestPacing,
}

impl HttpCaptionFetcher {
    pub fn new(client: Client, headers: HeaderPolicy, pacing: RequestPacing) -> Self {
        Self {
            client,
            headers,
            pacing,
        }
    }
}

#[async_trait]
impl CaptionFetch for HttpCaptionFetcher {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, ExtractionError> {
        self.pacing.wait().await;

        tracing::debug!("Downloading captions from {}", locator);
        let response = self
            .headers
            .apply(self.client.get(locator))
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::from_status(status.as_u16(), "caption download"));
        }

        let body = response.bytes().await.map_err(classify_request_error)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher(headers: HeaderPolicy) -> HttpCaptionFetcher {
        HttpCaptionFetcher::new(Client::new(), headers, RequestPacing::disabled())
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let app = Router::new().route("/captions", get(|| async { r#"{"events":[]}"# }));
        let base = spawn_server(app).await;

        let body = fetcher(HeaderPolicy::Disabled)
            .fetch(&format!("{}/captions", base))
            .await
            .unwrap();
        assert_eq!(body, br#"{"events":[]}"#.to_vec());
    }

    #[tokio::test]
    async fn test_fetch_429_is_rate_limited() {
        let app = Router::new().route(
            "/captions",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn_server(app).await;

        let err = fetcher(HeaderPolicy::Disabled)
            .fetch(&format!("{}/captions", base))
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_unknown() {
        let app = Router::new().route(
            "/captions",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn_server(app).await;

        let err = fetcher(HeaderPolicy::Disabled)
            .fetch(&format!("{}/captions", base))
            .await
            .unwrap_err();
        assert_eq!(err, ExtractionError::Unknown("caption download: HTTP 500".to_string()));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher(HeaderPolicy::Disabled)
            .fetch(&format!("http://{}/captions", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::TransientFailure(_)));
    }

    #[tokio::test]
    async fn test_user_agent_is_sent() {
        let app = Router::new().route(
            "/ua",
            get(|headers: HeaderMap| async move {
                headers
                    .get("user-agent")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        );
        let base = spawn_server(app).await;

        let body = fetcher(HeaderPolicy::Fixed("test-agent/1.0".into()))
            .fetch(&format!("{}/ua", base))
            .await
            .unwrap();
        assert_eq!(body, b"test-agent/1.0".to_vec());
    }

    #[test]
    fn test_header_policy_from_config() {
        let mut config = FetchConfig::default();

        config.user_agents = vec![];
        assert_eq!(HeaderPolicy::from_config(&config), HeaderPolicy::Disabled);

        config.user_agents = vec!["a".into(), "b".into()];
        config.rotate_user_agents = true;
        let policy = HeaderPolicy::from_config(&config);
        assert!(matches!(policy, HeaderPolicy::Rotating(ref agents) if agents.len() == 2));
        let agent = policy.user_agent().unwrap();
        assert!(agent == "a" || agent == "b");

        config.rotate_user_agents = false;
        assert_eq!(HeaderPolicy::from_config(&config), HeaderPolicy::Fixed("a".into()));
    }

    #[test]
    fn test_pacing_delay_within_range() {
        assert_eq!(RequestPacing::disabled().next_delay(), Duration::ZERO);

        let pacing = RequestPacing::new(Duration::from_millis(100), Duration::from_millis(300));
        for _ in 0..20 {
            let delay = pacing.next_delay();
            assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(300));
        }

        let inverted = RequestPacing::new(Duration::from_millis(500), Duration::from_millis(100));
        assert_eq!(inverted.next_delay(), Duration::from_millis(500));
    }
}
