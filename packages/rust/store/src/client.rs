//! HTTP client for the headless content store.
//!
//! Paths beginning with `cdn/` go to the delivery API and carry the space
//! token as a query parameter. Everything else goes to the management API
//! with the OAuth token in the `Authorization` header.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use logosync_shared::{LogoSyncError, Result, StoreConfig};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Attempts made for a request the store throttled with 429.
const MAX_ATTEMPTS: u32 = 3;

/// Prefix that routes a path to the delivery API.
const DELIVERY_PREFIX: &str = "cdn/";

/// Generic JSON access to the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// `GET path?query`.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value>;

    /// `POST path` with a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Value>;

    /// `PUT path` with a JSON body.
    async fn put(&self, path: &str, body: &Value) -> Result<Value>;
}

/// Rate-limited content store client.
pub struct StoreClient {
    client: Client,
    management_api_url: String,
    delivery_api_url: String,
    oauth_token: String,
    space_token: Option<String>,
    limiter: Arc<DefaultRateLimiter>,
}

impl StoreClient {
    /// Build a client without exchanging a space token.
    ///
    /// Only management paths are usable until [`StoreClient::connect`] has
    /// run the exchange.
    pub fn new(config: &StoreConfig, oauth_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let per_second = NonZeroU32::new(config.rate_limit_per_sec)
            .ok_or_else(|| LogoSyncError::config("store.rate_limit_per_sec must be at least 1"))?;

        let client = Client::builder()
            .user_agent(concat!("logosync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| LogoSyncError::Network(e.to_string()))?;

        Ok(Self {
            client,
            management_api_url: config.management_api_url.trim_end_matches('/').to_string(),
            delivery_api_url: config.delivery_api_url.trim_end_matches('/').to_string(),
            oauth_token: oauth_token.into(),
            space_token: None,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    /// Build a client and exchange the OAuth token for the space's delivery token.
    #[instrument(skip(config, oauth_token, timeout))]
    pub async fn connect(
        config: &StoreConfig,
        oauth_token: impl Into<String>,
        space_id: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let mut client = Self::new(config, oauth_token, timeout)?;
        let token = client.exchange_space_token(space_id).await?;
        client.space_token = Some(token);
        debug!("space token acquired");
        Ok(client)
    }

    async fn exchange_space_token(&self, space_id: u64) -> Result<String> {
        let path = format!("spaces/{space_id}");
        let space = self
            .get(&path, &[])
            .await
            .map_err(|e| LogoSyncError::Auth(format!("space {space_id}: {e}")))?;

        space
            .pointer("/space/first_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or_else(|| LogoSyncError::Auth(format!("space {space_id} returned no delivery token")))
    }

    /// Resolve `path` to a full URL and an authorized request builder.
    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let path = path.trim_start_matches('/');

        if path.starts_with(DELIVERY_PREFIX) {
            let token = self
                .space_token
                .as_deref()
                .ok_or_else(|| LogoSyncError::Auth("no space token; connect first".into()))?;
            let url = format!("{}/{path}", self.delivery_api_url);
            Ok(self.client.request(method, url).query(&[("token", token)]))
        } else {
            let url = format!("{}/{path}", self.management_api_url);
            Ok(self
                .client
                .request(method, url)
                .header(reqwest::header::AUTHORIZATION, &self.oauth_token))
        }
    }

    /// Send with rate limiting, retrying throttled requests with a linear backoff.
    async fn send(&self, path: &str, build: impl Fn() -> Result<RequestBuilder> + Send + Sync) -> Result<Value> {
        let mut attempt = 1;
        loop {
            self.limiter.until_ready().await;

            let response = build()?
                .send()
                .await
                .map_err(|e| LogoSyncError::Network(format!("{path}: {e}")))?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_ATTEMPTS {
                warn!(path, attempt, "store throttled request, backing off");
                tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                attempt += 1;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(LogoSyncError::NotFound(path.to_string()));
            }

            let body = response
                .text()
                .await
                .map_err(|e| LogoSyncError::Network(format!("{path}: {e}")))?;

            if !status.is_success() {
                return Err(LogoSyncError::Store {
                    status: status.as_u16(),
                    message: body,
                });
            }

            if body.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&body)
                .map_err(|e| LogoSyncError::parse(format!("{path}: invalid JSON response: {e}")));
        }
    }
}

#[async_trait]
impl ContentStore for StoreClient {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.send(path, || Ok(self.request(reqwest::Method::GET, path)?.query(query)))
            .await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(path, || Ok(self.request(reqwest::Method::POST, path)?.json(body)))
            .await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(path, || Ok(self.request(reqwest::Method::PUT, path)?.json(body)))
            .await
    }
}
