//! The logo resolution chain.
//!
//! [`LogoResolver::resolve`] fetches a site's home page once, then walks
//! [`STRATEGIES`] until one yields a logo. It never fails: every fetch or
//! parse problem degrades to "try the next strategy" or to
//! [`LogoReference::Absent`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use logosync_shared::{AppConfig, LogoReference, LogoSyncError, Result};

use crate::strategies::{
    FaviconDiscovery, HttpFaviconDiscovery, STRATEGIES, SiteContext, Strategy, favicon, html,
    manifest, structured_data,
};

/// Maximum number of redirects followed per request.
const MAX_REDIRECTS: usize = 5;

/// Default timeout in seconds for every fetch.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for a [`LogoResolver`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
    /// User-Agent header for outbound requests.
    pub user_agent: String,
    /// Still query the favicon service when the home page is unreachable.
    pub favicon_on_fetch_failure: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("logosync/", env!("CARGO_PKG_VERSION")).to_string(),
            favicon_on_fetch_failure: true,
        }
    }
}

impl From<&AppConfig> for ResolverOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.defaults.request_timeout_secs,
            user_agent: config.resolver.user_agent.clone(),
            favicon_on_fetch_failure: config.resolver.favicon_on_fetch_failure,
        }
    }
}

// ---------------------------------------------------------------------------
// LogoSource
// ---------------------------------------------------------------------------

/// Anything that can turn a site URL into a logo. Must not fail.
#[async_trait]
pub trait LogoSource: Send + Sync {
    /// Resolve the best logo for `site_url`.
    async fn resolve(&self, site_url: &str) -> LogoReference;
}

// ---------------------------------------------------------------------------
// LogoResolver
// ---------------------------------------------------------------------------

/// Multi-strategy logo resolver.
pub struct LogoResolver {
    client: Client,
    favicons: Arc<dyn FaviconDiscovery>,
    options: ResolverOptions,
}

impl LogoResolver {
    /// Create a resolver using the built-in HTTP favicon discovery.
    pub fn new(options: ResolverOptions) -> Result<Self> {
        let client = build_client(&options)?;
        let favicons = Arc::new(HttpFaviconDiscovery::new(client.clone()));
        Ok(Self {
            client,
            favicons,
            options,
        })
    }

    /// Replace the favicon discovery service.
    pub fn with_favicon_discovery(mut self, favicons: Arc<dyn FaviconDiscovery>) -> Self {
        self.favicons = favicons;
        self
    }

    /// Resolve the best logo for `site_url`.
    #[instrument(skip_all, fields(site = %site_url))]
    pub async fn resolve(&self, site_url: &str) -> LogoReference {
        let base = site_url.trim().trim_end_matches('/').to_string();
        let base_url = match Url::parse(&base) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid site URL");
                return LogoReference::Absent;
            }
        };

        let body = match fetch_text(&self.client, &base).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(error = %e, "home page fetch failed");
                if !self.options.favicon_on_fetch_failure {
                    return LogoReference::Absent;
                }
                None
            }
        };

        let ctx = SiteContext {
            base,
            base_url,
            body,
        };

        for strategy in STRATEGIES {
            if strategy.needs_page() && ctx.body.is_none() {
                continue;
            }
            if let Some(logo) = self.run(strategy, &ctx).await {
                debug!(strategy = strategy.name(), "logo resolved");
                return logo;
            }
        }

        debug!("no logo found");
        LogoReference::Absent
    }

    async fn run(&self, strategy: Strategy, ctx: &SiteContext) -> Option<LogoReference> {
        match strategy {
            Strategy::Manifest => manifest::from_manifest(&self.client, ctx).await,
            Strategy::StructuredData => structured_data::from_structured_data(ctx),
            Strategy::Favicon => favicon::from_favicon_service(self.favicons.as_ref(), ctx).await,
            Strategy::HtmlHeuristic => html::from_header_markup(ctx),
        }
    }
}

#[async_trait]
impl LogoSource for LogoResolver {
    async fn resolve(&self, site_url: &str) -> LogoReference {
        LogoResolver::resolve(self, site_url).await
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
pub fn build_client(opts: &ResolverOptions) -> Result<Client> {
    Client::builder()
        .user_agent(opts.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| LogoSyncError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL and return its body, treating any non-success status as an error.
pub(crate) async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LogoSyncError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LogoSyncError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| LogoSyncError::Network(format!("{url}: failed to read body: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::strategies::IconCandidate;

    /// Favicon service returning a fixed list and counting calls.
    struct StaticFavicons {
        icons: Vec<IconCandidate>,
        calls: AtomicUsize,
    }

    impl StaticFavicons {
        fn new(icons: Vec<IconCandidate>) -> Arc<Self> {
            Arc::new(Self {
                icons,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl FaviconDiscovery for StaticFavicons {
        async fn discover(&self, _base_url: &Url, _page: Option<&str>) -> Result<Vec<IconCandidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.icons.clone())
        }
    }

    fn resolver_with(favicons: Arc<StaticFavicons>) -> LogoResolver {
        LogoResolver::new(ResolverOptions::default())
            .unwrap()
            .with_favicon_discovery(favicons)
    }

    fn icon(src: &str, sizes: Option<&str>) -> IconCandidate {
        IconCandidate {
            src: src.into(),
            sizes: sizes.map(String::from),
        }
    }

    async fn mount_page(server: &wiremock::MockServer, route: &str, body: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(route))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn manifest_beats_every_other_strategy() {
        let server = wiremock::MockServer::start().await;
        let page = std::fs::read_to_string("../../../fixtures/html/manifest-site.html")
            .expect("read fixture");
        mount_page(&server, "/", &page).await;
        mount_page(
            &server,
            "/site.webmanifest",
            r#"{"icons": [{"src": "/android-192.png", "sizes": "192x192"}, {"src": "/android-512.png", "sizes": "512x512"}]}"#,
        )
        .await;

        let favicons = StaticFavicons::new(vec![icon("/fav.png", Some("1024x1024"))]);
        let resolver = resolver_with(favicons.clone());

        let logo = resolver.resolve(&server.uri()).await;
        assert_eq!(
            logo,
            LogoReference::RemoteUrl(format!("{}/android-512.png", server.uri()))
        );
        assert_eq!(favicons.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broken_manifest_falls_through_to_structured_data() {
        let server = wiremock::MockServer::start().await;
        let page = std::fs::read_to_string("../../../fixtures/html/manifest-site.html")
            .expect("read fixture");
        mount_page(&server, "/", &page).await;
        mount_page(&server, "/site.webmanifest", "{ not json").await;

        let resolver = resolver_with(StaticFavicons::new(vec![]));
        let logo = resolver.resolve(&server.uri()).await;
        assert_eq!(
            logo,
            LogoReference::RemoteUrl("https://cdn.northwind.test/brand/schema-logo.png".into())
        );
    }

    #[tokio::test]
    async fn favicon_service_used_before_html_heuristic() {
        let server = wiremock::MockServer::start().await;
        let page = r#"<html><body><header><img class="logo" src="/header.png"></header></body></html>"#;
        mount_page(&server, "/", page).await;

        let favicons = StaticFavicons::new(vec![
            icon("/fav-16.png", Some("16x16")),
            icon("/fav-96.png", Some("96x96")),
        ]);
        let resolver = resolver_with(favicons.clone());

        let logo = resolver.resolve(&server.uri()).await;
        assert_eq!(
            logo,
            LogoReference::RemoteUrl(format!("{}/fav-96.png", server.uri()))
        );
        assert_eq!(favicons.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn html_heuristic_is_last_resort() {
        let server = wiremock::MockServer::start().await;
        let page = std::fs::read_to_string("../../../fixtures/html/header-logo-site.html")
            .expect("read fixture");
        mount_page(&server, "/", &page).await;

        let resolver = resolver_with(StaticFavicons::new(vec![]));
        match resolver.resolve(&server.uri()).await {
            LogoReference::InlineMarkup(markup) => assert!(markup.contains("<circle")),
            other => panic!("expected inline svg, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn home_failure_still_asks_favicon_service() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let favicons = StaticFavicons::new(vec![icon("https://cdn.x.com/icon.png", None)]);
        let resolver = resolver_with(favicons.clone());

        let logo = resolver.resolve(&server.uri()).await;
        assert_eq!(logo, LogoReference::RemoteUrl("https://cdn.x.com/icon.png".into()));
        assert_eq!(favicons.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn home_failure_is_absent_when_fallback_disabled() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let favicons = StaticFavicons::new(vec![icon("/icon.png", None)]);
        let options = ResolverOptions {
            favicon_on_fetch_failure: false,
            ..ResolverOptions::default()
        };
        let resolver = LogoResolver::new(options)
            .unwrap()
            .with_favicon_discovery(favicons.clone());

        assert_eq!(resolver.resolve(&server.uri()).await, LogoReference::Absent);
        assert_eq!(favicons.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn home_page_is_fetched_once_for_favicon_fallback() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"<html><head><link rel="icon" sizes="64x64" href="/icon-64.png"></head><body></body></html>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = LogoResolver::new(ResolverOptions::default()).unwrap();
        assert_eq!(
            resolver.resolve(&server.uri()).await,
            LogoReference::RemoteUrl(format!("{}/icon-64.png", server.uri()))
        );
    }

    #[tokio::test]
    async fn resolving_twice_is_idempotent() {
        let server = wiremock::MockServer::start().await;
        let page = std::fs::read_to_string("../../../fixtures/html/structured-data-site.html")
            .expect("read fixture");
        mount_page(&server, "/", &page).await;

        let resolver = resolver_with(StaticFavicons::new(vec![]));
        let first = resolver.resolve(&server.uri()).await;
        let second = resolver.resolve(&format!("{}/", server.uri())).await;

        assert_eq!(first, second);
        assert_eq!(
            first,
            LogoReference::RemoteUrl(format!("{}/assets/bluebird-logo.svg", server.uri()))
        );
    }

    #[tokio::test]
    async fn invalid_url_is_absent() {
        let resolver = resolver_with(StaticFavicons::new(vec![]));
        assert_eq!(resolver.resolve("not a url").await, LogoReference::Absent);
    }
}
