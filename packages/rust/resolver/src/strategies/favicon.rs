//! Favicon discovery service and the strategy that consumes it.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use logosync_shared::{LogoReference, LogoSyncError, Result};

use super::{SiteContext, pick_largest};
use crate::normalize::absolute_url;
use crate::resolver::fetch_text;

/// An icon reported by a favicon discovery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconCandidate {
    /// Icon location (absolute or relative to the site).
    pub src: String,
    /// Declared `sizes` descriptor, if any.
    pub sizes: Option<String>,
}

/// External capability that lists candidate icons for a site.
#[async_trait]
pub trait FaviconDiscovery: Send + Sync {
    /// List icon candidates for `base_url`. Order is significant for ties.
    ///
    /// `page` is the home page body when the caller already has it.
    async fn discover(&self, base_url: &Url, page: Option<&str>) -> Result<Vec<IconCandidate>>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Discovers icons from `<link>` tags on the home page, falling back to
/// probing `/favicon.ico` when the page declares none.
pub struct HttpFaviconDiscovery {
    client: Client,
}

impl HttpFaviconDiscovery {
    /// Create a discovery service sharing an existing HTTP client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn probe(&self, url: &Url) -> bool {
        match self.client.get(url.as_str()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(%url, error = %e, "favicon probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl FaviconDiscovery for HttpFaviconDiscovery {
    async fn discover(&self, base_url: &Url, page: Option<&str>) -> Result<Vec<IconCandidate>> {
        let mut icons = match page {
            Some(body) => icon_links(body, base_url),
            None => match fetch_text(&self.client, base_url.as_str()).await {
                Ok(body) => icon_links(&body, base_url),
                Err(e) => {
                    debug!(%base_url, error = %e, "home page unavailable for favicon discovery");
                    Vec::new()
                }
            },
        };

        if icons.is_empty() {
            let fallback = base_url
                .join("/favicon.ico")
                .map_err(|e| LogoSyncError::validation(format!("{base_url}: {e}")))?;
            if self.probe(&fallback).await {
                icons.push(IconCandidate {
                    src: fallback.to_string(),
                    sizes: None,
                });
            }
        }

        Ok(icons)
    }
}

/// Collect `<link>` elements whose `rel` mentions an icon, in document order.
pub(crate) fn icon_links(body: &str, base_url: &Url) -> Vec<IconCandidate> {
    let doc = Html::parse_document(body);
    let sel = Selector::parse("link[rel][href]").unwrap();

    doc.select(&sel)
        .filter(|el| {
            el.value()
                .attr("rel")
                .is_some_and(|rel| rel.to_ascii_lowercase().contains("icon"))
        })
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with("data:") {
                return None;
            }
            let src = base_url.join(href).ok()?;
            Some(IconCandidate {
                src: src.to_string(),
                sizes: el.value().attr("sizes").map(str::to_string),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Ask the discovery service and keep the largest declared icon.
pub(crate) async fn from_favicon_service(
    discovery: &dyn FaviconDiscovery,
    ctx: &SiteContext,
) -> Option<LogoReference> {
    let icons = match discovery.discover(&ctx.base_url, ctx.body.as_deref()).await {
        Ok(icons) => icons,
        Err(e) => {
            debug!(base = %ctx.base, error = %e, "favicon discovery failed");
            return None;
        }
    };

    let icon = pick_largest(&icons, |icon| icon.sizes.as_deref())?;
    absolute_url(&ctx.base, &icon.src).map(LogoReference::RemoteUrl)
}
