//! Web app manifest strategy.

use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use logosync_shared::LogoReference;

use super::{SiteContext, pick_largest};
use crate::normalize::absolute_url;
use crate::resolver::fetch_text;

/// The subset of a web app manifest we care about.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebManifest {
    #[serde(default)]
    pub icons: Vec<ManifestIcon>,
}

/// One entry of the manifest `icons` array.
#[derive(Debug, Deserialize)]
pub(crate) struct ManifestIcon {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub sizes: Option<String>,
}

/// `href` of the first `rel="manifest"` element in the page.
pub(crate) fn find_manifest_href(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    let sel = Selector::parse(r#"[rel="manifest"]"#).unwrap();
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}

/// Choose the widest icon with a usable `src` and resolve it against the site.
pub(crate) fn pick_icon(base: &str, manifest: &WebManifest) -> Option<LogoReference> {
    let usable: Vec<&ManifestIcon> = manifest
        .icons
        .iter()
        .filter(|icon| icon.src.as_deref().is_some_and(|s| !s.trim().is_empty()))
        .collect();

    let icon = pick_largest(&usable, |icon| icon.sizes.as_deref())?;
    let src = icon.src.as_deref()?;
    absolute_url(base, src).map(LogoReference::RemoteUrl)
}

/// Fetch the manifest referenced by the home page and pick its largest icon.
pub(crate) async fn from_manifest(client: &Client, ctx: &SiteContext) -> Option<LogoReference> {
    let body = ctx.body.as_deref()?;
    let href = find_manifest_href(body)?;
    let manifest_url = absolute_url(&ctx.base, &href)?;

    let text = match fetch_text(client, &manifest_url).await {
        Ok(text) => text,
        Err(e) => {
            debug!(%manifest_url, error = %e, "manifest fetch failed");
            return None;
        }
    };

    let manifest: WebManifest = match serde_json::from_str(&text) {
        Ok(manifest) => manifest,
        Err(e) => {
            debug!(%manifest_url, error = %e, "manifest is not valid JSON");
            return None;
        }
    };

    pick_icon(&ctx.base, &manifest)
}
