//! schema.org structured data (`application/ld+json`) strategy.

use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::debug;

use logosync_shared::LogoReference;

use super::SiteContext;
use crate::normalize::absolute_url;

/// Scan `ld+json` blocks in document order; the first one exposing a logo wins.
///
/// Malformed blocks are skipped. A block whose only candidate normalizes to
/// nothing (a data URI, say) does not stop the scan.
pub(crate) fn from_structured_data(ctx: &SiteContext) -> Option<LogoReference> {
    let body = ctx.body.as_deref()?;
    find_structured_logo(body)
        .into_iter()
        .find_map(|candidate| absolute_url(&ctx.base, &candidate))
        .map(LogoReference::RemoteUrl)
}

/// Raw logo candidates, one per matching block, in document order.
pub(crate) fn find_structured_logo(body: &str) -> Vec<String> {
    let doc = Html::parse_document(body);
    let sel = Selector::parse(r#"script[type*="application/ld+json"]"#).unwrap();

    let mut candidates = Vec::new();
    for (index, script) in doc.select(&sel).enumerate() {
        let raw = script.text().collect::<String>();
        let value: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                debug!(index, error = %e, "skipping malformed ld+json block");
                continue;
            }
        };

        if let Some(logo) = logo_in_block(&value) {
            candidates.push(logo);
        }
    }
    candidates
}

/// Look for a logo in one block. Arrays and `@graph` are searched item by item.
fn logo_in_block(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(logo_in_block),
        Value::Object(map) => logo_field(map).or_else(|| map.get("@graph").and_then(logo_in_block)),
        _ => None,
    }
}

fn logo_field(map: &Map<String, Value>) -> Option<String> {
    match map.get("logo") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Object(obj)) => {
            if let Some(url) = non_empty_str(obj.get("url")) {
                return Some(url);
            }
        }
        _ => {}
    }

    match map.get("image") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Array(items)) => items.first().and_then(image_value),
        Some(Value::Object(obj)) => non_empty_str(obj.get("url")),
        _ => None,
    }
}

fn image_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => non_empty_str(obj.get("url")),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
