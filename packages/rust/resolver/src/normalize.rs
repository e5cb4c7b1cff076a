//! URL normalization helpers shared by every resolution strategy.

use url::Url;

/// Resolve `reference` against the site `base` (no trailing slash).
///
/// - data URIs and empty references yield `None`
/// - references that already carry a host are returned unchanged
/// - protocol-relative references (`//cdn.example.com/x.png`) take the base scheme
/// - anything else loses one leading `/` and is appended to `base`
pub fn absolute_url(base: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || is_data_uri(reference) {
        return None;
    }

    if let Some(rest) = reference.strip_prefix("//") {
        let scheme = Url::parse(base)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());
        return Some(format!("{scheme}://{rest}"));
    }

    if let Ok(parsed) = Url::parse(reference) {
        if parsed.has_host() {
            return Some(reference.to_string());
        }
    }

    let relative = reference.strip_prefix('/').unwrap_or(reference);
    Some(format!("{}/{relative}", base.trim_end_matches('/')))
}

/// Prefix `https://` when the input URL has no scheme.
pub fn ensure_scheme(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url.trim_start_matches('/'))
    }
}

fn is_data_uri(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}
