//! Logo resolution strategies, evaluated in strict priority order.
//!
//! Each strategy reads a [`SiteContext`] and either produces a
//! [`LogoReference`] or nothing. The chain stops at the first success, so a
//! later strategy can never replace an earlier result.

pub(crate) mod favicon;
pub(crate) mod html;
pub(crate) mod manifest;
pub(crate) mod structured_data;

use url::Url;

pub use favicon::{FaviconDiscovery, HttpFaviconDiscovery, IconCandidate};

// ---------------------------------------------------------------------------
// Strategy list
// ---------------------------------------------------------------------------

/// A single step of the resolution chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Largest icon declared by the web app manifest.
    Manifest,
    /// `logo`/`image` from a schema.org `ld+json` block.
    StructuredData,
    /// Largest icon reported by the favicon discovery service.
    Favicon,
    /// `img`/`svg` under a `header` element whose class mentions "logo".
    HtmlHeuristic,
}

/// The resolution chain, highest priority first.
pub const STRATEGIES: [Strategy; 4] = [
    Strategy::Manifest,
    Strategy::StructuredData,
    Strategy::Favicon,
    Strategy::HtmlHeuristic,
];

impl Strategy {
    /// Human-readable strategy name for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manifest => "manifest",
            Self::StructuredData => "structured-data",
            Self::Favicon => "favicon",
            Self::HtmlHeuristic => "html-heuristic",
        }
    }

    /// Whether this strategy needs the parsed home page.
    pub fn needs_page(&self) -> bool {
        !matches!(self, Self::Favicon)
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything a strategy may look at for one site.
#[derive(Debug, Clone)]
pub struct SiteContext {
    /// Site URL without trailing slash; relative references are joined onto it.
    pub base: String,
    /// Parsed form of `base`.
    pub base_url: Url,
    /// Home page HTML, or `None` if it could not be fetched.
    pub body: Option<String>,
}

// ---------------------------------------------------------------------------
// Icon size selection
// ---------------------------------------------------------------------------

/// Parse the declared width from a `sizes` descriptor.
///
/// Only the first token counts, and only its leading digits before the `x`
/// (`"192x192"` → 192, `"16x16 32x32"` → 16, `"any"` → `None`).
pub(crate) fn parse_size(sizes: &str) -> Option<u32> {
    let first = sizes.split_whitespace().next()?;
    let width = first.split(['x', 'X']).next()?;
    let digits: String = width.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Pick the candidate with the largest declared width.
///
/// Candidates without a parseable size never beat one with a size; ties keep
/// the earliest candidate. With no sizes at all, the first candidate wins.
pub(crate) fn pick_largest<T>(items: &[T], sizes: impl Fn(&T) -> Option<&str>) -> Option<&T> {
    let mut best: Option<(&T, Option<u32>)> = None;

    for item in items {
        let size = sizes(item).and_then(parse_size);
        match best {
            Some((_, best_size)) if size <= best_size => {}
            _ => best = Some((item, size)),
        }
    }

    best.map(|(item, _)| item)
}
