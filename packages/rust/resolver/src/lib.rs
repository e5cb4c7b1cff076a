//! Logo resolution for a single website.
//!
//! This crate provides:
//! - [`LogoResolver`]: fetches a home page and runs the strategy chain
//! - [`strategies`]: manifest, structured data, favicon service, HTML heuristic
//! - [`normalize`]: absolute-URL and scheme normalization

pub mod normalize;
pub mod resolver;
pub mod strategies;

pub use normalize::{absolute_url, ensure_scheme};
pub use resolver::{LogoResolver, LogoSource, ResolverOptions, build_client};
pub use strategies::{
    FaviconDiscovery, HttpFaviconDiscovery, IconCandidate, STRATEGIES, SiteContext, Strategy,
};
