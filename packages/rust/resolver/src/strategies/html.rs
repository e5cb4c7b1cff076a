//! Raw HTML heuristic: look for logo-ish elements inside `<header>`.

use scraper::{ElementRef, Html, Selector};

use logosync_shared::LogoReference;

use super::SiteContext;
use crate::normalize::absolute_url;

/// Walk `header` descendants whose class contains "logo", in document order.
///
/// An `img` yields its resolved `src`, an `svg` yields its markup; any other
/// element is searched for its first nested `img` or `svg`.
pub(crate) fn from_header_markup(ctx: &SiteContext) -> Option<LogoReference> {
    let body = ctx.body.as_deref()?;
    find_header_logo(body, &ctx.base)
}

pub(crate) fn find_header_logo(body: &str, base: &str) -> Option<LogoReference> {
    let doc = Html::parse_document(body);
    let candidates = Selector::parse("header *").unwrap();
    let nested = Selector::parse("img, svg").unwrap();

    for el in doc.select(&candidates) {
        let class = el.value().attr("class").unwrap_or_default();
        if !class.contains("logo") {
            continue;
        }

        let found = logo_from_element(el, base)
            .or_else(|| el.select(&nested).next().and_then(|inner| logo_from_element(inner, base)));

        if found.is_some() {
            return found;
        }
    }

    None
}

fn logo_from_element(el: ElementRef<'_>, base: &str) -> Option<LogoReference> {
    match el.value().name() {
        "img" => el
            .value()
            .attr("src")
            .and_then(|src| absolute_url(base, src))
            .map(LogoReference::RemoteUrl),
        "svg" => Some(LogoReference::InlineMarkup(el.html())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://x.com";

    #[test]
    fn direct_img_with_logo_class() {
        let html = r#"<header><img class="logo" src="/logo.png"></header>"#;
        assert_eq!(
            find_header_logo(html, BASE),
            Some(LogoReference::RemoteUrl("https://x.com/logo.png".into()))
        );
    }

    #[test]
    fn nested_img_inside_logo_wrapper() {
        let html = r#"<header><a class="navbar-logo" href="/"><span><img src="brand.png"></span></a></header>"#;
        assert_eq!(
            find_header_logo(html, BASE),
            Some(LogoReference::RemoteUrl("https://x.com/brand.png".into()))
        );
    }

    #[test]
    fn inline_svg_is_serialized() {
        let html = r#"<header><div class="logo"><svg viewBox="0 0 10 10"><rect width="10" height="10"></rect></svg></div></header>"#;
        match find_header_logo(html, BASE) {
            Some(LogoReference::InlineMarkup(markup)) => {
                assert!(markup.starts_with("<svg"));
                assert!(markup.contains("<rect"));
            }
            other => panic!("expected inline markup, got {other:?}"),
        }
    }

    #[test]
    fn elements_outside_header_are_ignored() {
        let html = r#"<body><div class="logo"><img src="/outside.png"></div><header><p>Hi</p></header></body>"#;
        assert_eq!(find_header_logo(html, BASE), None);
    }

    #[test]
    fn data_uri_image_moves_on_to_next_candidate() {
        let html = r#"<header>
            <img class="logo" src="data:image/png;base64,AAAA">
            <div class="logo-alt"><img src="/real.png"></div>
        </header>"#;
        assert_eq!(
            find_header_logo(html, BASE),
            Some(LogoReference::RemoteUrl("https://x.com/real.png".into()))
        );
    }
}
