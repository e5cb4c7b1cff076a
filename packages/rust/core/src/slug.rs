//! URL-safe entry slugs derived from display names.

/// Transliterate to ASCII, lower-case, and collapse every run of
/// non-alphanumeric characters into a single `-`.
///
/// Leading and trailing hyphens are trimmed, so `"Foo & Bar Co."` becomes
/// `"foo-bar-co"`.
pub fn slugify(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
