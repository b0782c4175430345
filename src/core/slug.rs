//! Slug generation - turns a display name into a URL-safe identifier.

/// Returned when a name contains nothing slug-worthy.
pub const FALLBACK_SLUG: &str = "item";

/// Lower-cases `name` and replaces every run of characters outside `[a-z0-9]`
/// with a single hyphen, trimming hyphens from both ends.
///
/// Non-ASCII letters are treated as separators, so a name made only of symbols
/// or non-Latin script yields [`FALLBACK_SLUG`].
///
/// ```
/// use machine_catalog::core::slug::slugify;
///
/// assert_eq!(slugify("Hydraulic Press HP-200"), "hydraulic-press-hp-200");
/// assert_eq!(slugify("¡¿!?"), "item");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Appends the numeric collision suffix used by the uniqueness loop (`base-2`, `base-3`, ...).
#[must_use]
pub fn with_suffix(base: &str, n: u32) -> String {
    format!("{base}-{n}")
}
