//! Tag classification shared by the collectors and the enricher.
//!
//! Provides helpers to:
//! - copy borrowed key/value pairs from a decoder into an owned tag map;
//! - recognise points of interest, named streets and admin boundaries; and
//! - derive country and reference codes for boundary relations.
use geoenrich_core::Tags;

/// Copy borrowed tag pairs into an owned [`Tags`] map.
pub fn collect_tags<'a, T>(tags: T) -> Tags
where
    T: IntoIterator<Item = (&'a str, &'a str)>,
{
    tags.into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

/// Value of the `name` tag, if present and non-empty.
#[must_use]
pub fn name(tags: &Tags) -> Option<&str> {
    tags.get("name").map(String::as_str).filter(|name| !name.is_empty())
}

/// True when the element is named and carries one of the `poi_keys`.
#[must_use]
pub fn is_poi<K: AsRef<str>>(tags: &Tags, poi_keys: &[K]) -> bool {
    name(tags).is_some() && poi_keys.iter().any(|key| tags.contains_key(key.as_ref()))
}

/// True for a named `highway`.
#[must_use]
pub fn is_street(tags: &Tags) -> bool {
    tags.contains_key("highway") && name(tags).is_some()
}

/// Parsed `admin_level`, ignoring values that are not small integers.
#[must_use]
pub fn admin_level(tags: &Tags) -> Option<u8> {
    tags.get("admin_level")?.trim().parse().ok()
}

/// True for `boundary=administrative`.
#[must_use]
pub fn is_admin_boundary(tags: &Tags) -> bool {
    tags.get("boundary").is_some_and(|value| value == "administrative")
}

/// Upper-cased ISO 3166-1 alpha-2 code for a boundary.
///
/// `ISO3166-2` wins (its first two letters), then `country_code`, then
/// `is_in:country_code`, then `fallback`.
#[must_use]
pub fn country_code(tags: &Tags, fallback: Option<&str>) -> Option<String> {
    let subdivision = tags
        .get("ISO3166-2")
        .and_then(|code| code.get(..2))
        .filter(|prefix| prefix.chars().all(|ch| ch.is_ascii_alphabetic()));
    subdivision
        .or_else(|| tags.get("country_code").map(String::as_str))
        .or_else(|| tags.get("is_in:country_code").map(String::as_str))
        .or(fallback)
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
}

/// Official reference code: `ref`, then the Norwegian municipality and county
/// numbers.
#[must_use]
pub fn reference_code(tags: &Tags) -> Option<String> {
    ["ref", "ref:kommunenummer", "ref:fylkesnummer"]
        .into_iter()
        .find_map(|key| tags.get(key))
        .cloned()
}
