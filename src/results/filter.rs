//! Client-side text filter over the current superset

use crate::core::place::Place;
use std::borrow::Cow;

/// Case-insensitive substring filter over name, city, state, country.
///
/// The query is trimmed first; when nothing remains the superset is
/// returned borrowed, so the no-filter case costs nothing and callers
/// can detect it by reference. Order is preserved and the input is
/// never mutated.
pub fn filter_places<'a>(places: &'a [Place], query: &str) -> Cow<'a, [Place]> {
    let needle = query.trim();
    if needle.is_empty() {
        return Cow::Borrowed(places);
    }
    let needle = needle.to_lowercase();
    Cow::Owned(
        places
            .iter()
            .filter(|place| matches_query(place, &needle))
            .cloned()
            .collect(),
    )
}

fn matches_query(place: &Place, needle_lower: &str) -> bool {
    field_matches(Some(place.name.as_str()), needle_lower)
        || field_matches(place.city.as_deref(), needle_lower)
        || field_matches(place.state.as_deref(), needle_lower)
        || field_matches(place.country.as_deref(), needle_lower)
}

fn field_matches(field: Option<&str>, needle_lower: &str) -> bool {
    field
        .map(|f| f.to_lowercase().contains(needle_lower))
        .unwrap_or(false)
}
