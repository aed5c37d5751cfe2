//! Sponsored-entry detection for result lists

use crate::browser::ElementHandle;

const MARKERS: &[&str] = &["sponsored", "ad"];

/// Returns true when a result entry is an advertisement
///
/// Best effort: the entry counts as sponsored when its own label or the text
/// of its enclosing entry contains a standalone "Sponsored" or "Ad" word.
pub fn is_sponsored(element: &ElementHandle) -> bool {
    let label = element.attribute("aria-label").unwrap_or_default();

    [element.ancestor_text.as_str(), element.text.as_str(), label]
        .iter()
        .any(|text| contains_marker(text))
}

fn contains_marker(text: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .any(|word| MARKERS.iter().any(|m| word.eq_ignore_ascii_case(m)))
}
