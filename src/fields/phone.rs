//! Phone number normalization

/// Normalizes a scraped phone number to `+<countrycode><digits>`
///
/// Only the digits of `raw` are considered. Digit-count rules:
///
/// | Digits | Interpretation | Result |
/// |--------|----------------|--------|
/// | 7  | domestic local number | `+<cc><digits>` |
/// | 10 | domestic number | `+<cc><digits>` |
/// | 11, starting with the country code | domestic with trunk prefix | `+<digits>` |
/// | 11 or more, otherwise | already international | `+<digits>` |
/// | anything else | not a usable number | `None` |
///
/// # Examples
///
/// ```
/// use places_harvest::fields::normalize_phone;
///
/// assert_eq!(normalize_phone("(512) 555-0100", "1").as_deref(), Some("+15125550100"));
/// assert_eq!(normalize_phone("1-512-555-0100", "1").as_deref(), Some("+15125550100"));
/// assert_eq!(normalize_phone("555-0100", "1").as_deref(), Some("+15550100"));
/// assert_eq!(normalize_phone("12345", "1"), None);
/// ```
pub fn normalize_phone(raw: &str, country_code: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        7 | 10 => Some(format!("+{}{}", country_code, digits)),
        11 if digits.starts_with(country_code) => Some(format!("+{}", digits)),
        n if n >= 11 => Some(format!("+{}", digits)),
        _ => None,
    }
}

/// Extracts the number embedded in a `tel:` style identifier
///
/// Map detail views often carry the number in an attribute such as
/// `data-item-id="phone:tel:+15125550100"`.
pub fn phone_from_item_id(item_id: &str) -> Option<&str> {
    let (_, number) = item_id.split_once("tel:")?;
    let number = number.trim();
    (!number.is_empty()).then_some(number)
}
