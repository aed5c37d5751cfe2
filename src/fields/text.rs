//! Text cleanup for scraped field values

use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b")
            .expect("Invalid email regex")
    })
}

/// Collapses whitespace and strips icon glyphs from the private-use area
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !('\u{E000}'..='\u{F8FF}').contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cleans an address string, dropping a leading "Address:" label
pub fn clean_address(raw: &str) -> String {
    let text = clean_text(raw);
    match text.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("address") => {
            rest.trim().to_string()
        }
        _ => text,
    }
}

/// Parses a star rating such as "4.6" or "4,6"
pub fn parse_rating(raw: &str) -> Option<f32> {
    let candidate: String = clean_text(raw)
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    candidate
        .parse::<f32>()
        .ok()
        .filter(|rating| (0.0..=5.0).contains(rating))
}

/// Parses a review count such as "(1,234)" or "1,234 reviews"
pub fn parse_review_count(raw: &str) -> Option<u32> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == ' ')
        .filter(|c| c.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

/// Finds the first email address in a block of text or a `mailto:` link
pub fn extract_email(text: &str) -> Option<String> {
    email_regex()
        .find(text)
        .map(|m| m.as_str().to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Acme \n Dental  "), "Acme Dental");
        assert_eq!(clean_text("\u{E0C8}  123 Main St"), "123 Main St");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_address() {
        assert_eq!(
            clean_address("Address: 123 Main St, Austin, TX 78701"),
            "123 Main St, Austin, TX 78701"
        );
        assert_eq!(
            clean_address("\u{E0C8}\n123 Main St, Austin"),
            "123 Main St, Austin"
        );
        assert_eq!(clean_address("Suite 4: 12 Oak Rd"), "Suite 4: 12 Oak Rd");
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4.6"), Some(4.6));
        assert_eq!(parse_rating("4,2"), Some(4.2));
        assert_eq!(parse_rating("5.0 stars"), Some(5.0));
        assert_eq!(parse_rating("9.5"), None);
        assert_eq!(parse_rating("No reviews"), None);
    }

    #[test]
    fn test_parse_review_count() {
        assert_eq!(parse_review_count("(1,234)"), Some(1234));
        assert_eq!(parse_review_count("87 reviews"), Some(87));
        assert_eq!(parse_review_count("reviews"), None);
    }

    #[test]
    fn test_extract_email() {
        assert_eq!(
            extract_email("mailto:Hello@Acme-Dental.example").as_deref(),
            Some("hello@acme-dental.example")
        );
        assert_eq!(
            extract_email("Write to us at info@acme.example today").as_deref(),
            Some("info@acme.example")
        );
        assert_eq!(extract_email("no email here"), None);
    }
}
