//! Business records and extraction outcomes

use crate::fields::SocialLinks;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated business entity
///
/// Name, address and phone are always non-empty; records lacking any of
/// them are rejected before they reach the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Business {
    /// Normalized detail-page URL, unique across the store
    pub identifier: String,
    pub name: String,
    pub address: String,
    /// International format, `+<country code><digits>`
    pub phone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "SocialLinks::is_empty")]
    pub social: SocialLinks,
}

/// Why a candidate did not yield a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// One or more required fields were empty after cleanup
    #[error("missing required fields: {}", .missing.join(", "))]
    IncompleteData { missing: Vec<&'static str> },

    /// The page could not be loaded or did not render in time
    #[error("navigation failed: {0}")]
    NavigationFailure(String),
}

/// Fields read from a detail page before validation
#[derive(Debug, Clone, Default)]
pub struct BusinessDraft {
    pub identifier: String,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub category: Option<String>,
    pub social: SocialLinks,
}

impl BusinessDraft {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    /// Turns the draft into a record, or reports every missing required field
    pub fn validate(self) -> Result<Business, Rejection> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let name = present(self.name);
        let address = present(self.address);
        let phone = present(self.phone);

        match (name, address, phone) {
            (Some(name), Some(address), Some(phone)) => Ok(Business {
                identifier: self.identifier,
                name,
                address,
                phone,
                website: self.website,
                email: self.email,
                rating: self.rating,
                review_count: self.review_count,
                category: self.category,
                social: self.social,
            }),
            (name, address, phone) => {
                let missing = [
                    ("name", name.is_none()),
                    ("address", address.is_none()),
                    ("phone", phone.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                Err(Rejection::IncompleteData { missing })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_draft() -> BusinessDraft {
        BusinessDraft {
            name: Some("Acme Dental".to_string()),
            address: Some("1 Main St, Austin, TX".to_string()),
            phone: Some("+15125550100".to_string()),
            ..BusinessDraft::new("https://www.google.com/maps/place/Acme")
        }
    }

    #[test]
    fn test_complete_draft_validates() {
        let business = complete_draft().validate().unwrap();
        assert_eq!(business.name, "Acme Dental");
        assert_eq!(business.identifier, "https://www.google.com/maps/place/Acme");
        assert!(business.website.is_none());
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let draft = BusinessDraft {
            phone: None,
            address: Some("   ".to_string()),
            ..complete_draft()
        };

        assert_eq!(
            draft.validate(),
            Err(Rejection::IncompleteData {
                missing: vec!["address", "phone"]
            })
        );
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::IncompleteData {
            missing: vec!["name", "phone"],
        };
        assert_eq!(rejection.to_string(), "missing required fields: name, phone");
    }

    #[test]
    fn test_serialization_skips_empty_optionals() {
        let business = complete_draft().validate().unwrap();
        let json = serde_json::to_value(&business).unwrap();

        assert_eq!(json["phone"], "+15125550100");
        assert!(json.get("website").is_none());
        assert!(json.get("social").is_none());
    }
}
