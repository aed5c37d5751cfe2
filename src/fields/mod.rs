//! Field heuristics
//!
//! Pure value transforms applied to scraped strings. None of these touch the
//! browser or the store, and none influence the harvest loop's control flow
//! beyond the value they return.

mod phone;
mod social;
mod sponsored;
mod text;

pub use phone::{normalize_phone, phone_from_item_id};
pub use social::{classify_social, SocialLinks, SocialPlatform};
pub use sponsored::is_sponsored;
pub use text::{clean_address, clean_text, extract_email, parse_rating, parse_review_count};
