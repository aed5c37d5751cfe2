//! URL handling module for Places-Harvest
//!
//! This module builds search URLs and turns result links into stable
//! candidate identifiers.

mod normalize;

pub use normalize::{build_search_url, normalize_identifier};
