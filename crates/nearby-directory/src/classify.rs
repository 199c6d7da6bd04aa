//! Query classification.
//!
//! Decides whether a free-text query asks for a product or a service, and
//! which request category that implies.

use lazy_static::lazy_static;
use nearby_core::ProviderKind;
use regex::Regex;

lazy_static! {
    /// Any of these anywhere in the query makes it a service request
    static ref SERVICE_KEYWORD: Regex = Regex::new(
        r"(?i)plumber|electrician|cleaner|mechanic|repair|service|fix"
    ).unwrap();

    /// Word tokens used for matching against names
    static ref WORD: Regex = Regex::new(r"[a-z0-9']+").unwrap();
}

pub fn classify(query: &str) -> ProviderKind {
    if SERVICE_KEYWORD.is_match(query) {
        ProviderKind::Service
    } else {
        ProviderKind::Product
    }
}

/// Category a request for `kind` is filed under
pub fn category_for(kind: ProviderKind) -> &'static str {
    kind.default_category()
}

/// Lowercased word tokens of `text`
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD.find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}
