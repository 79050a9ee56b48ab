//! Merchant keys and merchant-name lookup tables
//!
//! The merchant key is the first whitespace-delimited token of the
//! description, used verbatim (case-sensitive). Descriptions that lead with
//! a reference number will not group with their merchant.

use serde::{Deserialize, Serialize};

/// Display name for transactions whose description yields an empty key
pub const UNKNOWN_MERCHANT: &str = "Unknown merchant";

/// Grouping key for a transaction description
pub fn merchant_key(description: &str) -> &str {
    description.split_whitespace().next().unwrap_or("")
}

/// Merchant key with empty keys mapped to [`UNKNOWN_MERCHANT`]
pub fn merchant_label(description: &str) -> &str {
    match merchant_key(description) {
        "" => UNKNOWN_MERCHANT,
        key => key,
    }
}

/// One row of a pattern table: a lowercase substring and its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry<T> {
    pub pattern: String,
    pub items: Vec<T>,
}

/// Ordered substring-keyed lookup over merchant names.
///
/// Matching is case-insensitive and the first matching entry wins, so more
/// specific patterns must come first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternTable<T> {
    entries: Vec<PatternEntry<T>>,
}

impl<T> Default for PatternTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> PatternTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry (builder style)
    pub fn with(mut self, pattern: &str, items: Vec<T>) -> Self {
        self.insert(pattern, items);
        self
    }

    pub fn insert(&mut self, pattern: &str, items: Vec<T>) {
        self.entries.push(PatternEntry {
            pattern: pattern.to_lowercase(),
            items,
        });
    }

    /// Payload of the first entry whose pattern occurs in `name`
    pub fn lookup(&self, name: &str) -> Option<&[T]> {
        let name = name.to_lowercase();
        self.entries
            .iter()
            .find(|e| !e.pattern.is_empty() && name.contains(&e.pattern))
            .map(|e| e.items.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merchant_key_first_token() {
        assert_eq!(merchant_key("NETFLIX.COM 866-579"), "NETFLIX.COM");
        assert_eq!(merchant_key("  SPOTIFY   P12345"), "SPOTIFY");
        assert_eq!(merchant_key("Spotify"), "Spotify");
        assert_ne!(merchant_key("Spotify"), merchant_key("SPOTIFY"));
    }

    #[test]
    fn test_empty_description_is_unknown() {
        assert_eq!(merchant_key(""), "");
        assert_eq!(merchant_key("   "), "");
        assert_eq!(merchant_label(""), UNKNOWN_MERCHANT);
        assert_eq!(merchant_label("UBER TRIP"), "UBER");
    }

    #[test]
    fn test_pattern_table_first_match_wins() {
        let table = PatternTable::new()
            .with("Netflix", vec![1])
            .with("net", vec![2]);
        assert_eq!(table.lookup("NETFLIX.COM"), Some(&[1][..]));
        assert_eq!(table.lookup("internet co"), Some(&[2][..]));
        assert_eq!(table.lookup("spotify"), None);
        assert_eq!(table.len(), 2);
    }
}
