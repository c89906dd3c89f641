use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-readable order number, e.g. `ORD-20261017-3F9A0C1D7B42`.
///
/// The date part keeps numbers sortable by day; the 48-bit random suffix
/// makes collisions within a day negligible. Stores still enforce
/// uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Generates a fresh order number for the current UTC day.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generates an order number for the given instant.
    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string()[..12].to_uppercase();
        Self(format!("ORD-{}-{}", at.format("%Y%m%d"), suffix))
    }

    /// Wraps an existing order number (e.g. read back from storage).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        let number = OrderNumber::generate_at(at);
        let s = number.as_str();

        assert!(s.starts_with("ORD-20261017-"));
        assert_eq!(s.len(), "ORD-20261017-".len() + 12);
        assert!(
            s["ORD-20261017-".len()..]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_generated_numbers_are_distinct() {
        let numbers: HashSet<_> = (0..1_000).map(|_| OrderNumber::generate()).collect();
        assert_eq!(numbers.len(), 1_000);
    }
}
