//! Connection-string parsing.
//!
//! Accepts ADO.NET-style connection strings:
//!
//! ```text
//! Server=localhost;Database=orders;User Id=app;Password=secret;
//! ```
//!
//! Keys are trimmed and lowercased so lookups are case-insensitive; when a
//! key repeats, the last occurrence wins. Values are trimmed but otherwise
//! kept verbatim.

use std::collections::BTreeMap;

use crate::error::ConnstrError;

/// Parsed, normalized view of a raw connection string.
///
/// Immutable after parsing. Holds no copy of the raw string; the only
/// identity it carries outward is [`key_hash`](Self::key_hash), safe to put
/// in errors and log fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConnectionString {
    pairs: BTreeMap<String, String>,
    key_hash: u64,
}

impl NormalizedConnectionString {
    /// Parse a raw connection string.
    ///
    /// Empty segments (from trailing or doubled `;`) are skipped. A segment
    /// without `=`, or with an empty key, is rejected.
    pub fn parse(raw: &str) -> Result<Self, ConnstrError> {
        let mut pairs = BTreeMap::new();

        for segment in raw.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ConnstrError::InvalidPair {
                    segment: segment.to_string(),
                }
            })?;

            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return Err(ConnstrError::InvalidPair {
                    segment: segment.to_string(),
                });
            }

            if pairs.insert(key.clone(), value.trim().to_string()).is_some() {
                tracing::debug!(key = %key, "duplicate connection string key, last occurrence wins");
            }
        }

        let key_hash = hash_pairs(&pairs);
        Ok(Self { pairs, key_hash })
    }

    /// Look up a value by key, case-insensitively.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Interpret a key as a boolean flag (`true`, `yes`, or `1`).
    ///
    /// Absent keys read as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1"
        })
    }

    /// Whether the target database lives only in memory.
    ///
    /// Recognizes the `:memory:` data source (plain or `file::memory:` URI
    /// form) and the explicit `Mode=Memory` key.
    #[must_use]
    pub fn memory_backed(&self) -> bool {
        if self
            .get("mode")
            .is_some_and(|mode| mode.eq_ignore_ascii_case("memory"))
        {
            return true;
        }
        ["data source", "datasource", "filename"]
            .iter()
            .filter_map(|key| self.get(key))
            .any(|source| source == ":memory:" || source.starts_with("file::memory:"))
    }

    /// Stable 64-bit hash of the normalized key/value form.
    ///
    /// Identical raw strings, and raw strings differing only in key case,
    /// whitespace, or segment order, hash identically. The raw string cannot
    /// be recovered from it.
    #[must_use]
    pub const fn key_hash(&self) -> u64 {
        self.key_hash
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the string parsed to no pairs at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate over the normalized pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// FNV-1a over the canonical `key=value;` sequence.
///
/// The map iterates in key order, so the hash is independent of the order
/// segments appeared in the raw string.
fn hash_pairs(pairs: &BTreeMap<String, String>) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    let mut byte = |b: u8| {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    };
    for (key, value) in pairs {
        key.bytes().for_each(&mut byte);
        byte(b'=');
        value.bytes().for_each(&mut byte);
        byte(b';');
    }
    hash
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parsing() {
        let parsed = NormalizedConnectionString::parse(
            "Server=localhost;Database=orders;User Id=app;Password=secret;",
        )
        .unwrap();

        assert_eq!(parsed.get("server"), Some("localhost"));
        assert_eq!(parsed.get("database"), Some("orders"));
        assert_eq!(parsed.get("user id"), Some("app"));
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let parsed =
            NormalizedConnectionString::parse("SERVER=localhost;DataBase=orders").unwrap();
        assert_eq!(parsed.get("Server"), Some("localhost"));
        assert_eq!(parsed.get("DATABASE"), Some("orders"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let parsed =
            NormalizedConnectionString::parse("Database=first;database=second").unwrap();
        assert_eq!(parsed.get("database"), Some("second"));
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        let parsed = NormalizedConnectionString::parse(";;Server=localhost;;").unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_segment_without_equals_is_rejected() {
        let err = NormalizedConnectionString::parse("Server=localhost;garbage").unwrap_err();
        assert!(matches!(err, ConnstrError::InvalidPair { segment } if segment == "garbage"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let err = NormalizedConnectionString::parse("=value").unwrap_err();
        assert!(matches!(err, ConnstrError::InvalidPair { .. }));
    }

    #[test]
    fn test_flag_values() {
        let parsed =
            NormalizedConnectionString::parse("Pooling=true;Mars=YES;Encrypt=1;Trust=false")
                .unwrap();
        assert!(parsed.flag("pooling"));
        assert!(parsed.flag("mars"));
        assert!(parsed.flag("encrypt"));
        assert!(!parsed.flag("trust"));
        assert!(!parsed.flag("absent"));
    }

    #[test]
    fn test_memory_backed_detection() {
        for raw in [
            "Data Source=:memory:",
            "Data Source=file::memory:?cache=shared",
            "Filename=:memory:",
            "Data Source=orders.db;Mode=Memory",
        ] {
            let parsed = NormalizedConnectionString::parse(raw).unwrap();
            assert!(parsed.memory_backed(), "raw: {raw}");
        }

        let parsed = NormalizedConnectionString::parse("Data Source=orders.db").unwrap();
        assert!(!parsed.memory_backed());
    }

    #[test]
    fn test_key_hash_is_order_and_case_invariant() {
        let a = NormalizedConnectionString::parse("Server=x;Database=y").unwrap();
        let b = NormalizedConnectionString::parse("database=y; SERVER = x ;").unwrap();
        assert_eq!(a.key_hash(), b.key_hash());

        let c = NormalizedConnectionString::parse("Server=x;Database=z").unwrap();
        assert_ne!(a.key_hash(), c.key_hash());
    }
}
