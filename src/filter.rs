//! Filter specification parsing and matching.
//!
//! A filter specification is a comma-separated list of entries. Each entry is
//! a wildcard (`*`), an exact IPv4/IPv6 address, or a CIDR range (`A/n`).
//! Entries are combined as a union; evaluation short-circuits on the first
//! match but order never changes the result.
//!
//! The public [`matches`] entry point is total: malformed addresses, bad
//! prefixes, and cross-family comparisons all degrade to a non-match for the
//! affected entry. An access gate must fail closed, never crash the caller.

use std::fmt;

use thiserror::Error;

use crate::addr::{AddrParseError, Address};

/// Errors that can occur while parsing a single filter entry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error(transparent)]
    Addr(#[from] AddrParseError),

    #[error("invalid prefix length: '{0}'")]
    InvalidPrefix(String),

    #[error("prefix length {prefix} exceeds {max} bits")]
    PrefixOutOfRange { prefix: u32, max: u32 },
}

/// Error for a malformed filter specification, carrying the offending token
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid filter entry '{token}': {source}")]
pub struct SpecError {
    pub token: String,
    #[source]
    pub source: EntryError,
}

/// One entry of a filter specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEntry {
    /// Matches any address of any family
    Wildcard,
    /// Matches an address of the same family with identical bytes
    Exact(Address),
    /// Matches addresses of the same family sharing `prefix_len` leading bits
    /// with `base`. The base need not be aligned to the prefix boundary:
    /// trailing bits are ignored, so `127.1.2.3/8` behaves as `127.0.0.0/8`.
    Range { base: Address, prefix_len: u32 },
}

impl FilterEntry {
    /// Parse a single trimmed filter token.
    pub fn parse(token: &str) -> Result<Self, EntryError> {
        if token == "*" {
            return Ok(FilterEntry::Wildcard);
        }
        if let Some((base_text, prefix_text)) = token.rsplit_once('/') {
            // unsigned decimal, no sign, no leading '+'
            if prefix_text.is_empty() || !prefix_text.bytes().all(|b| b.is_ascii_digit()) {
                return Err(EntryError::InvalidPrefix(prefix_text.to_string()));
            }
            let prefix_len: u32 = prefix_text
                .parse()
                .map_err(|_| EntryError::InvalidPrefix(prefix_text.to_string()))?;
            let base = Address::parse(base_text)?;
            let max = base.family().bit_len();
            if prefix_len > max {
                return Err(EntryError::PrefixOutOfRange {
                    prefix: prefix_len,
                    max,
                });
            }
            return Ok(FilterEntry::Range { base, prefix_len });
        }
        Ok(FilterEntry::Exact(Address::parse(token)?))
    }

    /// Evaluate this entry against a parsed remote address.
    ///
    /// `remote` is `None` when the remote address failed to parse; only the
    /// wildcard matches in that case.
    pub fn matches(&self, remote: Option<&Address>) -> bool {
        match self {
            FilterEntry::Wildcard => true,
            FilterEntry::Exact(addr) => remote == Some(addr),
            FilterEntry::Range { base, prefix_len } => match remote {
                Some(remote) => in_range(remote, base, *prefix_len),
                None => false,
            },
        }
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterEntry::Wildcard => write!(f, "*"),
            FilterEntry::Exact(addr) => write!(f, "{}", addr),
            FilterEntry::Range { base, prefix_len } => write!(f, "{}/{}", base, prefix_len),
        }
    }
}

/// A parsed filter specification, for callers that vet configuration up front.
///
/// [`matches`] does not go through this type: a malformed entry there is a
/// benign non-match, while `FilterSpec::parse` reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    /// Parse a full specification string, failing on the first bad token.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let (parsed, errors) = Self::parse_all(spec);
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(parsed),
        }
    }

    /// Parse every token, collecting all errors instead of failing fast.
    ///
    /// The returned spec holds the well-formed entries; errors keep token
    /// order. Used for reporting on a whole specification at once.
    pub fn parse_all(spec: &str) -> (Self, Vec<SpecError>) {
        let mut entries = Vec::new();
        let mut errors = Vec::new();
        for token in spec.split(',').map(str::trim) {
            match FilterEntry::parse(token) {
                Ok(entry) => entries.push(entry),
                Err(source) => errors.push(SpecError {
                    token: token.to_string(),
                    source,
                }),
            }
        }
        (FilterSpec { entries }, errors)
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Union over all entries.
    pub fn matches(&self, remote: Option<&Address>) -> bool {
        self.entries.iter().any(|entry| entry.matches(remote))
    }
}

/// Decide whether `remote_addr` is permitted under `filter`.
///
/// Total and infallible: absent or empty arguments, malformed addresses,
/// malformed entries, out-of-range prefixes, and cross-family comparisons
/// all yield `false`. Pure function of its inputs, safe to call from any
/// number of threads.
pub fn matches(remote_addr: Option<&str>, filter: Option<&str>) -> bool {
    let (Some(remote_addr), Some(filter)) = (remote_addr, filter) else {
        return false;
    };
    if remote_addr.is_empty() || filter.is_empty() {
        return false;
    }

    // Parsed once, lazily consumed: the wildcard must match even when the
    // remote address itself is unparseable.
    let remote = Address::parse(remote_addr).ok();

    filter
        .split(',')
        .map(str::trim)
        .any(|token| matches_entry(remote.as_ref(), token))
}

fn matches_entry(remote: Option<&Address>, token: &str) -> bool {
    match FilterEntry::parse(token) {
        Ok(entry) => entry.matches(remote),
        Err(_) => false,
    }
}

/// CIDR membership: the leading `prefix_len` bits of both addresses agree.
fn in_range(remote: &Address, base: &Address, prefix_len: u32) -> bool {
    if remote.family() != base.family() {
        return false;
    }
    let remote_bytes = remote.octets();
    let base_bytes = base.octets();
    // fast path, also covers the full-width prefix trivially
    if remote_bytes == base_bytes {
        return true;
    }
    (0..prefix_len).all(|index| bit(remote_bytes, index) == bit(base_bytes, index))
}

/// Bit `index` in big-endian order: bit 0 is the most significant bit of byte 0.
fn bit(bytes: &[u8], index: u32) -> u8 {
    (bytes[(index / 8) as usize] >> (7 - index % 8)) & 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_FILTER: &str = "127.0.0.0/8,10.0.0.0/8,172.16.0.0/12,192.168.0.0/16";

    #[test]
    fn test_matches_localhost_range() {
        assert!(!matches(Some("126.255.255.255"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("127.0.0.0"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("127.0.0.1"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("127.1.2.3"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("127.255.255.255"), Some(PRIVATE_FILTER)));
        assert!(!matches(Some("128.0.0.0"), Some(PRIVATE_FILTER)));
        assert!(!matches(Some("123.45.67.89"), Some(PRIVATE_FILTER)));
    }

    #[test]
    fn test_matches_class_a_private_range() {
        assert!(!matches(Some("9.255.255.255"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("10.0.0.0"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("10.1.2.3"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("10.255.255.255"), Some(PRIVATE_FILTER)));
        assert!(!matches(Some("11.0.0.0"), Some(PRIVATE_FILTER)));
    }

    #[test]
    fn test_matches_class_b_private_range() {
        assert!(!matches(Some("172.15.255.255"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("172.16.0.0"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("172.17.2.3"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("172.31.255.255"), Some(PRIVATE_FILTER)));
        assert!(!matches(Some("172.32.0.0"), Some(PRIVATE_FILTER)));
    }

    #[test]
    fn test_matches_class_c_private_range() {
        assert!(!matches(Some("192.167.255.255"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("192.168.0.0"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("192.168.1.2"), Some(PRIVATE_FILTER)));
        assert!(matches(Some("192.168.255.255"), Some(PRIVATE_FILTER)));
        assert!(!matches(Some("192.169.0.0"), Some(PRIVATE_FILTER)));
    }

    #[test]
    fn test_matches_exact() {
        assert!(matches(Some("123.45.67.89"), Some("123.45.67.89")));
        assert!(!matches(Some("123.45.67.89"), Some("1.2.3.4")));
    }

    #[test]
    fn test_matches_wildcard() {
        assert!(matches(Some("127.0.0.1"), Some("*")));
        assert!(matches(Some("::1"), Some("*")));
        // wildcard short-circuits before parsing the remote address
        assert!(matches(Some("not-an-address"), Some("*")));
        assert!(matches(Some("10.0.0.1"), Some("1.2.3.4,*")));
    }

    #[test]
    fn test_matches_absent_or_empty_inputs() {
        assert!(!matches(None, Some("10.0.0.0/8")));
        assert!(!matches(Some("10.0.0.1"), None));
        assert!(!matches(Some(""), Some("*")));
        assert!(!matches(Some("10.0.0.1"), Some("")));
        assert!(!matches(None, None));
    }

    #[test]
    fn test_matches_malformed_never_panics() {
        assert!(!matches(Some("10.0.0"), Some("10.0.0.0/8")));
        assert!(!matches(Some("1::2::3"), Some("1:2::3/0")));
        assert!(!matches(Some("10.0.0.1"), Some("10.0.0/8")));
        assert!(!matches(Some("10.0.0.1"), Some("10.0.0.0/")));
        assert!(!matches(Some("10.0.0.1"), Some("10.0.0.0/+8")));
        assert!(!matches(Some("10.0.0.1"), Some("10.0.0.0/99999999999")));
        assert!(!matches(Some("10.0.0.1"), Some(",,,")));
    }

    #[test]
    fn test_matches_prefix_zero_matches_family() {
        assert!(matches(Some("123.45.67.89"), Some("0.0.0.0/0")));
        assert!(matches(
            Some("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"),
            Some("::/0")
        ));
        // /0 still requires the same family
        assert!(!matches(Some("123.45.67.89"), Some("::/0")));
        assert!(!matches(Some("::1"), Some("0.0.0.0/0")));
    }

    #[test]
    fn test_matches_prefix_out_of_range() {
        assert!(!matches(Some("10.0.0.1"), Some("10.0.0.0/33")));
        assert!(!matches(Some("fc00::1"), Some("fc00::/129")));
        // full-width prefixes are exact matches
        assert!(matches(Some("10.0.0.1"), Some("10.0.0.1/32")));
        assert!(!matches(Some("10.0.0.2"), Some("10.0.0.1/32")));
        assert!(matches(Some("fc00::1"), Some("fc00::1/128")));
    }

    #[test]
    fn test_matches_unaligned_base() {
        assert!(matches(Some("127.0.0.0"), Some("127.1.2.3/8")));
        assert!(matches(Some("127.255.255.255"), Some("127.1.2.3/8")));
        assert!(!matches(Some("126.255.255.255"), Some("127.1.2.3/8")));
        assert!(!matches(Some("128.0.0.0"), Some("127.1.2.3/8")));
    }

    #[test]
    fn test_matches_boundary_bit() {
        // /12: bit 11 is the last compared bit
        assert!(matches(Some("172.16.0.0"), Some("172.16.0.0/12")));
        assert!(matches(Some("172.31.255.255"), Some("172.16.0.0/12")));
        assert!(!matches(Some("172.32.0.0"), Some("172.16.0.0/12")));
        // a non-byte-aligned prefix, one bit past the boundary
        assert!(matches(Some("10.128.0.0"), Some("10.128.0.0/9")));
        assert!(!matches(Some("10.127.255.255"), Some("10.128.0.0/9")));
    }

    #[test]
    fn test_matches_v6_textual_equivalence() {
        assert!(matches(
            Some("fc00::1"),
            Some("fc00:0000:0000:0000:0000:0000:0000:0001")
        ));
        assert!(matches(Some("FC00::1"), Some("fc00::1")));
        assert!(matches(Some("fc00::1234"), Some("fc00::/64")));
        assert!(!matches(Some("fd00::1"), Some("fc00::/16")));
    }

    #[test]
    fn test_matches_cross_family() {
        assert!(!matches(Some("127.0.0.1"), Some("::1")));
        assert!(!matches(Some("::1"), Some("127.0.0.1")));
        assert!(!matches(Some("::1"), Some("127.0.0.1/8")));
        assert!(!matches(Some("127.0.0.1"), Some("::1/128")));
    }

    #[test]
    fn test_matches_multiple_entries_union() {
        let filter = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16";
        assert!(matches(Some("172.20.1.1"), Some(filter)));
        assert!(matches(Some("10.1.1.1"), Some(filter)));
        assert!(!matches(Some("8.8.8.8"), Some(filter)));
        // a malformed entry never poisons its neighbors
        assert!(matches(Some("10.1.1.1"), Some("bogus,10.0.0.0/8")));
        // whitespace around entries is ignored
        assert!(matches(Some("10.1.1.1"), Some(" 192.168.0.1 , 10.0.0.0/8 ")));
    }

    #[test]
    fn test_entry_parse() {
        assert_eq!(FilterEntry::parse("*"), Ok(FilterEntry::Wildcard));
        assert!(matches!(
            FilterEntry::parse("10.0.0.1"),
            Ok(FilterEntry::Exact(_))
        ));
        assert!(matches!(
            FilterEntry::parse("10.0.0.0/8"),
            Ok(FilterEntry::Range { prefix_len: 8, .. })
        ));
        assert!(matches!(
            FilterEntry::parse("10.0.0.0/33"),
            Err(EntryError::PrefixOutOfRange { prefix: 33, max: 32 })
        ));
        assert!(matches!(
            FilterEntry::parse("fc00::/129"),
            Err(EntryError::PrefixOutOfRange {
                prefix: 129,
                max: 128
            })
        ));
        assert!(matches!(
            FilterEntry::parse("10.0.0.0/8/8"),
            Err(EntryError::Addr(_))
        ));
        assert!(matches!(
            FilterEntry::parse("*/8"),
            Err(EntryError::Addr(_))
        ));
    }

    #[test]
    fn test_entry_display() {
        assert_eq!(FilterEntry::parse("*").unwrap().to_string(), "*");
        assert_eq!(
            FilterEntry::parse("10.0.0.1").unwrap().to_string(),
            "10.0.0.1"
        );
        assert_eq!(
            FilterEntry::parse("FC00::1/64").unwrap().to_string(),
            "fc00:0:0:0:0:0:0:1/64"
        );
    }

    #[test]
    fn test_spec_parse() {
        let spec = FilterSpec::parse("*, 10.0.0.0/8, fc00::1").unwrap();
        assert_eq!(spec.entries().len(), 3);

        let remote = Address::parse("10.1.2.3").unwrap();
        assert!(spec.matches(Some(&remote)));

        let err = FilterSpec::parse("10.0.0.0/8, bogus").unwrap_err();
        assert_eq!(err.token, "bogus");

        let err = FilterSpec::parse("10.0.0.0/40").unwrap_err();
        assert!(matches!(
            err.source,
            EntryError::PrefixOutOfRange { prefix: 40, .. }
        ));
    }

    #[test]
    fn test_spec_parse_all_collects_every_error() {
        let (spec, errors) = FilterSpec::parse_all("bogus, 10.0.0.0/8, 10.0.0.0/40, *");
        assert_eq!(spec.entries().len(), 2);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].token, "bogus");
        assert_eq!(errors[1].token, "10.0.0.0/40");

        let remote = Address::parse("10.1.2.3").unwrap();
        assert!(spec.matches(Some(&remote)));

        let (spec, errors) = FilterSpec::parse_all("127.0.0.1, fc00::/7");
        assert_eq!(spec.entries().len(), 2);
        assert!(errors.is_empty());
    }
}
