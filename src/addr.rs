//! Textual IP address parsing.
//!
//! Turns dotted-decimal IPv4 and colon-hex IPv6 strings into fixed-width
//! big-endian byte values. The parser is pure and does no resolution: a
//! string either matches one of the two textual grammars or it is rejected.
//! IPv4-mapped IPv6 literals (`::ffff:a.b.c.d`) are rejected.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while parsing a textual address
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("invalid address format: '{0}'")]
    InvalidFormat(String),
}

/// Address family of a parsed address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Width of the address space in bits
    pub fn bit_len(self) -> u32 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

/// A parsed IP address: exactly 4 (V4) or 16 (V6) bytes, network bit order.
///
/// Produced only by [`Address::parse`] and never mutated. Two textual
/// spellings of the same value compare equal (`fc00::1` ==
/// `fc00:0:0:0:0:0:0:1` == `FC00::1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl Address {
    /// Parse a textual IPv4 or IPv6 address.
    pub fn parse(text: &str) -> Result<Self, AddrParseError> {
        if let Some(bytes) = parse_v4(text) {
            return Ok(Address::V4(bytes));
        }
        if let Some(bytes) = parse_v6(text) {
            return Ok(Address::V6(bytes));
        }
        Err(AddrParseError::InvalidFormat(text.to_string()))
    }

    pub fn family(&self) -> Family {
        match self {
            Address::V4(_) => Family::V4,
            Address::V6(_) => Family::V6,
        }
    }

    /// Address bytes, most significant first.
    pub fn octets(&self) -> &[u8] {
        match self {
            Address::V4(bytes) => bytes,
            Address::V6(bytes) => bytes,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::V4(bytes) => {
                write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
            }
            Address::V6(bytes) => {
                for i in 0..8 {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    let group = u16::from_be_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
                    write!(f, "{:x}", group)?;
                }
                Ok(())
            }
        }
    }
}

/// Four dot-separated decimal groups, 1-3 digits each, values 0-255.
fn parse_v4(text: &str) -> Option<[u8; 4]> {
    let mut bytes = [0u8; 4];
    let mut groups = text.split('.');
    for slot in &mut bytes {
        let group = groups.next()?;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u16 = group.parse().ok()?;
        *slot = u8::try_from(value).ok()?;
    }
    if groups.next().is_some() {
        return None;
    }
    Some(bytes)
}

/// Colon-hex notation, 2-39 characters, at most one `::` compression marker.
fn parse_v6(text: &str) -> Option<[u8; 16]> {
    if text.len() < 2 || text.len() > 39 || text.contains('.') {
        return None;
    }

    let mut groups: Vec<u16> = Vec::with_capacity(8);
    match text.find("::") {
        Some(pos) => {
            let head = &text[..pos];
            let tail = &text[pos + 2..];
            if tail.contains("::") {
                return None;
            }
            let head_groups = parse_v6_groups(head)?;
            let tail_groups = parse_v6_groups(tail)?;
            // "::" stands for at least one zero group
            if head_groups.len() + tail_groups.len() > 7 {
                return None;
            }
            groups.extend(&head_groups);
            groups.resize(8 - tail_groups.len(), 0);
            groups.extend(&tail_groups);
        }
        None => {
            groups = parse_v6_groups(text)?;
            if groups.len() != 8 {
                return None;
            }
        }
    }

    let mut bytes = [0u8; 16];
    for (i, group) in groups.iter().enumerate() {
        let [hi, lo] = group.to_be_bytes();
        bytes[i * 2] = hi;
        bytes[i * 2 + 1] = lo;
    }
    Some(bytes)
}

/// Colon-separated hex groups, 1-4 digits each. Empty input is zero groups.
fn parse_v6_groups(text: &str) -> Option<Vec<u16>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    text.split(':')
        .map(|group| {
            if group.is_empty() || group.len() > 4 || !group.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return None;
            }
            u16::from_str_radix(group, 16).ok()
        })
        .collect()
}
