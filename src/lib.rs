//! IP address filter for request admission
//!
//! Decides whether a remote client address is permitted under a filter
//! specification: a comma-separated list of exact addresses, wildcards (`*`),
//! and CIDR ranges, in IPv4 or IPv6 form.
//!
//! The filter is a pure, stateless predicate. Every parse or format problem
//! degrades to a `false` result; the public entry point never errors and
//! never panics (fail closed).
//!
//! # Example
//!
//! ```rust
//! use ipgate::matches;
//!
//! let filter = "127.0.0.1,10.0.0.0/8,fc00::/7";
//!
//! assert!(matches(Some("10.1.2.3"), Some(filter)));
//! assert!(matches(Some("fc00::1"), Some(filter)));
//! assert!(!matches(Some("203.0.113.7"), Some(filter)));
//!
//! // malformed input is a non-match, never an error
//! assert!(!matches(Some("not-an-address"), Some(filter)));
//! assert!(!matches(None, Some(filter)));
//! ```

pub mod addr;
pub mod check;
pub mod config;
pub mod filter;

pub use addr::{AddrParseError, Address, Family};
pub use check::RemoteAddrCheck;
pub use config::Config;
pub use filter::{matches, EntryError, FilterEntry, FilterSpec, SpecError};
