//! Shared plain types for the netmond monitoring daemons.
//!
//! Currently this is just [`MacAddress`]: device records in the shared store
//! are keyed by lowercase MAC address, so every daemon needs the same
//! parse/format behavior.

mod mac;

pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),
}
