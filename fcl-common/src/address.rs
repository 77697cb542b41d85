//! Account address helpers.
//!
//! Flow addresses are 8 bytes, usually written as 16 hex characters. The free functions in here
//! are pure string transforms that never fail, while [`Address`] is the validated form used by
//! the builders and the transport layer.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of bytes in a Flow account address.
pub const ADDRESS_LENGTH: usize = 8;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,

    #[error("Address {0} is longer than {ADDRESS_LENGTH} bytes")]
    TooLong(String),

    #[error("Address {0} is not valid hex: {1}")]
    InvalidHex(String, String),
}

/// Removes a leading `0x`/`0X` (or legacy `Fx`) prefix.
pub fn sans_prefix(address: &str) -> String {
    address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .or_else(|| address.strip_prefix("Fx"))
        .unwrap_or(address)
        .to_string()
}

/// Ensures an address carries exactly one `0x` prefix.
pub fn with_prefix(address: &str) -> String {
    format!("0x{}", sans_prefix(address))
}

/// Canonical representation for showing an address to users.
pub fn display(address: &str) -> String {
    with_prefix(address)
}

/// A validated account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Hex representation without prefix, as expected in REST paths.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Parses an address with or without prefix. Short addresses are left padded with zeros, so
    /// `0x1` parses to `0x0000000000000001`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = sans_prefix(s.trim());
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }
        if raw.len() > ADDRESS_LENGTH * 2 {
            return Err(AddressError::TooLong(s.to_string()));
        }
        let padded = format!("{raw:0>width$}", width = ADDRESS_LENGTH * 2);
        let decoded =
            hex::decode(&padded).map_err(|e| AddressError::InvalidHex(s.to_string(), e.to_string()))?;
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::prefixed("0xf8d6e0586b0a20c7", "f8d6e0586b0a20c7")]
    #[case::bare("f8d6e0586b0a20c7", "f8d6e0586b0a20c7")]
    #[case::legacy("Fxf8d6e0586b0a20c7", "f8d6e0586b0a20c7")]
    #[case::upper_prefix("0Xf8d6e0586b0a20c7", "f8d6e0586b0a20c7")]
    #[case::empty("", "")]
    fn test_sans_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sans_prefix(input), expected);
    }

    #[rstest]
    #[case("0xf8d6e0586b0a20c7")]
    #[case("f8d6e0586b0a20c7")]
    #[case("Fx01")]
    #[case("0X01")]
    #[case("0x")]
    fn test_prefix_normalization_is_idempotent(#[case] address: &str) {
        assert_eq!(with_prefix(&sans_prefix(address)), with_prefix(address));
        assert_eq!(with_prefix(&with_prefix(address)), with_prefix(address));
    }

    #[test]
    fn test_display_adds_prefix() {
        assert_eq!(display("01cf0e2f2f715450"), "0x01cf0e2f2f715450");
        assert_eq!(with_prefix("0X01"), "0x01");
    }

    #[rstest]
    #[case::short("0x1", "0x0000000000000001")]
    #[case::full("f8d6e0586b0a20c7", "0xf8d6e0586b0a20c7")]
    fn test_parse_address(#[case] input: &str, #[case] expected: &str) {
        let address = Address::from_str(input).expect("valid address");
        assert_eq!(address.to_string(), expected);
    }

    #[rstest]
    #[case::empty("0x", AddressError::Empty)]
    #[case::too_long("0x0102030405060708090a", AddressError::TooLong("0x0102030405060708090a".to_string()))]
    fn test_parse_address_errors(#[case] input: &str, #[case] expected: AddressError) {
        assert_eq!(Address::from_str(input), Err(expected));
    }

    #[test]
    fn test_parse_address_rejects_non_hex() {
        assert!(matches!(Address::from_str("0xzz"), Err(AddressError::InvalidHex(_, _))));
    }

    #[test]
    fn test_address_serde() {
        let address = Address::from_str("0x01").unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0x0000000000000001\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
