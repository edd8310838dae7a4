//! Device token representation.
//!
//! Tokens are 32 raw bytes on the wire but are usually handed around as 64
//! hex characters, often in the `<abcd1234 ...>` form devices print them in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtocolError, Result};

/// Length of a device token in bytes
pub const TOKEN_SIZE: usize = 32;

/// Opaque 32-byte identifier for a notification recipient
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceToken([u8; TOKEN_SIZE]);

impl DeviceToken {
    /// Wrap raw token bytes
    pub const fn new(bytes: [u8; TOKEN_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a token from a byte slice, which must be exactly 32 bytes long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; TOKEN_SIZE] = bytes.try_into().map_err(|_| {
            ProtocolError::InvalidToken(format!(
                "expected {TOKEN_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    /// Parse a hex token, ignoring whitespace and angle brackets
    pub fn from_hex(s: &str) -> Result<Self> {
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '<' && *c != '>')
            .collect();

        let bytes = hex::decode(&cleaned)
            .map_err(|e| ProtocolError::InvalidToken(format!("invalid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Lowercase hex form, 64 characters
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; TOKEN_SIZE] {
        &self.0
    }
}

impl From<[u8; TOKEN_SIZE]> for DeviceToken {
    fn from(bytes: [u8; TOKEN_SIZE]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for DeviceToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for DeviceToken {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceToken({})", self.to_hex())
    }
}

impl Serialize for DeviceToken {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_hex().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeviceToken {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    #[test]
    fn test_parse_plain_hex() {
        let token = DeviceToken::from_hex(HEX).unwrap();
        assert_eq!(token.as_bytes(), &[0xAA; TOKEN_SIZE]);
        assert_eq!(token.to_hex(), HEX);
    }

    #[test]
    fn test_parse_device_printed_form() {
        let printed = "<aaaaaaaa aaaaaaaa aaaaaaaa aaaaaaaa aaaaaaaa aaaaaaaa aaaaaaaa aaaaaaaa>";
        let token: DeviceToken = printed.parse().unwrap();
        assert_eq!(token, DeviceToken::new([0xAA; TOKEN_SIZE]));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = DeviceToken::from_hex("abcd").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidToken(_)));

        let err = DeviceToken::from_bytes(&[0u8; 33]).unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes, got 33"));
    }

    #[test]
    fn test_non_hex_rejected() {
        let bad = "zz".repeat(TOKEN_SIZE);
        assert!(matches!(
            DeviceToken::from_hex(&bad),
            Err(ProtocolError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let token = DeviceToken::new([0xAA; TOKEN_SIZE]);
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, format!("\"{HEX}\""));
        let back: DeviceToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
