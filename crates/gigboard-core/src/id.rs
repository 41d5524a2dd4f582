//! Document identifiers.
//!
//! A [`DocId`] is 12 bytes rendered as 24 lowercase hex characters: a 4-byte
//! big-endian UNIX timestamp followed by 8 random bytes. Ids created later
//! therefore sort after earlier ones at second granularity.

use std::{fmt, str::FromStr};

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId([u8; 12]);

impl DocId {
  /// Generate a fresh id stamped with the current time.
  pub fn generate() -> Self {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    OsRng.fill_bytes(&mut bytes[4..]);
    Self(bytes)
  }

  /// Parse a 24-character hex string.
  pub fn parse(s: &str) -> Result<Self> {
    if s.len() != 24 {
      return Err(Error::InvalidId(s.to_owned()));
    }
    let mut bytes = [0u8; 12];
    hex::decode_to_slice(s, &mut bytes)
      .map_err(|_| Error::InvalidId(s.to_owned()))?;
    Ok(Self(bytes))
  }

  /// Whether `s` would parse as a [`DocId`].
  pub fn is_valid(s: &str) -> bool { Self::parse(s).is_ok() }
}

impl fmt::Display for DocId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&hex::encode(self.0))
  }
}

impl FromStr for DocId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

impl Serialize for DocId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for DocId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    Self::parse(&s).map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_is_24_lowercase_hex() {
    let id = DocId::generate();
    let s = id.to_string();
    assert_eq!(s.len(), 24);
    assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(DocId::parse(&s).unwrap(), id);
  }

  #[test]
  fn rejects_wrong_length_and_non_hex() {
    assert!(DocId::parse("abc").is_err());
    assert!(DocId::parse("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    assert!(DocId::parse("507f1f77bcf86cd7994390110").is_err());
    assert!(DocId::parse("507f1f77bcf86cd799439011").is_ok());
  }

  #[test]
  fn serde_uses_string_form() {
    let id = DocId::parse("507f1f77bcf86cd799439011").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"507f1f77bcf86cd799439011\"");
    let back: DocId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
    assert!(serde_json::from_str::<DocId>("\"nope\"").is_err());
  }
}
