//! # Value Objects
//!
//! Immutable domain primitives for the State Store and Storage Adapter.
//! Kept independent from `qc-11-smart-contracts`'s own `Address`/`Hash` —
//! the State Store is a leaf component with no dependency on the Execution
//! Engine (see DESIGN.md's cyclic-reference note).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::StateError;

fn decode_fixed_hex(s: &str, expected_bytes: usize) -> Option<Vec<u8>> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    if stripped.len() != expected_bytes * 2 {
        return None;
    }
    let mut out = vec![0u8; expected_bytes];
    for i in 0..expected_bytes {
        out[i] = u8::from_str_radix(&stripped[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// Parses a 40-hex-char (optionally `0x`-prefixed) string into an [`Address`].
pub fn parse_address(s: &str) -> Result<Address, StateError> {
    let bytes = decode_fixed_hex(s, 20).ok_or_else(|| StateError::InvalidAddress(s.to_string()))?;
    Ok(Address::from_slice(&bytes).expect("decode_fixed_hex guarantees 20 bytes"))
}

/// Parses a 64-hex-char (optionally `0x`-prefixed) string into a [`Hash`].
pub fn parse_hash(s: &str) -> Result<Hash, StateError> {
    let bytes = decode_fixed_hex(s, 32).ok_or_else(|| StateError::InvalidHash(s.to_string()))?;
    Ok(Hash::from_slice(&bytes).expect("decode_fixed_hex guarantees 32 bytes"))
}

/// A 20-byte contract/account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. Invalid as a contract address (spec.md §3).
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 20 {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase hex, no `0x` prefix — used for the Storage Adapter's scoped
    /// key layout (`"<address-hex>:<hash-hex>"`, spec.md §4.3/§6).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}..{}", hex::encode(&self.0[..4]), hex::encode(&self.0[18..]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte hash: code hashes, storage keys, block hashes, state commitments.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub const ZERO: Self = Self([0u8; 32]);

    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 32 {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}..{}", hex::encode(&self.0[..4]), hex::encode(&self.0[28..]))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_roundtrip() {
        let mut bytes = [0u8; 20];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let addr = Address::new(bytes);
        let rendered = addr.to_string();
        assert_eq!(rendered.len(), 42);
        assert_eq!(parse_address(&rendered).unwrap(), addr);
        assert_eq!(parse_address(&rendered[2..]).unwrap(), addr);
    }

    #[test]
    fn hash_display_roundtrip() {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let hash = Hash::new(bytes);
        let rendered = hash.to_string();
        assert_eq!(rendered.len(), 66);
        assert_eq!(parse_hash(&rendered).unwrap(), hash);
    }

    #[test]
    fn parse_address_rejects_wrong_length() {
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn parse_address_rejects_non_hex() {
        assert!(parse_address(&format!("0x{}", "zz".repeat(20))).is_err());
    }

    #[test]
    fn zero_address_is_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::new([1u8; 20]).is_zero());
    }
}
