//! Core primitives: addresses, amounts, timestamps and cheque identities

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::keccak256;
use crate::error::{Error, Result};
use crate::MAX_HOPS;

/// Token quantity in base units (10^-18 of a token)
pub type Amount = u128;

/// UNIX timestamp in seconds
pub type Timestamp = u64;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, never a valid recipient
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse from hex, with or without the `0x` prefix. Mixed case is
    /// accepted without checksum enforcement.
    pub fn from_hex(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(stripped, &mut bytes)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))?;
        Ok(Self(bytes))
    }

    /// Lowercase hex with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// EIP-55 mixed-case checksum form
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Left-padded 32-byte ABI word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Replay identity of a cheque: keccak256 of its signed encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChequeId(#[serde(with = "hex_bytes_32")] pub [u8; 32]);

impl ChequeId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Short display format (first 4 bytes as hex)
    pub fn short(&self) -> String {
        format!("0x{}...", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ChequeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChequeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChequeId({})", self.short())
    }
}

/// Big-endian 32-byte word for an unsigned integer
pub fn u128_to_word(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Decode a 32-byte uint256 word into an [`Amount`], rejecting values
/// that do not fit in 128 bits.
pub fn amount_from_word(word: &[u8; 32]) -> Result<Amount> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(Error::AmountOutOfRange(format!(
            "0x{} exceeds 128 bits",
            hex::encode(word)
        )));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

/// Validate a hop count received as an unsigned wire value
pub fn check_hops(hops: u64) -> Result<u64> {
    if hops > MAX_HOPS {
        return Err(Error::HopsOutOfRange(hops as i128));
    }
    Ok(hops)
}

/// Convert a signed hop count from an outer surface (CLI, JSON) into the
/// unsigned hop field. Negative values are rejected, never wrapped.
pub fn hops_from_signed(hops: i64) -> Result<u64> {
    if hops < 0 || hops as u64 > MAX_HOPS {
        return Err(Error::HopsOutOfRange(hops as i128));
    }
    Ok(hops as u64)
}

/// Largest decimals value whose scale still fits in an [`Amount`]
pub const MAX_DECIMALS: u8 = 38;

/// Parse a decimal token quantity (e.g. `"1234.56"`) into base units
pub fn parse_units(value: &str, decimals: u8) -> Result<Amount> {
    let out_of_range = || Error::AmountOutOfRange(value.to_string());

    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(out_of_range());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(out_of_range());
    }
    if frac_part.len() > decimals as usize {
        return Err(Error::AmountOutOfRange(format!(
            "{} has more than {} decimal places",
            value, decimals
        )));
    }

    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(out_of_range)?;
    let whole: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| out_of_range())?
    };

    let mut frac: u128 = 0;
    if !frac_part.is_empty() {
        let padding = decimals as u32 - frac_part.len() as u32;
        let digits: u128 = frac_part.parse().map_err(|_| out_of_range())?;
        frac = 10u128
            .checked_pow(padding)
            .and_then(|p| digits.checked_mul(p))
            .ok_or_else(out_of_range)?;
    }

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(out_of_range)
}

/// Format base units as a decimal token quantity, trimming trailing zeros
pub fn format_units(amount: Amount, decimals: u8) -> String {
    let (whole, frac) = match 10u128.checked_pow(decimals as u32) {
        Some(scale) => (amount / scale, amount % scale),
        // Every amount is below a scale wider than 128 bits
        None => (0, amount),
    };
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Serde helper for 32-byte arrays as hex strings
pub mod hex_bytes_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(stripped, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

/// Serde helper for amounts as decimal strings (TOML has no 128-bit integers)
pub mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
