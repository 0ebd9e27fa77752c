//! Cryptographic primitives: keccak256, secp256k1 keys and compact
//! recoverable signatures

use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::types::Address;

/// Half of the secp256k1 group order, big-endian. Signatures with `s`
/// above this bound are the malleable twin of a low-`s` signature.
pub const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Hash data using Keccak-256
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Two-word recoverable signature (EIP-2098): `r` and `yParityAndS`, where
/// the top bit of the second word carries the recovery parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature {
    pub r: [u8; 32],
    pub vs: [u8; 32],
}

impl CompactSignature {
    pub fn new(r: [u8; 32], vs: [u8; 32]) -> Self {
        Self { r, vs }
    }

    /// Pack an `(r, s, v)` signature. `v` may be 0/1 or 27/28.
    pub fn from_rsv(r: [u8; 32], s: [u8; 32], v: u8) -> Result<Self> {
        let parity = match v {
            0 | 27 => 0u8,
            1 | 28 => 1u8,
            _ => return Err(Error::InvalidSignature),
        };
        if s[0] & 0x80 != 0 {
            return Err(Error::InvalidSignature);
        }
        let mut vs = s;
        vs[0] |= parity << 7;
        Ok(Self { r, vs })
    }

    /// The `s` component with the parity bit cleared
    pub fn s(&self) -> [u8; 32] {
        let mut s = self.vs;
        s[0] &= 0x7f;
        s
    }

    pub fn y_parity(&self) -> bool {
        self.vs[0] & 0x80 != 0
    }

    /// Whether `s` lies in the lower half of the group order
    pub fn is_low_s(&self) -> bool {
        self.s() <= SECP256K1_HALF_ORDER
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..].copy_from_slice(&self.vs);
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut vs = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        vs.copy_from_slice(&bytes[32..]);
        Self { r, vs }
    }
}

impl Serialize for CompactSignature {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [
            format!("0x{}", hex::encode(self.r)),
            format!("0x{}", hex::encode(self.vs)),
        ]
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CompactSignature {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [r, vs] = <[String; 2]>::deserialize(deserializer)?;
        let decode = |s: &str| -> std::result::Result<[u8; 32], D::Error> {
            let mut out = [0u8; 32];
            hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut out)
                .map_err(serde::de::Error::custom)?;
            Ok(out)
        };
        Ok(Self {
            r: decode(&r)?,
            vs: decode(&vs)?,
        })
    }
}

/// Derive the account address of a public key: last 20 bytes of the
/// keccak256 of the uncompressed point without its prefix byte.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address::new(out)
}

/// Parse a 32-byte secret scalar from hex (with or without `0x`)
pub fn signing_key_from_hex(s: &str) -> Result<SigningKey> {
    let trimmed = s.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(
        hex::decode(stripped).map_err(|e| Error::InvalidKey(e.to_string()))?,
    );
    if bytes.len() != 32 {
        return Err(Error::InvalidKey(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| Error::InvalidKey(e.to_string()))
}

/// Generate a fresh random signing key
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut rand::rngs::OsRng)
}

/// Sign a 32-byte digest, producing a low-`s` compact signature
pub fn sign_digest(key: &SigningKey, digest: &[u8; 32]) -> Result<CompactSignature> {
    let (sig, recid) = key
        .sign_prehash_recoverable(digest)
        .map_err(|e| Error::InvalidKey(e.to_string()))?;

    // Normalizing s mirrors the point, so the parity flips with it
    let (sig, recid) = match sig.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced()),
        ),
        None => (sig, recid),
    };

    if recid.is_x_reduced() {
        return Err(Error::InvalidSignature);
    }

    let bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..]);
    CompactSignature::from_rsv(r, s, recid.is_y_odd() as u8)
}

/// Recover the signer address of a digest.
///
/// High-`s` signatures are rejected before recovery is attempted, so each
/// (message, signer) pair has exactly one acceptable signature encoding.
/// Every failure collapses to [`Error::InvalidSignature`].
pub fn recover_signer(digest: &[u8; 32], signature: &CompactSignature) -> Result<Address> {
    if !signature.is_low_s() {
        return Err(Error::InvalidSignature);
    }

    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&signature.r);
    rs[32..].copy_from_slice(&signature.s());
    let sig = K256Signature::from_slice(&rs).map_err(|_| Error::InvalidSignature)?;

    let recid = RecoveryId::new(signature.y_parity(), false);
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
        .map_err(|_| Error::InvalidSignature)?;

    Ok(address_of(&key))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// secp256k1 group order, big-endian
    const ORDER: [u8; 32] = [
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
        0x41, 0x41,
    ];

    /// n - s, big-endian
    pub(crate) fn negate_s(s: &[u8; 32]) -> [u8; 32] {
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = ORDER[i] as i16 - s[i] as i16 - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = diff as u8;
        }
        out
    }

    fn key_one() -> SigningKey {
        signing_key_from_hex(
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap()
    }

    #[test]
    fn test_keccak256_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_address_of_known_key() {
        let key = key_one();
        assert_eq!(
            address_of(key.verifying_key()).to_checksum(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = key_one();
        let digest = keccak256(b"cheque");
        let sig = sign_digest(&key, &digest).unwrap();

        assert!(sig.is_low_s());
        let signer = recover_signer(&digest, &sig).unwrap();
        assert_eq!(signer, address_of(key.verifying_key()));
    }

    #[test]
    fn test_high_s_twin_rejected() {
        let key = key_one();
        let digest = keccak256(b"malleable");
        let sig = sign_digest(&key, &digest).unwrap();

        // (r, n - s) with flipped parity recovers the same key
        let high_s = negate_s(&sig.s());
        assert!(high_s > SECP256K1_HALF_ORDER);

        let flipped = !sig.y_parity() as u8;
        match CompactSignature::from_rsv(sig.r, high_s, flipped) {
            Ok(twin) => assert!(matches!(
                recover_signer(&digest, &twin),
                Err(Error::InvalidSignature)
            )),
            Err(e) => assert!(matches!(e, Error::InvalidSignature)),
        }
    }

    #[test]
    fn test_s_above_half_order_rejected() {
        let digest = keccak256(b"bound");
        let mut s = SECP256K1_HALF_ORDER;
        s[31] += 1;
        let sig = CompactSignature::new([0x11; 32], s);
        assert!(!sig.is_low_s());
        assert!(matches!(
            recover_signer(&digest, &sig),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_zero_signature_rejected() {
        let digest = keccak256(b"zero");
        let sig = CompactSignature::new([0u8; 32], [0u8; 32]);
        assert!(matches!(
            recover_signer(&digest, &sig),
            Err(Error::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_json_shape() {
        let sig = CompactSignature::new([0x01; 32], [0x02; 32]);
        let json = serde_json::to_value(sig).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 2);
        let back: CompactSignature = serde_json::from_value(json).unwrap();
        assert_eq!(back, sig);
    }

    #[test]
    fn test_invalid_key_hex() {
        assert!(signing_key_from_hex("0x1234").is_err());
        assert!(signing_key_from_hex("not hex").is_err());
        // Zero is not a valid scalar
        assert!(signing_key_from_hex(&"00".repeat(32)).is_err());
    }
}
