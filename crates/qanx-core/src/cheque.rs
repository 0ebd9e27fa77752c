//! Cheques: signer-authorized one-time claims on the token pool
//!
//! A cheque is signed over the ABI encoding of
//! `(uint256 chainId, address contract, address beneficiary, uint256 amount,
//! uint64 hardLockUntil, uint64 softLockUntil, uint64 allowedHops)`: seven
//! big-endian 32-byte words, hashed with keccak256 and signed as a raw
//! digest. The offline signer and the verifier both go through
//! [`ChequeDomain::encode`], so the two sides cannot drift apart.

use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::{keccak256, recover_signer, sign_digest, CompactSignature};
use crate::error::{Error, Result};
use crate::lock::LockTerms;
use crate::types::{amount_from_word, check_hops, u128_to_word, Address, Amount, ChequeId, Timestamp};

/// Number of 32-byte words in an encoded cheque
pub const CHEQUE_WORDS: usize = 7;

/// Length of an encoded cheque in bytes
pub const ENCODED_CHEQUE_LEN: usize = CHEQUE_WORDS * 32;

/// Deployment a cheque is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeDomain {
    pub chain_id: u64,
    pub contract: Address,
}

impl ChequeDomain {
    pub fn new(chain_id: u64, contract: Address) -> Self {
        Self { chain_id, contract }
    }

    /// Canonical byte encoding of `cheque` within this domain
    pub fn encode(&self, cheque: &Cheque) -> [u8; ENCODED_CHEQUE_LEN] {
        let words = [
            u128_to_word(self.chain_id as u128),
            self.contract.to_word(),
            cheque.beneficiary.to_word(),
            u128_to_word(cheque.amount),
            u128_to_word(cheque.hard_lock_until as u128),
            u128_to_word(cheque.soft_lock_until as u128),
            u128_to_word(cheque.allowed_hops as u128),
        ];

        let mut out = [0u8; ENCODED_CHEQUE_LEN];
        for (chunk, word) in out.chunks_exact_mut(32).zip(words.iter()) {
            chunk.copy_from_slice(word);
        }
        out
    }

    /// Decode a canonical encoding back into its domain and cheque.
    ///
    /// Every word is range-checked; nothing is truncated.
    pub fn decode(bytes: &[u8]) -> Result<(ChequeDomain, Cheque)> {
        if bytes.len() != ENCODED_CHEQUE_LEN {
            return Err(Error::AmountOutOfRange(format!(
                "encoded cheque must be {} bytes, got {}",
                ENCODED_CHEQUE_LEN,
                bytes.len()
            )));
        }
        let word = |i: usize| -> [u8; 32] {
            let mut w = [0u8; 32];
            w.copy_from_slice(&bytes[i * 32..(i + 1) * 32]);
            w
        };

        let chain_id = u64_from_word(&word(0))?;
        let contract = address_from_word(&word(1))?;
        let beneficiary = address_from_word(&word(2))?;
        let amount = amount_from_word(&word(3))?;
        let hard_lock_until = u64_from_word(&word(4))?;
        let soft_lock_until = u64_from_word(&word(5))?;
        let allowed_hops = check_hops(u64_from_word(&word(6))?)?;

        Ok((
            ChequeDomain::new(chain_id, contract),
            Cheque {
                beneficiary,
                amount,
                hard_lock_until,
                soft_lock_until,
                allowed_hops,
            },
        ))
    }

    /// keccak256 of the encoding; the digest that gets signed
    pub fn digest(&self, cheque: &Cheque) -> [u8; 32] {
        keccak256(&self.encode(cheque))
    }

    /// Replay identity of `cheque`. Equal tuples give equal ids, whatever
    /// signature bytes accompany them.
    pub fn id(&self, cheque: &Cheque) -> ChequeId {
        ChequeId::new(self.digest(cheque))
    }
}

fn u64_from_word(word: &[u8; 32]) -> Result<u64> {
    let value = amount_from_word(word)?;
    u64::try_from(value).map_err(|_| Error::AmountOutOfRange(format!("{} exceeds 64 bits", value)))
}

fn address_from_word(word: &[u8; 32]) -> Result<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(Error::InvalidAddress(format!("0x{}", hex::encode(word))));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::new(bytes))
}

/// The signed payload of a cheque, without its signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
    pub beneficiary: Address,
    #[serde(with = "crate::types::amount_string")]
    pub amount: Amount,
    /// 0 means no lock
    #[serde(default)]
    pub hard_lock_until: Timestamp,
    #[serde(default)]
    pub soft_lock_until: Timestamp,
    #[serde(default)]
    pub allowed_hops: u64,
}

impl Cheque {
    /// An unlocked cheque
    pub fn new(beneficiary: Address, amount: Amount) -> Self {
        Self {
            beneficiary,
            amount,
            hard_lock_until: 0,
            soft_lock_until: 0,
            allowed_hops: 0,
        }
    }

    pub fn with_lock(mut self, terms: LockTerms) -> Self {
        self.hard_lock_until = terms.hard_lock_until;
        self.soft_lock_until = terms.soft_lock_until;
        self.allowed_hops = terms.allowed_hops;
        self
    }

    pub fn terms(&self) -> LockTerms {
        LockTerms::new(self.hard_lock_until, self.soft_lock_until, self.allowed_hops)
    }

    /// Lock terms to place on the beneficiary at `now`, if any.
    ///
    /// A zero hard lock means the cheque carries no lock; one whose soft
    /// lock has already passed would be fully vested on arrival.
    pub fn lock_at(&self, now: Timestamp) -> Option<LockTerms> {
        if self.hard_lock_until == 0 || self.soft_lock_until <= now {
            return None;
        }
        Some(self.terms())
    }

    /// Sign this cheque for `domain`
    pub fn sign(&self, key: &SigningKey, domain: &ChequeDomain) -> Result<SignedCheque> {
        self.terms().check_shape()?;
        let signature = sign_digest(key, &domain.digest(self))?;
        Ok(SignedCheque {
            cheque: *self,
            signature,
        })
    }
}

/// A cheque together with the signer's compact signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCheque {
    #[serde(flatten)]
    pub cheque: Cheque,
    pub signature: CompactSignature,
}

impl SignedCheque {
    pub fn new(cheque: Cheque, signature: CompactSignature) -> Self {
        Self { cheque, signature }
    }

    /// Recover the address that signed this cheque for `domain`
    pub fn recover(&self, domain: &ChequeDomain) -> Result<Address> {
        let digest = domain.digest(&self.cheque);
        let signer = recover_signer(&digest, &self.signature)?;
        debug!("Cheque 0x{} signed by {}", hex::encode(&digest[..8]), signer);
        Ok(signer)
    }

    /// Check that this cheque was signed for `domain` by `expected`
    pub fn verify(&self, domain: &ChequeDomain, expected: &Address) -> Result<()> {
        match self.recover(domain) {
            Ok(signer) if signer == *expected => Ok(()),
            _ => Err(Error::InvalidSignature),
        }
    }

    pub fn id(&self, domain: &ChequeDomain) -> ChequeId {
        domain.id(&self.cheque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{address_of, signing_key_from_hex};

    const TOKEN: Amount = 1_000_000_000_000_000_000;

    fn signer_key() -> SigningKey {
        signing_key_from_hex("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .unwrap()
    }

    fn domain() -> ChequeDomain {
        ChequeDomain::new(1, Address::new([0xcc; 20]))
    }

    fn locked_cheque() -> Cheque {
        Cheque::new(Address::new([0xbb; 20]), 1_000 * TOKEN)
            .with_lock(LockTerms::new(1_800_000_000, 1_900_000_000, 2))
    }

    #[test]
    fn test_encoding_layout() {
        let encoded = domain().encode(&locked_cheque());

        assert_eq!(encoded.len(), 224);
        assert_eq!(encoded[31], 1);
        assert_eq!(&encoded[32..44], &[0u8; 12]);
        assert_eq!(&encoded[44..64], &[0xcc; 20]);
        assert_eq!(&encoded[76..96], &[0xbb; 20]);
        assert_eq!(&encoded[96..112], &[0u8; 16]);
        assert_eq!(&encoded[112..128], &(1_000 * TOKEN).to_be_bytes());
        assert_eq!(&encoded[152..160], &1_800_000_000u64.to_be_bytes());
        assert_eq!(&encoded[184..192], &1_900_000_000u64.to_be_bytes());
        assert_eq!(encoded[223], 2);
    }

    #[test]
    fn test_decode_inverts_encode() {
        let (decoded_domain, decoded) =
            ChequeDomain::decode(&domain().encode(&locked_cheque())).unwrap();
        assert_eq!(decoded_domain, domain());
        assert_eq!(decoded, locked_cheque());
    }

    #[test]
    fn test_decode_rejects_wide_values() {
        let mut encoded = domain().encode(&locked_cheque());
        encoded[96] = 1;
        assert!(matches!(
            ChequeDomain::decode(&encoded),
            Err(Error::AmountOutOfRange(_))
        ));

        let mut encoded = domain().encode(&locked_cheque());
        encoded[222] = 1;
        assert!(matches!(
            ChequeDomain::decode(&encoded),
            Err(Error::HopsOutOfRange(256))
        ));

        let mut encoded = domain().encode(&locked_cheque());
        encoded[64] = 1;
        assert!(matches!(
            ChequeDomain::decode(&encoded),
            Err(Error::InvalidAddress(_))
        ));

        assert!(ChequeDomain::decode(&encoded[..200]).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let key = signer_key();
        let signer = address_of(key.verifying_key());
        let signed = locked_cheque().sign(&key, &domain()).unwrap();

        assert_eq!(signed.recover(&domain()).unwrap(), signer);
        assert!(signed.verify(&domain(), &signer).is_ok());
        assert!(signed.verify(&domain(), &Address::new([1; 20])).is_err());
    }

    #[test]
    fn test_tampered_fields_fail_verification() {
        let key = signer_key();
        let signer = address_of(key.verifying_key());
        let signed = locked_cheque().sign(&key, &domain()).unwrap();

        let tampered: Vec<Box<dyn Fn(&mut Cheque)>> = vec![
            Box::new(|c| c.beneficiary = Address::new([0xdd; 20])),
            Box::new(|c| c.amount += 1),
            Box::new(|c| c.hard_lock_until -= 1),
            Box::new(|c| c.soft_lock_until += 1),
            Box::new(|c| c.allowed_hops = 3),
        ];
        for tamper in tampered {
            let mut forged = signed;
            tamper(&mut forged.cheque);
            assert!(matches!(
                forged.verify(&domain(), &signer),
                Err(Error::InvalidSignature)
            ));
        }

        // Same cheque presented to another deployment
        let other = ChequeDomain::new(2, domain().contract);
        assert!(signed.verify(&other, &signer).is_err());
    }

    #[test]
    fn test_sign_rejects_misordered_lock() {
        let cheque =
            Cheque::new(Address::new([0xbb; 20]), 1).with_lock(LockTerms::new(200, 100, 0));
        assert!(matches!(
            cheque.sign(&signer_key(), &domain()),
            Err(Error::InvalidLockOrder { .. })
        ));
    }

    #[test]
    fn test_identity_ignores_signature_bytes() {
        let signed = locked_cheque().sign(&signer_key(), &domain()).unwrap();
        let mut other = signed;
        other.signature.r[31] ^= 1;
        assert_eq!(signed.id(&domain()), other.id(&domain()));
    }

    #[test]
    fn test_lock_at() {
        let cheque = locked_cheque();
        assert_eq!(cheque.lock_at(0), Some(cheque.terms()));
        assert_eq!(cheque.lock_at(1_900_000_000), None);
        assert_eq!(Cheque::new(Address::new([1; 20]), 5).lock_at(0), None);
    }

    #[test]
    fn test_json_shape() {
        let signed = locked_cheque().sign(&signer_key(), &domain()).unwrap();
        let json = serde_json::to_value(signed).unwrap();

        assert_eq!(json["amount"], "1000000000000000000000");
        assert_eq!(json["allowed_hops"], 2);
        assert_eq!(json["signature"].as_array().unwrap().len(), 2);

        let parsed: SignedCheque = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, signed);
    }
}
