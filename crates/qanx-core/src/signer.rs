//! Cheque signer registry
//!
//! Holds the single address whose signatures the ledger honors. Authority
//! moves only forward: the active signer may hand it to a new address, and
//! from then on only that address can move it again.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerRegistry {
    active: Address,
}

impl SignerRegistry {
    /// Create a registry with the deploy-time signer
    pub fn new(initial: Address) -> Result<Self> {
        if initial.is_zero() {
            return Err(Error::InvalidSigner(initial));
        }
        Ok(Self { active: initial })
    }

    pub fn active(&self) -> Address {
        self.active
    }

    pub fn is_active(&self, address: &Address) -> bool {
        self.active == *address
    }

    /// Delegate signing authority from `caller` to `new_signer`
    pub fn delegate(&mut self, caller: Address, new_signer: Address) -> Result<Event> {
        if caller != self.active {
            return Err(Error::Unauthorized(caller));
        }
        if new_signer.is_zero() {
            return Err(Error::InvalidSigner(new_signer));
        }

        let previous = std::mem::replace(&mut self.active, new_signer);
        info!("Cheque signer changed from {} to {}", previous, new_signer);
        Ok(Event::ChequeSignerChanged {
            previous,
            new: new_signer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_delegation_is_one_way() {
        let mut registry = SignerRegistry::new(addr(0xa)).unwrap();

        let event = registry.delegate(addr(0xa), addr(0xc)).unwrap();
        assert_eq!(
            event,
            Event::ChequeSignerChanged {
                previous: addr(0xa),
                new: addr(0xc)
            }
        );
        assert!(registry.is_active(&addr(0xc)));

        let result = registry.delegate(addr(0xa), addr(0xa));
        assert!(matches!(result, Err(Error::Unauthorized(_))));
        assert_eq!(registry.active(), addr(0xc));

        // Only the new holder can hand it back
        registry.delegate(addr(0xc), addr(0xa)).unwrap();
        assert_eq!(registry.active(), addr(0xa));
    }

    #[test]
    fn test_zero_signer_rejected() {
        assert!(SignerRegistry::new(Address::ZERO).is_err());

        let mut registry = SignerRegistry::new(addr(1)).unwrap();
        let result = registry.delegate(addr(1), Address::ZERO);
        assert!(matches!(result, Err(Error::InvalidSigner(_))));
        assert_eq!(registry.active(), addr(1));
    }
}
