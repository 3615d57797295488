//! # Ownership Guard
//!
//! A single privileged identity gates every configuration change. The guard
//! does not know what it protects; the ledger calls [`Ownable::ensure_owner`]
//! before touching owner-only fields.

use presale_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::error::PresaleError;

/// Tracks the owner of a contract instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: Address,
}

impl Ownable {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Fails with [`PresaleError::Unauthorized`] unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), PresaleError> {
        if *caller != self.owner {
            tracing::warn!(%caller, owner = %self.owner, "owner-only call rejected");
            return Err(PresaleError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Hands ownership to `new_owner`. Only the current owner may do this.
    /// Returns the previous owner.
    pub fn transfer(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<Address, PresaleError> {
        self.ensure_owner(caller)?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes_guard() {
        let owner = Address::repeat_byte(1);
        let guard = Ownable::new(owner);
        assert!(guard.ensure_owner(&owner).is_ok());
    }

    #[test]
    fn stranger_is_rejected() {
        let guard = Ownable::new(Address::repeat_byte(1));
        let stranger = Address::repeat_byte(2);
        assert_eq!(
            guard.ensure_owner(&stranger),
            Err(PresaleError::Unauthorized { caller: stranger })
        );
    }

    #[test]
    fn transfer_moves_privilege() {
        let old = Address::repeat_byte(1);
        let new = Address::repeat_byte(2);
        let mut guard = Ownable::new(old);

        assert_eq!(guard.transfer(&old, new), Ok(old));
        assert_eq!(guard.owner(), new);
        assert!(guard.ensure_owner(&old).is_err());
        assert!(guard.transfer(&old, old).is_err());
    }
}
