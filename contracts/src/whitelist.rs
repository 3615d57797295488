//! # Whitelist Registry
//!
//! The set of buyers allowed to mint while the presale is running. It only
//! grows: there is no removal path, so a buyer admitted once stays admitted.

use std::collections::BTreeSet;

use presale_protocol::Address;
use serde::{Deserialize, Serialize};

/// Presale allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Whitelist {
    members: BTreeSet<Address>,
}

impl Whitelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits every identity in `identities`. Already-listed entries and
    /// duplicates within the batch are ignored. Returns how many were new.
    pub fn add_all<'a, I>(&mut self, identities: I) -> usize
    where
        I: IntoIterator<Item = &'a Address>,
    {
        identities
            .into_iter()
            .filter(|addr| self.members.insert(**addr))
            .count()
    }

    pub fn contains(&self, identity: &Address) -> bool {
        self.members.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
