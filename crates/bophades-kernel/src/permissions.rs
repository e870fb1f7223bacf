//! The capability table: a set of `(keycode, selector, policy)` grants

use std::collections::BTreeSet;

use bophades_types::{Address, Keycode, Selector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Grant {
    pub keycode: Keycode,
    pub selector: Selector,
    pub policy: Address,
}

#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    grants: BTreeSet<Grant>,
}

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the grant already existed
    pub fn grant(&mut self, keycode: Keycode, selector: Selector, policy: Address) -> bool {
        self.grants.insert(Grant {
            keycode,
            selector,
            policy,
        })
    }

    pub fn revoke(&mut self, keycode: Keycode, selector: Selector, policy: Address) -> bool {
        self.grants.remove(&Grant {
            keycode,
            selector,
            policy,
        })
    }

    /// Remove every grant held by `policy`, returning what was removed
    pub fn revoke_all(&mut self, policy: &Address) -> Vec<Grant> {
        let revoked: Vec<Grant> = self
            .grants
            .iter()
            .filter(|grant| grant.policy == *policy)
            .copied()
            .collect();
        for grant in &revoked {
            self.grants.remove(grant);
        }
        revoked
    }

    pub fn is_granted(&self, keycode: Keycode, selector: Selector, policy: &Address) -> bool {
        self.grants.contains(&Grant {
            keycode,
            selector,
            policy: *policy,
        })
    }

    pub fn grants_for(&self, policy: &Address) -> Vec<Grant> {
        self.grants
            .iter()
            .filter(|grant| grant.policy == *policy)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
