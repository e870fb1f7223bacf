//! BridgeTokenPool - burn/mint OHM across chains
//!
//! Sending burns OHM here and raises both the pool's MINTR approval and the
//! SPPLY cross-chain supply, so OHM arriving back can be minted against the
//! approval it left behind. A receipt that cannot be released is parked and
//! can be retried later; it never fails the relayer's delivery.

use std::collections::BTreeMap;
use std::sync::Arc;

use bophades_kernel::{require_version, Dependency, Kernel, KernelAdapter, ModuleFunction, Permissions, Policy};
use bophades_minter::{MinterFn, MinterModule, MINTR_KEYCODE};
use bophades_roles::{RolesModule, ROLES_KEYCODE};
use bophades_supply::{SupplyFn, SupplyModule, SPPLY_KEYCODE};
use bophades_types::{math, Address, Keycode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enabler::{Enabled, PolicyEnabler};
use crate::error::{PolicyError, Result};

/// A cross-chain OHM transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMessage {
    pub id: Uuid,
    /// Destination chain when sent, source chain when received
    pub chain: u64,
    pub sender: Address,
    pub recipient: Address,
    pub amount: u128,
}

/// A received message whose release failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMessage {
    pub message: BridgeMessage,
    pub error_code: String,
    pub reason: String,
}

#[derive(Default)]
struct BridgeState {
    bridged_supply: u128,
    failed: BTreeMap<Uuid, FailedMessage>,
}

pub struct BridgeTokenPool {
    address: Address,
    adapter: KernelAdapter,
    enabler: PolicyEnabler,
    relayer: Address,
    roles: Dependency<RolesModule>,
    minter: Dependency<MinterModule>,
    supply: Dependency<SupplyModule>,
    state: RwLock<BridgeState>,
}

impl BridgeTokenPool {
    pub fn new(kernel: &Arc<Kernel>, address: Address, relayer: Address) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            enabler: PolicyEnabler::new(),
            relayer,
            roles: Dependency::new(ROLES_KEYCODE),
            minter: Dependency::new(MINTR_KEYCODE),
            supply: Dependency::new(SPPLY_KEYCODE),
            state: RwLock::new(BridgeState::default()),
        })
    }

    pub fn relayer(&self) -> Address {
        self.relayer
    }

    /// OHM currently on other chains through this pool
    pub fn bridged_supply(&self) -> u128 {
        self.state.read().bridged_supply
    }

    pub fn get_failed_message(&self, id: &Uuid) -> Option<FailedMessage> {
        self.state.read().failed.get(id).cloned()
    }

    pub fn failed_messages(&self) -> Vec<Uuid> {
        self.state.read().failed.keys().copied().collect()
    }

    fn check_sync(&self, minter: &MinterModule) -> Result<()> {
        let approval = minter.mint_approval(&self.address);
        let bridged = self.bridged_supply();
        if approval != bridged {
            return Err(PolicyError::MintApprovalOutOfSync { approval, bridged });
        }
        Ok(())
    }

    /// Burn `amount` of the caller's OHM and emit a message for `chain`
    ///
    /// The caller must have approved MINTR to spend the OHM.
    pub fn send(&self, caller: &Address, chain: u64, recipient: Address, amount: u128) -> Result<BridgeMessage> {
        self.enabler.require_enabled()?;
        if recipient.is_zero() {
            return Err(PolicyError::invalid("recipient is the zero address"));
        }
        let minter = self.minter.get()?;
        let supply = self.supply.get()?;
        let bridged = math::checked_add(self.bridged_supply(), amount)?;
        // nothing is burned unless the approval and supply updates can follow
        math::checked_add(minter.mint_approval(&self.address), amount)?;
        math::checked_add(supply.total_cross_chain_supply(), amount)?;
        self.ensure_permitted(&*minter, MinterFn::IncreaseMintApproval.selector())?;
        self.ensure_permitted(&*supply, SupplyFn::IncreaseCrossChainSupply.selector())?;

        minter.burn_ohm(&self.address, caller, amount)?;
        minter.increase_mint_approval(&self.address, &self.address, amount)?;
        supply.increase_cross_chain_supply(&self.address, amount)?;
        self.state.write().bridged_supply = bridged;

        let message = BridgeMessage {
            id: Uuid::new_v4(),
            chain,
            sender: *caller,
            recipient,
            amount,
        };
        info!(id = %message.id, chain, amount, "bridge message sent");
        self.adapter.emit(
            self.address,
            "MessageSent",
            json!({ "id": message.id, "chain": chain, "sender": caller, "recipient": recipient, "amount": amount.to_string() }),
        );
        Ok(message)
    }

    /// Deliver an inbound message; failures are parked rather than returned
    pub fn receive(&self, caller: &Address, message: BridgeMessage) -> Result<()> {
        if *caller != self.relayer {
            return Err(PolicyError::InvalidRelayer { caller: *caller });
        }
        match self.release(&message) {
            Ok(()) => {
                info!(id = %message.id, amount = message.amount, "bridge message received");
                self.adapter.emit(
                    self.address,
                    "MessageReceived",
                    json!({ "id": message.id, "recipient": message.recipient, "amount": message.amount.to_string() }),
                );
            }
            Err(err) => {
                warn!(id = %message.id, error = %err, "bridge message parked");
                self.adapter.emit(
                    self.address,
                    "MessageFailed",
                    json!({ "id": message.id, "code": err.error_code(), "reason": err.to_string() }),
                );
                let failed = FailedMessage {
                    error_code: err.error_code().to_string(),
                    reason: err.to_string(),
                    message,
                };
                self.state.write().failed.insert(failed.message.id, failed);
            }
        }
        Ok(())
    }

    /// Release a parked message again; it is removed once released
    pub fn retry_failed_message(&self, id: &Uuid) -> Result<()> {
        let failed = self
            .get_failed_message(id)
            .ok_or(PolicyError::FailedMessageNotFound { id: *id })?;
        self.release(&failed.message)?;
        self.state.write().failed.remove(id);
        info!(%id, "failed bridge message retried");
        self.adapter
            .emit(self.address, "MessageRetried", json!({ "id": id }));
        Ok(())
    }

    fn release(&self, message: &BridgeMessage) -> Result<()> {
        self.enabler.require_enabled()?;
        if message.recipient.is_zero() {
            return Err(PolicyError::invalid("recipient is the zero address"));
        }
        let minter = self.minter.get()?;
        let supply = self.supply.get()?;
        self.check_sync(&minter)?;
        if message.amount > self.bridged_supply() {
            return Err(PolicyError::invalid("amount exceeds bridged supply"));
        }
        if message.amount > supply.total_cross_chain_supply() {
            return Err(PolicyError::invalid("amount exceeds cross-chain supply"));
        }

        minter.mint_ohm(&self.address, &message.recipient, message.amount)?;
        supply.decrease_cross_chain_supply(&self.address, message.amount)?;
        self.state.write().bridged_supply -= message.amount;
        Ok(())
    }
}

impl Enabled for BridgeTokenPool {
    fn enabler(&self) -> &PolicyEnabler {
        &self.enabler
    }

    fn roles(&self) -> Result<Arc<RolesModule>> {
        Ok(self.roles.get()?)
    }

    fn on_enable(&self) -> Result<()> {
        let minter = self.minter.get()?;
        self.check_sync(&minter)
    }
}

impl Policy for BridgeTokenPool {
    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn configure_dependencies(&self) -> bophades_kernel::Result<Vec<Keycode>> {
        let kernel = self.adapter.kernel()?;
        let roles = self.roles.bind(&kernel)?;
        let minter = self.minter.bind(&kernel)?;
        let supply = self.supply.bind(&kernel)?;
        require_version(roles.as_ref(), 1)?;
        require_version(minter.as_ref(), 1)?;
        require_version(supply.as_ref(), 1)?;
        Ok(vec![ROLES_KEYCODE, MINTR_KEYCODE, SPPLY_KEYCODE])
    }

    fn request_permissions(&self) -> Vec<Permissions> {
        vec![
            Permissions::new(MINTR_KEYCODE, MinterFn::MintOhm),
            Permissions::new(MINTR_KEYCODE, MinterFn::BurnOhm),
            Permissions::new(MINTR_KEYCODE, MinterFn::IncreaseMintApproval),
            Permissions::new(SPPLY_KEYCODE, SupplyFn::IncreaseCrossChainSupply),
            Permissions::new(SPPLY_KEYCODE, SupplyFn::DecreaseCrossChainSupply),
        ]
    }
}
