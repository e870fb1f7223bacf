use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use bophades_kernel::{Kernel, KernelAdapter, Module, ModuleFunction};
use bophades_ledger::NftLedger;
use bophades_types::{math, Address, Keycode, OHM_DECIMALS};
use parking_lot::RwLock;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{DepositError, Result};
use crate::position::{MintParams, Position, PositionTokenRenderer};

pub const DEPOS_KEYCODE: Keycode = Keycode::from_bytes(*b"DEPOS");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositFn {
    Mint,
    SetRemainingDeposit,
    SetAdditionalData,
    SetTokenRenderer,
}

impl ModuleFunction for DepositFn {
    fn signature(self) -> &'static str {
        match self {
            DepositFn::Mint => "mint((address,address,uint8,uint256,uint256,uint48,bool,bytes))",
            DepositFn::SetRemainingDeposit => "setRemainingDeposit(uint256,uint256)",
            DepositFn::SetAdditionalData => "setAdditionalData(uint256,bytes)",
            DepositFn::SetTokenRenderer => "setTokenRenderer(address)",
        }
    }
}

#[derive(Default)]
struct PositionBook {
    next_id: u64,
    positions: BTreeMap<u64, Position>,
    by_owner: HashMap<Address, BTreeSet<u64>>,
}

impl PositionBook {
    fn get(&self, id: u64) -> Result<&Position> {
        self.positions.get(&id).ok_or(DepositError::InvalidPositionId { id })
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Position> {
        self.positions
            .get_mut(&id)
            .ok_or(DepositError::InvalidPositionId { id })
    }

    fn insert(&mut self, position: Position) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.by_owner.entry(position.owner).or_default().insert(id);
        self.positions.insert(id, position);
        id
    }

    fn move_owner(&mut self, id: u64, from: &Address, to: &Address) {
        if let Some(ids) = self.by_owner.get_mut(from) {
            ids.remove(&id);
        }
        self.by_owner.entry(*to).or_default().insert(id);
    }
}

/// DEPOS v1.0
pub struct DepositModule {
    address: Address,
    adapter: KernelAdapter,
    nft: NftLedger,
    book: RwLock<PositionBook>,
    renderer: RwLock<Option<Arc<dyn PositionTokenRenderer>>>,
}

impl DepositModule {
    pub fn new(kernel: &Arc<Kernel>, address: Address, name: &str, symbol: &str) -> Arc<Self> {
        Arc::new(Self {
            address,
            adapter: KernelAdapter::new(kernel),
            nft: NftLedger::new(name, symbol),
            book: RwLock::new(PositionBook::default()),
            renderer: RwLock::new(None),
        })
    }

    pub fn nft(&self) -> &NftLedger {
        &self.nft
    }

    fn now(&self) -> Result<u64> {
        Ok(self.adapter.now()?)
    }

    fn only_owner(position: &Position, id: u64, caller: &Address) -> Result<()> {
        if position.owner != *caller {
            return Err(DepositError::NotOwner { id, caller: *caller });
        }
        Ok(())
    }

    fn only_operator(position: &Position, id: u64, caller: &Address) -> Result<()> {
        if position.operator != *caller {
            return Err(DepositError::NotOperator { id, caller: *caller });
        }
        Ok(())
    }

    // ========================================================================
    // Operator functions
    // ========================================================================

    /// Create a position operated by the calling policy
    pub fn mint(&self, caller: &Address, params: MintParams) -> Result<u64> {
        self.permissioned(caller, DepositFn::Mint.selector())?;
        if params.owner.is_zero() {
            return Err(DepositError::invalid("owner is the zero address"));
        }
        if params.asset.is_zero() {
            return Err(DepositError::invalid("asset is the zero address"));
        }
        if params.remaining_deposit == 0 {
            return Err(DepositError::invalid("deposit must be greater than zero"));
        }
        if params.conversion_price == 0 {
            return Err(DepositError::invalid("conversion price must be greater than zero"));
        }
        let position = Position {
            operator: *caller,
            owner: params.owner,
            asset: params.asset,
            period_months: params.period_months,
            remaining_deposit: params.remaining_deposit,
            conversion_price: params.conversion_price,
            expiry: params.expiry,
            wrapped: params.wrap,
            additional_data: params.additional_data,
        };
        if position.is_convertible() && position.expiry <= self.now()? {
            return Err(DepositError::invalid("expiry must be in the future"));
        }

        let id = self.book.write().insert(position.clone());
        if position.wrapped {
            self.nft.mint(&position.owner, id)?;
        }

        info!(
            id,
            owner = %position.owner.short(),
            remaining = position.remaining_deposit,
            wrapped = position.wrapped,
            "position created"
        );
        self.adapter.emit(
            self.address,
            "PositionCreated",
            json!({
                "positionId": id,
                "owner": position.owner,
                "asset": position.asset,
                "periodMonths": position.period_months,
                "remainingDeposit": position.remaining_deposit.to_string(),
                "conversionPrice": position.conversion_price.to_string(),
                "expiry": position.expiry,
                "wrapped": position.wrapped,
            }),
        );
        Ok(id)
    }

    pub fn set_remaining_deposit(&self, caller: &Address, id: u64, amount: u128) -> Result<()> {
        self.permissioned(caller, DepositFn::SetRemainingDeposit.selector())?;
        {
            let mut book = self.book.write();
            let position = book.get_mut(id)?;
            Self::only_operator(position, id, caller)?;
            position.remaining_deposit = amount;
        }
        debug!(id, amount, "remaining deposit updated");
        self.adapter.emit(
            self.address,
            "PositionRemainingDepositUpdated",
            json!({ "positionId": id, "remainingDeposit": amount.to_string() }),
        );
        Ok(())
    }

    pub fn set_additional_data(&self, caller: &Address, id: u64, data: Vec<u8>) -> Result<()> {
        self.permissioned(caller, DepositFn::SetAdditionalData.selector())?;
        let encoded = hex::encode(&data);
        {
            let mut book = self.book.write();
            let position = book.get_mut(id)?;
            Self::only_operator(position, id, caller)?;
            position.additional_data = data;
        }
        debug!(id, "additional data updated");
        self.adapter.emit(
            self.address,
            "PositionAdditionalDataUpdated",
            json!({ "positionId": id, "additionalData": format!("0x{encoded}") }),
        );
        Ok(())
    }

    pub fn set_token_renderer(&self, caller: &Address, renderer: Option<Arc<dyn PositionTokenRenderer>>) -> Result<()> {
        self.permissioned(caller, DepositFn::SetTokenRenderer.selector())?;
        let set = renderer.is_some();
        *self.renderer.write() = renderer;
        info!(set, "token renderer updated");
        self.adapter
            .emit(self.address, "TokenRendererSet", json!({ "set": set }));
        Ok(())
    }

    // ========================================================================
    // Owner functions
    // ========================================================================

    /// Carve `amount` out of position `id` into a new position owned by `to`
    pub fn split(&self, caller: &Address, id: u64, amount: u128, to: &Address, wrap: bool) -> Result<u64> {
        if to.is_zero() {
            return Err(DepositError::invalid("recipient is the zero address"));
        }
        let new_id = {
            let mut book = self.book.write();
            let source = book.get_mut(id)?;
            Self::only_owner(source, id, caller)?;
            if amount == 0 || amount > source.remaining_deposit {
                return Err(DepositError::invalid(format!(
                    "split amount {amount} outside (0, {}]",
                    source.remaining_deposit
                )));
            }
            source.remaining_deposit -= amount;
            let child = Position {
                owner: *to,
                remaining_deposit: amount,
                wrapped: wrap,
                ..source.clone()
            };
            book.insert(child)
        };
        if wrap {
            self.nft.mint(to, new_id)?;
        }

        info!(id, new_id, amount, to = %to.short(), "position split");
        self.adapter.emit(
            self.address,
            "PositionSplit",
            json!({ "positionId": id, "newPositionId": new_id, "amount": amount.to_string(), "to": to, "wrap": wrap }),
        );
        Ok(new_id)
    }

    /// Represent position `id` as an ERC721 token
    pub fn wrap(&self, caller: &Address, id: u64) -> Result<()> {
        {
            let mut book = self.book.write();
            let position = book.get_mut(id)?;
            Self::only_owner(position, id, caller)?;
            if position.wrapped {
                return Err(DepositError::AlreadyWrapped { id });
            }
            position.wrapped = true;
        }
        self.nft.mint(caller, id)?;
        info!(id, "position wrapped");
        self.adapter
            .emit(self.address, "PositionWrapped", json!({ "positionId": id }));
        Ok(())
    }

    pub fn unwrap(&self, caller: &Address, id: u64) -> Result<()> {
        {
            let mut book = self.book.write();
            let position = book.get_mut(id)?;
            Self::only_owner(position, id, caller)?;
            if !position.wrapped {
                return Err(DepositError::NotWrapped { id });
            }
            position.wrapped = false;
        }
        self.nft.burn(id)?;
        info!(id, "position unwrapped");
        self.adapter
            .emit(self.address, "PositionUnwrapped", json!({ "positionId": id }));
        Ok(())
    }

    // ========================================================================
    // ERC721
    // ========================================================================

    /// Transfer a wrapped position, moving position owner, owner index and token together
    pub fn transfer_from(&self, caller: &Address, from: &Address, to: &Address, id: u64) -> Result<()> {
        if !self.book.read().get(id)?.wrapped {
            return Err(DepositError::NotWrapped { id });
        }
        self.nft.transfer_from(caller, from, to, id)?;
        {
            let mut book = self.book.write();
            book.get_mut(id)?.owner = *to;
            book.move_owner(id, from, to);
        }
        info!(id, from = %from.short(), to = %to.short(), "position transferred");
        self.adapter
            .emit(self.address, "Transfer", json!({ "from": from, "to": to, "positionId": id }));
        Ok(())
    }

    pub fn approve(&self, caller: &Address, spender: &Address, id: u64) -> Result<()> {
        Ok(self.nft.approve(caller, spender, id)?)
    }

    pub fn set_approval_for_all(&self, owner: &Address, operator: &Address, approved: bool) {
        self.nft.set_approval_for_all(owner, operator, approved);
    }

    pub fn owner_of(&self, id: u64) -> Result<Address> {
        Ok(self.nft.owner_of(id)?)
    }

    /// Metadata from the configured renderer; empty without one
    pub fn token_uri(&self, id: u64) -> Result<String> {
        let position = self.get_position(id)?;
        let renderer = self.renderer.read().clone();
        Ok(renderer
            .map(|renderer| renderer.token_uri(id, &position))
            .unwrap_or_default())
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn get_position(&self, id: u64) -> Result<Position> {
        self.book.read().get(id).cloned()
    }

    pub fn get_position_count(&self) -> u64 {
        self.book.read().next_id
    }

    pub fn get_user_position_ids(&self, user: &Address) -> Vec<u64> {
        self.book
            .read()
            .by_owner
            .get(user)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_expired(&self, id: u64) -> Result<bool> {
        let position = self.get_position(id)?;
        Ok(position.is_expired(self.now()?))
    }

    pub fn is_convertible(&self, id: u64) -> Result<bool> {
        Ok(self.get_position(id)?.is_convertible())
    }

    /// OHM received for converting `amount` of the deposit; zero once expired
    pub fn preview_convert(&self, id: u64, amount: u128) -> Result<u128> {
        let position = self.get_position(id)?;
        if !position.is_convertible() {
            return Err(DepositError::NotConvertible { id });
        }
        if amount > position.remaining_deposit {
            return Err(DepositError::invalid(format!(
                "amount {amount} exceeds remaining deposit {}",
                position.remaining_deposit
            )));
        }
        if position.is_expired(self.now()?) {
            return Ok(0);
        }
        Ok(math::mul_div(amount, math::scale(OHM_DECIMALS)?, position.conversion_price)?)
    }
}

impl Module for DepositModule {
    fn keycode(&self) -> Keycode {
        DEPOS_KEYCODE
    }

    fn version(&self) -> (u8, u8) {
        (1, 0)
    }

    fn address(&self) -> Address {
        self.address
    }

    fn adapter(&self) -> &KernelAdapter {
        &self.adapter
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
