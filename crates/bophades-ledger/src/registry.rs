//! Token registry
//!
//! Stands in for "does this address have code": an address is a token iff it
//! is registered here.

use std::collections::HashMap;
use std::sync::Arc;

use bophades_types::Address;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{LedgerError, Result};
use crate::token::Erc20;

#[derive(Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<Address, Arc<dyn Erc20>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: Arc<dyn Erc20>) -> Address {
        let address = token.address();
        info!(symbol = token.symbol(), address = %address, "token registered");
        self.tokens.write().insert(address, token);
        address
    }

    pub fn has_code(&self, address: &Address) -> bool {
        self.tokens.read().contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Result<Arc<dyn Erc20>> {
        self.tokens
            .read()
            .get(address)
            .cloned()
            .ok_or(LedgerError::UnknownToken { address: *address })
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<Arc<dyn Erc20>> {
        self.tokens
            .read()
            .values()
            .find(|token| token.symbol() == symbol)
            .cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn Erc20>> {
        let mut tokens: Vec<_> = self.tokens.read().values().cloned().collect();
        tokens.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        tokens
    }
}
