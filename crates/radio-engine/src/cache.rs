use std::collections::HashMap;

use radio_core::{Address, Amount, Asset};

use crate::error::{EngineError, Result};
use crate::ledger::BalanceOracle;

/// Last known balances, owned by one execution engine
///
/// Entries are dropped explicitly after every transfer that touches them.
pub struct BalanceCache {
    balances: HashMap<(Address, Asset), Amount>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    pub fn get(&self, address: &Address, asset: &Asset) -> Option<Amount> {
        self.balances.get(&(*address, *asset)).copied()
    }

    pub fn insert(&mut self, address: Address, asset: Asset, balance: Amount) {
        self.balances.insert((address, asset), balance);
    }

    pub fn invalidate(&mut self, address: &Address, asset: &Asset) -> Option<Amount> {
        self.balances.remove(&(*address, *asset))
    }

    /// Cached balance, or ask the oracle and remember the answer
    pub async fn fetch<O: BalanceOracle + ?Sized>(
        &mut self,
        oracle: &O,
        address: Address,
        asset: Asset,
    ) -> Result<Amount> {
        if let Some(balance) = self.get(&address, &asset) {
            return Ok(balance);
        }
        let balance = oracle
            .balance(address, asset)
            .await
            .map_err(EngineError::transport)?;
        self.insert(address, asset, balance);
        Ok(balance)
    }

    /// Drop the entry and read it again
    pub async fn refresh<O: BalanceOracle + ?Sized>(
        &mut self,
        oracle: &O,
        address: Address,
        asset: Asset,
    ) -> Result<Amount> {
        self.invalidate(&address, &asset);
        self.fetch(oracle, address, asset).await
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}
