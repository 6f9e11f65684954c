//! In-process ledger
//!
//! An append-only simulated chain: one block per broadcast, native and token
//! balances, and `Transfer` events for token movements. Used for dry runs
//! (`radio simulate`) and tests.

use std::collections::HashMap;

use alloy_primitives::keccak256;
use async_trait::async_trait;
use radio_core::{Account, Address, Amount, Asset};
use tokio::sync::Mutex;

use crate::ledger::{sort_events, BalanceOracle, Broadcaster, ChainEvent, LedgerReader, TxHash};

/// A transfer broadcast through the ledger, native ones included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Broadcast {
    pub tx_hash: TxHash,
    pub from: Address,
    pub to: Address,
    pub asset: Asset,
    pub value: Amount,
    pub block_number: u64,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(Address, Asset), Amount>,
    events: Vec<ChainEvent>,
    broadcasts: Vec<Broadcast>,
    block: u64,
    /// Reject every broadcast once this many have been accepted
    fail_after: Option<usize>,
}

impl LedgerState {
    fn next_tx(&mut self) -> (TxHash, u64) {
        self.block += 1;
        let hash = keccak256(format!("memory-ledger:{}", self.block));
        (hash, self.block)
    }

    fn balance(&self, address: Address, asset: Asset) -> Amount {
        self.balances.get(&(address, asset)).copied().unwrap_or(0)
    }

    fn debit(&mut self, address: Address, asset: Asset, amount: Amount) -> anyhow::Result<()> {
        let balance = self.balance(address, asset);
        if balance < amount {
            anyhow::bail!("{address} holds {balance} {asset}, needs {amount}");
        }
        self.balances.insert((address, asset), balance - amount);
        Ok(())
    }

    fn credit(&mut self, address: Address, asset: Asset, amount: Amount) {
        *self.balances.entry((address, asset)).or_default() += amount;
    }
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    fee: Amount,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_fee(0)
    }

    /// Every broadcast burns `fee` native units from the sender
    pub fn with_fee(fee: Amount) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            fee,
        }
    }

    /// Mint `amount` to `address` outside of any transaction
    pub async fn fund(&self, address: Address, asset: Asset, amount: Amount) {
        self.state.lock().await.credit(address, asset, amount);
    }

    /// Record a token transfer nobody in the channel broadcast (noise)
    pub async fn foreign_transfer(
        &self,
        from: Address,
        to: Address,
        token: Address,
        value: Amount,
    ) -> ChainEvent {
        let mut state = self.state.lock().await;
        let (tx_hash, block_number) = state.next_tx();
        let event = ChainEvent {
            from,
            to,
            token,
            value,
            block_number,
            log_index: 0,
            tx_hash,
        };
        state.events.push(event);
        event
    }

    /// Make broadcasts fail once `accepted` more have gone through
    pub async fn fail_after(&self, accepted: usize) {
        let mut state = self.state.lock().await;
        state.fail_after = Some(state.broadcasts.len() + accepted);
    }

    pub async fn events(&self) -> Vec<ChainEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn broadcasts(&self) -> Vec<Broadcast> {
        self.state.lock().await.broadcasts.clone()
    }

    pub async fn block_number(&self) -> u64 {
        self.state.lock().await.block
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn transfer_events(
        &self,
        tokens: &[Address],
        accounts: &[Address],
        from_block: u64,
    ) -> anyhow::Result<Vec<ChainEvent>> {
        let state = self.state.lock().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| {
                e.block_number >= from_block
                    && tokens.contains(&e.token)
                    && accounts.contains(&e.from)
                    && accounts.contains(&e.to)
            })
            .copied()
            .collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn transaction_block(&self, tx: TxHash) -> anyhow::Result<Option<u64>> {
        let state = self.state.lock().await;
        let block = state
            .broadcasts
            .iter()
            .map(|b| (b.tx_hash, b.block_number))
            .chain(state.events.iter().map(|e| (e.tx_hash, e.block_number)))
            .find(|(hash, _)| *hash == tx)
            .map(|(_, block)| block);
        Ok(block)
    }
}

#[async_trait]
impl BalanceOracle for MemoryLedger {
    async fn balance(&self, address: Address, asset: Asset) -> anyhow::Result<Amount> {
        Ok(self.state.lock().await.balance(address, asset))
    }
}

#[async_trait]
impl Broadcaster for MemoryLedger {
    async fn send_transfer(
        &self,
        signer: &Account,
        to: Address,
        asset: Asset,
        value: Amount,
    ) -> anyhow::Result<TxHash> {
        let mut state = self.state.lock().await;
        if state.fail_after.is_some_and(|limit| state.broadcasts.len() >= limit) {
            anyhow::bail!("broadcast rejected by node");
        }

        let from = signer.address;
        let native_cost = match asset {
            Asset::Native => self.fee + value,
            Asset::Token(_) => self.fee,
        };
        if state.balance(from, Asset::Native) < native_cost {
            anyhow::bail!("{from} cannot pay {native_cost} native for transfer");
        }
        if let Asset::Token(_) = asset {
            state.debit(from, asset, value)?;
        }
        state.debit(from, Asset::Native, native_cost)?;
        state.credit(to, asset, value);

        let (tx_hash, block_number) = state.next_tx();
        if let Asset::Token(token) = asset {
            state.events.push(ChainEvent {
                from,
                to,
                token,
                value,
                block_number,
                log_index: 0,
                tx_hash,
            });
        }
        state.broadcasts.push(Broadcast {
            tx_hash,
            from,
            to,
            asset,
            value,
            block_number,
        });

        Ok(tx_hash)
    }
}
