//! Ledger boundary
//!
//! The engine never talks to a chain directly. It consumes three narrow
//! traits so the same plan can run against a node or an in-process ledger.

use async_trait::async_trait;
use radio_core::{Account, Address, Amount, Asset, Operation, Transfer};
use serde::{Deserialize, Serialize};

pub use alloy_primitives::TxHash;

/// One token `Transfer` event as seen in ledger history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub from: Address,
    pub to: Address,
    pub token: Address,
    pub value: Amount,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: TxHash,
}

impl ChainEvent {
    pub fn to_operation(&self) -> Operation {
        Operation::Send(Transfer {
            from: self.from,
            to: self.to,
            asset: Asset::Token(self.token),
            value: self.value,
        })
    }
}

/// Chronological order: (block number, log index)
pub fn sort_events(events: &mut [ChainEvent]) {
    events.sort_by_key(|e| (e.block_number, e.log_index));
}

/// Reads token transfer history
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Transfers of `tokens` between members of `accounts` from `from_block` on,
    /// sorted by (block number, log index)
    async fn transfer_events(
        &self,
        tokens: &[Address],
        accounts: &[Address],
        from_block: u64,
    ) -> anyhow::Result<Vec<ChainEvent>>;

    /// Block a transaction was included in, if known
    async fn transaction_block(&self, tx: TxHash) -> anyhow::Result<Option<u64>>;
}

#[async_trait]
pub trait BalanceOracle: Send + Sync {
    async fn balance(&self, address: Address, asset: Asset) -> anyhow::Result<Amount>;
}

/// Broadcasts a transfer and resolves once it is confirmed
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send_transfer(
        &self,
        signer: &Account,
        to: Address,
        asset: Asset,
        value: Amount,
    ) -> anyhow::Result<TxHash>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(block: u64, log: u64) -> ChainEvent {
        ChainEvent {
            from: Address::repeat_byte(1),
            to: Address::repeat_byte(2),
            token: Address::repeat_byte(3),
            value: 1,
            block_number: block,
            log_index: log,
            tx_hash: TxHash::repeat_byte(block as u8),
        }
    }

    #[test]
    fn test_sort_events() {
        let mut events = vec![event(2, 0), event(1, 3), event(1, 1), event(0, 9)];
        sort_events(&mut events);
        let keys: Vec<_> = events.iter().map(|e| (e.block_number, e.log_index)).collect();
        assert_eq!(keys, vec![(0, 9), (1, 1), (1, 3), (2, 0)]);
    }

    #[test]
    fn test_event_as_operation() {
        let op = event(1, 0).to_operation();
        let transfer = op.as_send().unwrap();
        assert_eq!(transfer.asset, Asset::Token(Address::repeat_byte(3)));
        assert_eq!(transfer.value, 1);
    }
}
