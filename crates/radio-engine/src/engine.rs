//! Plan execution
//!
//! Operations run strictly one after another: ledger order is the encoding,
//! so operation `i + 1` is never broadcast before operation `i` is confirmed.
//!
//! ```text
//! Pending(0) -> Pending(1) -> ... -> Pending(n - 1) -> Done
//! ```
//!
//! - `Send`: top up the sender's gas if it is under `min_gas`, then broadcast.
//! - `Wait`: look at the next pending send. Fund its sender's gas and tokens
//!   if short, otherwise broadcast a random decoy transfer. Either way the
//!   slot produces exactly one token transfer, which is what the decoder
//!   skips over. A wait with no send after it broadcasts nothing.
//!
//! An error aborts the rest of the plan. Broadcasts already confirmed stay on
//! the ledger and are reported in [`EngineError::Execution`]. Transport
//! failures are not retried: the node may have accepted a transfer whose
//! confirmation timed out, and a duplicate would corrupt the encoding.

use std::time::Instant;

use radio_core::{Address, Amount, Asset, Operation, Plan, RadioConfig, Transfer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::cache::BalanceCache;
use crate::error::{EngineError, Result};
use crate::ledger::{BalanceOracle, Broadcaster, TxHash};
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastKind {
    Payload,
    Decoy,
    GasFunding,
    TokenFunding,
}

impl BroadcastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastKind::Payload => metrics::KIND_PAYLOAD,
            BroadcastKind::Decoy => metrics::KIND_DECOY,
            BroadcastKind::GasFunding => metrics::KIND_GAS_FUNDING,
            BroadcastKind::TokenFunding => metrics::KIND_TOKEN_FUNDING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Next operation to run
    Pending(usize),
    Done,
}

pub struct ExecutionEngine<'a, L> {
    config: &'a RadioConfig,
    ledger: &'a L,
    cache: BalanceCache,
    rng: StdRng,
    state: ExecutionState,
    confirmed: Vec<TxHash>,
}

impl<'a, L: BalanceOracle + Broadcaster> ExecutionEngine<'a, L> {
    pub fn new(config: &'a RadioConfig, ledger: &'a L) -> Self {
        Self::with_rng(config, ledger, StdRng::from_entropy())
    }

    /// Decoy choices come from `rng`; seed it for reproducible runs
    pub fn with_rng(config: &'a RadioConfig, ledger: &'a L, rng: StdRng) -> Self {
        Self {
            config,
            ledger,
            cache: BalanceCache::new(),
            rng,
            state: ExecutionState::Done,
            confirmed: Vec::new(),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }

    /// Native amount sent to an account that falls under `min_gas`
    pub fn gas_top_up(&self) -> Amount {
        self.config.min_gas.saturating_mul(3) / 2
    }

    /// Broadcast every operation of `plan` in order.
    ///
    /// Returns all confirmed transaction hashes, funding and decoys included.
    pub async fn execute(&mut self, plan: Plan) -> Result<Vec<TxHash>> {
        self.confirmed.clear();
        self.state = if plan.is_empty() {
            ExecutionState::Done
        } else {
            ExecutionState::Pending(0)
        };

        info!(
            operations = plan.len(),
            sends = plan.sends().count(),
            "Executing plan"
        );

        while let ExecutionState::Pending(index) = self.state {
            debug!(operation = index + 1, total = plan.len(), "Operation");

            let result = match plan.operations()[index] {
                Operation::Send(transfer) => self.send(&transfer).await.map(drop),
                Operation::Wait => self.wait(plan.next_send(index + 1).copied()).await,
            };

            if let Err(err) = result {
                warn!(
                    index,
                    confirmed = self.confirmed.len(),
                    error = %err,
                    "Plan aborted"
                );
                return Err(EngineError::Execution {
                    index,
                    confirmed: std::mem::take(&mut self.confirmed),
                    source: Box::new(err),
                });
            }

            self.state = if index + 1 < plan.len() {
                ExecutionState::Pending(index + 1)
            } else {
                ExecutionState::Done
            };
        }

        info!(broadcasts = self.confirmed.len(), "Plan executed");
        Ok(std::mem::take(&mut self.confirmed))
    }

    async fn send(&mut self, transfer: &Transfer) -> Result<TxHash> {
        self.ensure_gas(transfer.from).await?;
        self.broadcast(transfer, BroadcastKind::Payload).await
    }

    async fn wait(&mut self, next: Option<Transfer>) -> Result<()> {
        let Some(next) = next else {
            debug!("No pending send after wait, skipping");
            return Ok(());
        };

        self.ensure_gas(next.from).await?;

        let held = self.balance(next.from, next.asset).await?;
        if held < next.value {
            warn!(
                account = %next.from,
                asset = %next.asset,
                held,
                needed = next.value,
                "Not enough tokens for the next transfer, supplying"
            );
            self.supply(next.from, next.asset, next.value).await?;
        } else {
            self.decoy(&next).await?;
        }
        Ok(())
    }

    async fn ensure_gas(&mut self, account: Address) -> Result<()> {
        let gas = self.balance(account, Asset::Native).await?;
        if gas < self.config.min_gas {
            warn!(
                %account,
                gas,
                min_gas = self.config.min_gas,
                "Not enough gas for the next transfer, supplying"
            );
            self.supply_gas(account).await?;
        }
        Ok(())
    }

    /// Send `1.5 * min_gas` from the first account holding more than `2.5 * min_gas`
    async fn supply_gas(&mut self, recipient: Address) -> Result<TxHash> {
        let config = self.config;
        let quantity = self.gas_top_up();
        let threshold = config.min_gas.saturating_add(quantity);

        for donor in config.accounts.iter().map(|a| a.address) {
            if donor == recipient {
                continue;
            }
            if self.balance(donor, Asset::Native).await? > threshold {
                let transfer = Transfer {
                    from: donor,
                    to: recipient,
                    asset: Asset::Native,
                    value: quantity,
                };
                return self.broadcast(&transfer, BroadcastKind::GasFunding).await;
            }
        }

        Err(EngineError::InsufficientFunds {
            account: recipient,
            asset: Asset::Native,
            required: quantity,
        })
    }

    /// Send `quantity` of `asset` from the first account that can afford it
    async fn supply(&mut self, recipient: Address, asset: Asset, quantity: Amount) -> Result<TxHash> {
        let config = self.config;
        for donor in config.accounts.iter().map(|a| a.address) {
            if donor == recipient {
                continue;
            }
            if self.can_pay(donor, asset, quantity).await? {
                let transfer = Transfer {
                    from: donor,
                    to: recipient,
                    asset,
                    value: quantity,
                };
                return self.broadcast(&transfer, BroadcastKind::TokenFunding).await;
            }
        }

        Err(EngineError::InsufficientFunds {
            account: recipient,
            asset,
            required: quantity,
        })
    }

    /// Random token transfer between pool accounts that leaves `next` payable
    ///
    /// The sender is the first account, from a random offset, able to pay;
    /// the recipient is drawn among the others afterwards. Each token is tried
    /// at a random value and then at value 1 before giving up.
    async fn decoy(&mut self, next: &Transfer) -> Result<TxHash> {
        let config = self.config;
        let accounts = config.accounts.len();
        let tokens = config.tokens.len();
        let first_token = self.rng.gen_range(0..tokens);
        let offset = self.rng.gen_range(0..accounts);
        let value = self.rng.gen_range(1..=config.fractions as Amount);

        for t in 0..tokens {
            let asset = Asset::Token(config.tokens[(first_token + t) % tokens]);
            for value in [value, 1] {
                for step in 0..accounts {
                    let from_index = (offset + step) % accounts;
                    let from = config.accounts[from_index].address;
                    let reserved = if from == next.from && asset == next.asset {
                        next.value
                    } else {
                        0
                    };
                    if !self.can_pay(from, asset, value.saturating_add(reserved)).await? {
                        continue;
                    }

                    let mut to_index = self.rng.gen_range(0..accounts - 1);
                    if to_index >= from_index {
                        to_index += 1;
                    }
                    let transfer = Transfer {
                        from,
                        to: config.accounts[to_index].address,
                        asset,
                        value,
                    };
                    return self.broadcast(&transfer, BroadcastKind::Decoy).await;
                }
            }
        }

        Err(EngineError::InsufficientFunds {
            account: next.from,
            asset: Asset::Token(config.tokens[first_token]),
            required: 1,
        })
    }

    async fn can_pay(&mut self, account: Address, asset: Asset, quantity: Amount) -> Result<bool> {
        let gas = self.balance(account, Asset::Native).await?;
        match asset {
            Asset::Native => Ok(gas >= self.config.min_gas.saturating_add(quantity)),
            Asset::Token(_) => {
                Ok(gas >= self.config.min_gas && self.balance(account, asset).await? >= quantity)
            }
        }
    }

    async fn balance(&mut self, address: Address, asset: Asset) -> Result<Amount> {
        self.cache.fetch(self.ledger, address, asset).await
    }

    async fn broadcast(&mut self, transfer: &Transfer, kind: BroadcastKind) -> Result<TxHash> {
        let config = self.config;
        let signer = config
            .account(&transfer.from)
            .ok_or(EngineError::UnknownAccount(transfer.from))?;

        let started = Instant::now();
        let tx = match self
            .ledger
            .send_transfer(signer, transfer.to, transfer.asset, transfer.value)
            .await
        {
            Ok(tx) => tx,
            Err(err) => {
                metrics::record_broadcast_failure(kind.as_str());
                return Err(EngineError::transport(err));
            }
        };
        metrics::record_broadcast(kind.as_str(), started.elapsed());
        self.confirmed.push(tx);

        info!(
            kind = kind.as_str(),
            from = %transfer.from,
            to = %transfer.to,
            asset = %transfer.asset,
            value = transfer.value,
            tx = %tx,
            "Transfer confirmed"
        );

        let mut touched = vec![(transfer.from, transfer.asset), (transfer.to, transfer.asset)];
        if transfer.asset != Asset::Native {
            touched.push((transfer.from, Asset::Native));
            touched.push((transfer.to, Asset::Native));
        }
        for (address, asset) in touched {
            self.cache.refresh(self.ledger, address, asset).await?;
        }

        Ok(tx)
    }
}
