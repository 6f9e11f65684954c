//! Channel facade tying configuration, codec and ledger together

use std::sync::{Mutex, PoisonError};

use radio_core::{Codec, ContentType, Frame, Plan, RadioConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::engine::ExecutionEngine;
use crate::error::{EngineError, Result};
use crate::ledger::{sort_events, BalanceOracle, Broadcaster, LedgerReader, TxHash};
use crate::scanner::HistoryScanner;

pub struct Radio<L> {
    config: RadioConfig,
    codec: Codec,
    ledger: L,
    /// Seeds one engine rng per execution
    rng: Mutex<StdRng>,
}

impl<L> Radio<L> {
    /// Validate `config` and derive its codec. Fails before touching the ledger.
    pub fn new(config: RadioConfig, ledger: L) -> Result<Self> {
        let codec = Codec::new(&config)?;
        let space = codec.space();

        info!(
            id = %config.id(),
            accounts = config.accounts.len(),
            addressable_pairs = space.addressable_pairs(),
            account_bits = space.account_bits,
            fractions = config.fractions,
            value_bits = space.value_bits,
            tokens = config.tokens.len(),
            token_bits = space.token_bits,
            total_bits = space.total_bits(),
            "Radio ready"
        );

        Ok(Self {
            config,
            codec,
            ledger,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Make decoy choices reproducible: each execution draws its engine seed
    /// from a generator seeded with `seed`
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn id(&self) -> String {
        self.config.id()
    }

    pub fn hide(&self, payload: &[u8], content_type: ContentType) -> Result<Plan> {
        self.hide_tagged(payload, content_type.tag())
    }

    pub fn hide_tagged(&self, payload: &[u8], type_tag: u8) -> Result<Plan> {
        Ok(self.codec.hide(payload, type_tag)?)
    }

    /// Serialized public configuration, safe to hand to a reader
    pub fn public_key(&self) -> Result<Vec<u8>> {
        Ok(self.config.public().to_json()?)
    }
}

impl<L: BalanceOracle + Broadcaster> Radio<L> {
    /// Broadcast `plan` with a fresh engine and balance cache
    pub async fn execute(&self, plan: Plan) -> Result<Vec<TxHash>> {
        let seed: u64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen();
        self.execute_with_rng(plan, StdRng::seed_from_u64(seed)).await
    }

    /// Broadcast `plan` with decoy choices drawn from `rng`
    pub async fn execute_with_rng(&self, plan: Plan, rng: StdRng) -> Result<Vec<TxHash>> {
        ExecutionEngine::with_rng(&self.config, &self.ledger, rng)
            .execute(plan)
            .await
    }

    pub async fn send(&self, payload: &[u8], content_type: ContentType) -> Result<Vec<TxHash>> {
        let plan = self.hide(payload, content_type)?;
        self.execute(plan).await
    }
}

impl<L: LedgerReader> Radio<L> {
    /// Frames found in history starting at the block of `start_tx`
    /// (or the beginning of the ledger)
    pub async fn transaction_history(
        &self,
        start_tx: Option<TxHash>,
        type_filter: Option<ContentType>,
        limit: Option<usize>,
    ) -> Result<Vec<Frame>> {
        let from_block = match start_tx {
            Some(tx) => self
                .ledger
                .transaction_block(tx)
                .await
                .map_err(EngineError::transport)?
                .ok_or(EngineError::UnknownTransaction(tx))?,
            None => 0,
        };

        let mut events = self
            .ledger
            .transfer_events(&self.config.tokens, &self.config.addresses(), from_block)
            .await
            .map_err(EngineError::transport)?;
        sort_events(&mut events);

        info!(from_block, events = events.len(), "Scanning transfer history");
        Ok(HistoryScanner::new(&self.codec).scan(
            &events,
            0,
            type_filter.map(ContentType::tag),
            limit,
        ))
    }
}
