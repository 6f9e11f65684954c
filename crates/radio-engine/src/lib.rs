//! radio-engine: Executes radio plans against a ledger and reads them back
//!
//! This crate provides:
//! 1. Ledger boundary traits (history reader, balance oracle, broadcaster)
//! 2. An execution engine that broadcasts a plan in order, funding gas and
//!    tokens on the fly and filling decoy slots with ordinary transfers
//! 3. A history scanner that finds frames in raw transfer history
//! 4. Two ledgers: an in-process simulation and a JSON-RPC client
//!
//! ## Usage
//!
//! ```no_run
//! use radio_core::{ContentType, RadioConfig};
//! use radio_engine::{Radio, RpcLedger, RpcSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RadioConfig::load("radio.json")?;
//!     let ledger = RpcLedger::connect(RpcSettings::new(&config.rpc_url)).await?;
//!     let radio = Radio::new(config, ledger)?;
//!
//!     let plan = radio.hide(b"hi", ContentType::Text)?;
//!     let txs = radio.execute(plan).await?;
//!     let frames = radio.transaction_history(txs.first().copied(), Some(ContentType::Text), None).await?;
//!     println!("{:?}", frames);
//!     Ok(())
//! }
//! ```

mod cache;
mod engine;
mod error;
mod ledger;
mod memory;
pub mod metrics;
mod radio;
mod rpc;
mod scanner;

pub use cache::BalanceCache;
pub use engine::{BroadcastKind, ExecutionEngine, ExecutionState};
pub use error::{EngineError, Result};
pub use ledger::{sort_events, BalanceOracle, Broadcaster, ChainEvent, LedgerReader, TxHash};
pub use memory::{Broadcast, MemoryLedger};
pub use radio::Radio;
pub use rpc::{RpcLedger, RpcSettings};
pub use scanner::HistoryScanner;
