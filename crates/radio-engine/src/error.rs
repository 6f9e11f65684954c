//! Engine error types

use radio_core::{Address, Amount, Asset};
use thiserror::Error;

use crate::TxHash;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] radio_core::Error),

    #[error("Insufficient funds: no account can supply {required} {asset} to {account}")]
    InsufficientFunds {
        account: Address,
        asset: Asset,
        required: Amount,
    },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxHash),

    /// A plan aborted part way; `confirmed` transactions are already on the ledger
    #[error("Operation {index} failed after {} confirmed transactions: {source}", .confirmed.len())]
    Execution {
        index: usize,
        confirmed: Vec<TxHash>,
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn transport(err: anyhow::Error) -> Self {
        EngineError::Transport(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
