//! radio-core: Codec and addressing scheme for the token-transfer radio
//!
//! This crate turns arbitrary bytes into a sequence of ordinary-looking token
//! transfers between a fixed pool of accounts, and back:
//! - Space model: how many bits each transfer carries (account pair, value, token)
//! - Combination index: selector <-> ordered (from, to) account pair
//! - Codec: checksummed, length-prefixed frames <-> operation plans
//! - Decoy schedule: reproducible spacing between payload-bearing transfers
//!
//! Nothing in here touches a ledger. Execution and history scanning live in
//! `radio-engine`.
//!
//! # Threat Model
//!
//! Both parties share the channel secret and the ordered account/token pool.
//!
//! | Information | Ledger observer knowledge |
//! |-------------|---------------------------|
//! | That the accounts transfer tokens | **YES** - transfers are public |
//! | Which transfers carry payload | NO - decoys are interleaved |
//! | Frame boundaries | NO - without the channel secret |
//! | Payload bytes | NO - without the account/token ordering |
//!
//! Non-goals: unlinkability against a ledger-wide statistical analyst,
//! delivery guarantees under reorgs, and secrecy against a holder of the
//! channel secret.

mod bits;
mod codec;
mod combination;
mod config;
mod error;
mod frame;
mod operation;
mod schedule;
mod space;

pub use codec::Codec;
pub use combination::CombinationIndex;
pub use config::{Account, PublicConfig, RadioConfig};
pub use error::Error;
pub use frame::{checksum16, Content, ContentType, Frame};
pub use operation::{Asset, Operation, Plan, Transfer};
pub use schedule::DecoySchedule;
pub use space::SpaceModel;

pub use alloy_primitives::Address;

pub type Result<T> = std::result::Result<T, Error>;

/// Token amount in base units (also used for native gas balances, in wei)
pub type Amount = u128;

/// Constants shared by encoder and decoder
pub mod constants {
    /// Largest frame body (type tag + payload + checksum) a one-byte length can describe
    pub const MAX_FRAME_LEN: usize = 255;

    /// Checksum size in bytes
    pub const CHECKSUM_LEN: usize = 2;

    /// Largest payload that fits a frame next to its length byte, type tag and checksum
    pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - 1 - 1 - CHECKSUM_LEN;

    /// Decoy stream name used to space payload transfers
    pub const TX_STREAM: &str = "tx";

    /// Smallest number of decoys drawn after each payload transfer
    pub const MIN_SPACING: u32 = 1;

    /// Public gateway used to render file-hash frames
    pub const FILE_GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";
}
