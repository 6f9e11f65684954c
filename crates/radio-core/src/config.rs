//! Channel configuration (the shared keyfile contents)
//!
//! Account and token order is part of the wire format: every party must hold
//! the same lists in the same order.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use crate::{Address, Amount, Error, Result, SpaceModel};

/// A pool account. `secret` is absent for receive-only configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AccountRepr")]
pub struct Account {
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Account {
    pub fn new(address: Address, secret: impl Into<String>) -> Self {
        Self {
            address,
            secret: Some(secret.into()),
        }
    }

    pub fn watch_only(address: Address) -> Self {
        Self {
            address,
            secret: None,
        }
    }
}

/// Accounts may be written as bare addresses (public configs) or objects
#[derive(Deserialize)]
#[serde(untagged)]
enum AccountRepr {
    Address(Address),
    Full {
        address: Address,
        #[serde(default)]
        secret: Option<String>,
    },
}

impl From<AccountRepr> for Account {
    fn from(repr: AccountRepr) -> Self {
        match repr {
            AccountRepr::Address(address) => Account::watch_only(address),
            AccountRepr::Full { address, secret } => Account { address, secret },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioConfig {
    pub accounts: Vec<Account>,
    /// ERC-20 contract addresses
    pub tokens: Vec<Address>,
    /// Number of distinct transfer values
    pub fractions: u64,
    /// Upper bound on decoys between payload transfers
    pub max_spacing: u32,
    /// Native balance (wei) an account needs before it may send
    pub min_gas: Amount,
    /// Shared channel secret
    pub channel: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".into()
}

impl RadioConfig {
    /// Load configuration from a JSON file (full or public form)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file, secrets included
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        SpaceModel::from_config(self)?;

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.address) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate account {}",
                    account.address
                )));
            }
        }

        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(*token) {
                return Err(Error::InvalidConfig(format!("duplicate token {token}")));
            }
        }

        if self.max_spacing == 0 {
            return Err(Error::InvalidConfig("maxSpacing must be at least 1".into()));
        }

        Ok(())
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|a| a.address).collect()
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.iter().find(|a| &a.address == address)
    }

    pub fn account_index(&self, address: &Address) -> Option<usize> {
        self.accounts.iter().position(|a| &a.address == address)
    }

    pub fn token_index(&self, token: &Address) -> Option<usize> {
        self.tokens.iter().position(|t| t == token)
    }

    /// Shareable form with every secret removed
    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            accounts: self.addresses(),
            tokens: self.tokens.clone(),
            fractions: self.fractions,
            max_spacing: self.max_spacing,
            min_gas: self.min_gas,
            channel: self.channel.clone(),
            rpc_url: self.rpc_url.clone(),
        }
    }

    /// Channel identifier: keccak-256 over the public config
    pub fn id(&self) -> String {
        self.public().id()
    }
}

/// Configuration without signing secrets, enough to decode a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub accounts: Vec<Address>,
    pub tokens: Vec<Address>,
    pub fractions: u64,
    pub max_spacing: u32,
    pub min_gas: Amount,
    pub channel: String,
    pub rpc_url: String,
}

impl PublicConfig {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn id(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Keccak::v256();
        hasher.update(&canonical);
        let mut digest = [0u8; 32];
        hasher.finalize(&mut digest);
        hex::encode(digest)
    }
}

impl From<PublicConfig> for RadioConfig {
    fn from(public: PublicConfig) -> Self {
        Self {
            accounts: public.accounts.into_iter().map(Account::watch_only).collect(),
            tokens: public.tokens,
            fractions: public.fractions,
            max_spacing: public.max_spacing,
            min_gas: public.min_gas,
            channel: public.channel,
            rpc_url: public.rpc_url,
        }
    }
}
