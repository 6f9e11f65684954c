//! Bit budget per transfer
//!
//! Every payload-bearing transfer carries three selectors packed MSB-first:
//! `[account pair][value][token]`. Each width is `floor(log2(n))` of its
//! space, so only the first `2^bits` entries of each space are addressable.

use serde::{Deserialize, Serialize};

use crate::{Error, RadioConfig, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceModel {
    pub account_bits: u32,
    pub value_bits: u32,
    pub token_bits: u32,
}

impl SpaceModel {
    /// Derive the bit widths for `accounts` accounts, `fractions` value steps
    /// and `tokens` tokens.
    pub fn compute(accounts: usize, fractions: u64, tokens: usize) -> Result<Self> {
        let pairs = Self::pair_count(accounts);
        if pairs < 2 {
            return Err(Error::DegenerateSpace(format!(
                "{accounts} accounts give {pairs} ordered pairs, need at least 2"
            )));
        }
        if fractions <= 1 {
            return Err(Error::DegenerateSpace(format!(
                "fraction count {fractions} must be at least 2"
            )));
        }
        if tokens == 0 {
            return Err(Error::DegenerateSpace("token list is empty".into()));
        }

        let space = Self {
            account_bits: pairs.ilog2(),
            value_bits: fractions.ilog2(),
            token_bits: (tokens as u64).ilog2(),
        };

        if space.bytes_per_operation() == 0 {
            return Err(Error::DegenerateSpace(format!(
                "{} bits per transfer cannot carry a whole byte",
                space.total_bits()
            )));
        }

        Ok(space)
    }

    pub fn from_config(config: &RadioConfig) -> Result<Self> {
        Self::compute(config.accounts.len(), config.fractions, config.tokens.len())
    }

    /// Number of ordered pairs of distinct accounts
    pub fn pair_count(accounts: usize) -> u64 {
        let n = accounts as u64;
        n.saturating_mul(n.saturating_sub(1))
    }

    pub fn total_bits(&self) -> u32 {
        self.account_bits + self.value_bits + self.token_bits
    }

    /// Whole bytes packed into one transfer; leftover bits are padding
    pub fn bytes_per_operation(&self) -> usize {
        (self.total_bits() / 8) as usize
    }

    /// Number of selectors reachable in the account-pair field
    pub fn addressable_pairs(&self) -> u64 {
        1u64 << self.account_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_accounts_two_tokens() {
        let space = SpaceModel::compute(4, 256, 2).unwrap();
        assert_eq!(space.account_bits, 3);
        assert_eq!(space.value_bits, 8);
        assert_eq!(space.token_bits, 1);
        assert_eq!(space.total_bits(), 12);
        assert_eq!(space.bytes_per_operation(), 1);
        assert_eq!(space.addressable_pairs(), 8);
    }

    #[test]
    fn test_single_token_has_zero_width_field() {
        let space = SpaceModel::compute(3, 1 << 16, 1).unwrap();
        assert_eq!(space.token_bits, 0);
        assert_eq!(space.total_bits(), 2 + 16);
        assert_eq!(space.bytes_per_operation(), 2);
    }

    #[test]
    fn test_degenerate_configs() {
        assert!(matches!(SpaceModel::compute(1, 256, 2), Err(Error::DegenerateSpace(_))));
        assert!(matches!(SpaceModel::compute(0, 256, 2), Err(Error::DegenerateSpace(_))));
        assert!(matches!(SpaceModel::compute(4, 1, 2), Err(Error::DegenerateSpace(_))));
        assert!(matches!(SpaceModel::compute(4, 0, 2), Err(Error::DegenerateSpace(_))));
        assert!(matches!(SpaceModel::compute(4, 256, 0), Err(Error::DegenerateSpace(_))));
    }

    #[test]
    fn test_sub_byte_budget_is_degenerate() {
        // 2 pairs (1 bit) + 4 fractions (2 bits) + 2 tokens (1 bit) = 4 bits
        assert!(matches!(SpaceModel::compute(2, 4, 2), Err(Error::DegenerateSpace(_))));
    }
}
