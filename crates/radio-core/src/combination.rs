//! Selector <-> ordered account pair
//!
//! Pairs are enumerated with "from" as the outer loop and "to" as the inner
//! loop, both in account list order, skipping self-pairs:
//!
//! ```text
//! 4 accounts: 0:(0,1) 1:(0,2) 2:(0,3) 3:(1,0) 4:(1,2) 5:(1,3) 6:(2,0) ...
//! ```

use crate::{Error, Result, SpaceModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinationIndex {
    accounts: usize,
    addressable: u64,
}

impl CombinationIndex {
    pub fn new(accounts: usize, space: &SpaceModel) -> Self {
        Self {
            accounts,
            addressable: space.addressable_pairs().min(SpaceModel::pair_count(accounts)),
        }
    }

    /// Number of selectors that map to a pair
    pub fn addressable(&self) -> u64 {
        self.addressable
    }

    /// Ordered (from, to) account indices for a selector
    pub fn pair(&self, selector: u64) -> Result<(usize, usize)> {
        if selector >= self.addressable {
            return Err(Error::InvalidSelector {
                selector,
                max: self.addressable,
            });
        }

        let row = (self.accounts - 1) as u64;
        let from = (selector / row) as usize;
        let column = (selector % row) as usize;
        let to = if column < from { column } else { column + 1 };

        Ok((from, to))
    }

    /// Selector for an ordered pair of account indices
    pub fn selector(&self, from: usize, to: usize) -> Result<u64> {
        if from == to || from >= self.accounts || to >= self.accounts {
            return Err(Error::InvalidSelector {
                selector: u64::MAX,
                max: self.addressable,
            });
        }

        let column = if to < from { to } else { to - 1 };
        let selector = (from * (self.accounts - 1) + column) as u64;

        if selector >= self.addressable {
            return Err(Error::InvalidSelector {
                selector,
                max: self.addressable,
            });
        }
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(accounts: usize) -> CombinationIndex {
        let space = SpaceModel::compute(accounts, 256, 2).unwrap();
        CombinationIndex::new(accounts, &space)
    }

    #[test]
    fn test_enumeration_order() {
        let idx = index(4);
        let pairs: Vec<_> = (0..idx.addressable()).map(|i| idx.pair(i).unwrap()).collect();
        assert_eq!(
            pairs,
            vec![(0, 1), (0, 2), (0, 3), (1, 0), (1, 2), (1, 3), (2, 0), (2, 1)]
        );
    }

    #[test]
    fn test_bijection() {
        for accounts in 2..=12 {
            let idx = index(accounts);
            for i in 0..idx.addressable() {
                let (from, to) = idx.pair(i).unwrap();
                assert_ne!(from, to);
                assert_eq!(idx.selector(from, to).unwrap(), i);
            }
        }
    }

    #[test]
    fn test_unreachable_pairs_are_rejected() {
        let idx = index(4);
        // (2,3), (3,0), (3,1), (3,2) sit past 2^3 = 8
        assert!(matches!(idx.selector(2, 3), Err(Error::InvalidSelector { selector: 8, max: 8 })));
        assert!(idx.selector(3, 0).is_err());
        assert!(idx.pair(8).is_err());
        assert!(idx.pair(u64::MAX).is_err());
    }

    #[test]
    fn test_self_and_unknown_pairs_are_rejected() {
        let idx = index(4);
        assert!(idx.selector(1, 1).is_err());
        assert!(idx.selector(0, 9).is_err());
    }
}
