//! Abstract operations and plans

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// What a transfer moves: the native gas coin or a token contract's units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    Native,
    Token(Address),
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(token) => write!(f, "{token}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub asset: Asset,
    pub value: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    /// A transfer; payload-bearing when produced by the codec
    Send(Transfer),
    /// Decoy slot, carries no payload bits
    Wait,
}

impl Operation {
    pub fn as_send(&self) -> Option<&Transfer> {
        match self {
            Operation::Send(transfer) => Some(transfer),
            Operation::Wait => None,
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Operation::Wait)
    }
}

impl From<Transfer> for Operation {
    fn from(transfer: Transfer) -> Self {
        Operation::Send(transfer)
    }
}

/// Ordered operations produced by one `hide` call
///
/// Broadcast order is the encoding, so a plan is consumed by execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    ops: Vec<Operation>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn sends(&self) -> impl Iterator<Item = &Transfer> {
        self.ops.iter().filter_map(Operation::as_send)
    }

    /// First send at or after `index`
    pub fn next_send(&self, index: usize) -> Option<&Transfer> {
        self.ops.get(index..)?.iter().find_map(Operation::as_send)
    }
}

impl From<Vec<Operation>> for Plan {
    fn from(ops: Vec<Operation>) -> Self {
        Self { ops }
    }
}

impl IntoIterator for Plan {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send(n: u8) -> Operation {
        Operation::Send(Transfer {
            from: Address::repeat_byte(n),
            to: Address::repeat_byte(n + 1),
            asset: Asset::Native,
            value: n as Amount,
        })
    }

    #[test]
    fn test_next_send() {
        let plan = Plan::from(vec![Operation::Wait, send(1), Operation::Wait, Operation::Wait, send(2)]);
        assert_eq!(plan.next_send(0).unwrap().value, 1);
        assert_eq!(plan.next_send(2).unwrap().value, 2);
        assert!(plan.next_send(5).is_none());
        assert!(plan.next_send(99).is_none());
        assert_eq!(plan.sends().count(), 2);
    }

    #[test]
    fn test_operation_serialization() {
        assert_eq!(serde_json::to_string(&Operation::Wait).unwrap(), r#"{"type":"wait"}"#);
        let json = serde_json::to_string(&send(1)).unwrap();
        assert!(json.starts_with(r#"{"type":"send""#));
    }
}
