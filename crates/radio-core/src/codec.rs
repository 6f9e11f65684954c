//! Frame <-> plan codec
//!
//! The wire bytes `[len][type][payload][checksum]` are cut into chunks of
//! `bytes_per_operation` bytes. Each chunk is read MSB-first as
//! `[pair selector][value selector][token selector]`, zero-padded on the
//! right, and becomes one token transfer:
//!
//! ```text
//! Wait, Send(chunk 0), Wait x s0, Send(chunk 1), Wait x s1, ...
//! ```
//!
//! where `s_i` is the decoy schedule's spacing at index `i`.

use crate::bits::{BitReader, BitWriter};
use crate::constants::TX_STREAM;
use crate::{
    Address, Amount, Asset, CombinationIndex, ContentType, DecoySchedule, Error, Frame, Operation,
    Plan, RadioConfig, Result, SpaceModel, Transfer,
};

#[derive(Debug, Clone)]
pub struct Codec {
    space: SpaceModel,
    combinations: CombinationIndex,
    accounts: Vec<Address>,
    tokens: Vec<Address>,
    schedule: DecoySchedule,
    max_spacing: u32,
}

impl Codec {
    pub fn new(config: &RadioConfig) -> Result<Self> {
        config.validate()?;
        let space = SpaceModel::from_config(config)?;

        Ok(Self {
            space,
            combinations: CombinationIndex::new(config.accounts.len(), &space),
            accounts: config.addresses(),
            tokens: config.tokens.clone(),
            schedule: DecoySchedule::new(&config.channel, TX_STREAM),
            max_spacing: config.max_spacing,
        })
    }

    pub fn space(&self) -> &SpaceModel {
        &self.space
    }

    pub fn combinations(&self) -> &CombinationIndex {
        &self.combinations
    }

    pub fn schedule(&self) -> &DecoySchedule {
        &self.schedule
    }

    pub fn max_spacing(&self) -> u32 {
        self.max_spacing
    }

    /// Encode `payload` as a plan of transfers and decoy slots
    pub fn hide(&self, payload: &[u8], type_tag: u8) -> Result<Plan> {
        if ContentType::from_tag(type_tag).is_none() {
            return Err(Error::UnknownContentType(type_tag.to_string()));
        }

        let wire = Frame {
            type_tag,
            payload: payload.to_vec(),
        }
        .to_wire()?;

        let mut plan = Plan::new();
        plan.push(Operation::Wait);

        for (index, chunk) in wire.chunks(self.space.bytes_per_operation()).enumerate() {
            plan.push(Operation::Send(self.encode_chunk(chunk)?));

            for _ in 0..self.schedule.spacing(index as u64, self.max_spacing) {
                plan.push(Operation::Wait);
            }
        }

        Ok(plan)
    }

    /// Map up to `bytes_per_operation` bytes onto one transfer
    pub fn encode_chunk(&self, chunk: &[u8]) -> Result<Transfer> {
        let mut reader = BitReader::new(chunk);
        let pair = reader.read(self.space.account_bits);
        let value = reader.read(self.space.value_bits);
        let token = reader.read(self.space.token_bits) as usize;

        let (from, to) = self.combinations.pair(pair)?;
        let token = *self.tokens.get(token).ok_or(Error::InvalidSelector {
            selector: token as u64,
            max: self.tokens.len() as u64,
        })?;

        Ok(Transfer {
            from: self.accounts[from],
            to: self.accounts[to],
            asset: Asset::Token(token),
            value: value as Amount + 1,
        })
    }

    /// Bytes carried by a transfer, or `None` if it cannot have come from `hide`
    pub fn decode_transfer(&self, transfer: &Transfer) -> Option<Vec<u8>> {
        let Asset::Token(token) = transfer.asset else {
            return None;
        };
        let token = self.tokens.iter().position(|t| *t == token)?;
        let from = self.accounts.iter().position(|a| *a == transfer.from)?;
        let to = self.accounts.iter().position(|a| *a == transfer.to)?;
        let pair = self.combinations.selector(from, to).ok()?;

        let value = transfer.value.checked_sub(1)?;
        if value >> self.space.value_bits != 0 || (token as u64) >> self.space.token_bits != 0 {
            return None;
        }

        let mut writer = BitWriter::new();
        writer.push(pair, self.space.account_bits);
        writer.push(value as u64, self.space.value_bits);
        writer.push(token as u64, self.space.token_bits);

        let mut bytes = writer.into_bytes();
        bytes.truncate(self.space.bytes_per_operation());
        Some(bytes)
    }

    /// Recover a frame from operations; waits are ignored.
    ///
    /// `None` means the operations do not form a valid frame (wrong start,
    /// foreign transfer, checksum mismatch). Callers scanning history use it
    /// to try the next offset.
    pub fn reveal(&self, ops: &[Operation]) -> Option<Frame> {
        let mut wire = Vec::new();
        for transfer in ops.iter().filter_map(Operation::as_send) {
            wire.extend(self.decode_transfer(transfer)?);
        }
        Frame::from_wire(&wire)
    }

    /// Frame length declared by a header transfer
    pub fn declared_length(&self, op: &Operation) -> Option<u8> {
        let bytes = self.decode_transfer(op.as_send()?)?;
        bytes.first().copied()
    }

    /// Transfers needed to carry a frame of declared length `len`
    pub fn operations_for_length(&self, len: u8) -> usize {
        (len as usize + 1).div_ceil(self.space.bytes_per_operation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;

    fn codec() -> Codec {
        Codec::new(&sample_config()).unwrap()
    }

    #[test]
    fn test_hi_roundtrip() {
        let codec = codec();
        assert_eq!(codec.space().total_bits(), 12);

        let plan = codec.hide(b"hi", 1).unwrap();
        let frame = codec.reveal(plan.operations()).unwrap();
        assert_eq!(frame.type_tag, 1);
        assert_eq!(frame.payload, b"hi");
    }

    #[test]
    fn test_plan_shape_follows_schedule() {
        let codec = codec();
        let plan = codec.hide(b"hi", 1).unwrap();
        let ops = plan.operations();

        // [len][type]['h']['i'][chk0][chk1], one byte per transfer
        assert_eq!(plan.sends().count(), 6);
        assert!(ops[0].is_wait());
        assert!(!ops[1].is_wait());

        let mut pos = 1;
        for index in 0..6u64 {
            assert!(ops[pos].as_send().is_some(), "send expected at {pos}");
            let spacing = codec.schedule().spacing(index, codec.max_spacing()) as usize;
            assert!(ops[pos + 1..=pos + spacing].iter().all(Operation::is_wait));
            pos += spacing + 1;
        }
        assert_eq!(pos, ops.len());
    }

    #[test]
    fn test_first_transfer_carries_length() {
        let codec = codec();
        let plan = codec.hide(b"hi", 1).unwrap();
        let header = plan.operations()[1];
        assert_eq!(codec.declared_length(&header), Some(5));
        assert_eq!(codec.operations_for_length(5), 6);
    }

    #[test]
    fn test_transfers_stay_in_pool() {
        let config = sample_config();
        let codec = codec();
        let plan = codec.hide(&[0xFF; 40], 0).unwrap();
        for transfer in plan.sends() {
            assert_ne!(transfer.from, transfer.to);
            assert!(config.account_index(&transfer.from).is_some());
            assert!(config.account_index(&transfer.to).is_some());
            assert!((1..=256).contains(&transfer.value));
            assert!(matches!(transfer.asset, Asset::Token(t) if config.token_index(&t).is_some()));
        }
    }

    #[test]
    fn test_oversize_payload_is_rejected() {
        let codec = codec();
        assert!(codec.hide(&[7u8; 251], 0).is_ok());
        assert!(matches!(
            codec.hide(&[7u8; 252], 0),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(matches!(codec().hide(b"x", 5), Err(Error::UnknownContentType(_))));
    }

    #[test]
    fn test_corrupted_payload_transfer_is_rejected() {
        let codec = codec();
        let plan = codec.hide(b"hello", 2).unwrap();
        let mut ops = plan.operations().to_vec();

        // Third send carries the first payload byte. Its value field holds the
        // low 5 bits of that byte followed by 3 padding bits, so flip weight 8.
        let target = ops
            .iter()
            .enumerate()
            .filter(|(_, op)| op.as_send().is_some())
            .nth(2)
            .map(|(i, _)| i)
            .unwrap();
        if let Operation::Send(transfer) = &mut ops[target] {
            transfer.value = ((transfer.value - 1) ^ 0x08) + 1;
        }
        assert_eq!(codec.reveal(&ops), None);
    }

    #[test]
    fn test_foreign_transfers_are_not_decodable() {
        let codec = codec();
        let config = sample_config();
        let outsider = Transfer {
            from: Address::repeat_byte(0xEE),
            to: config.accounts[0].address,
            asset: Asset::Token(config.tokens[0]),
            value: 1,
        };
        assert_eq!(codec.decode_transfer(&outsider), None);

        let native = Transfer {
            asset: Asset::Native,
            from: config.accounts[0].address,
            ..outsider
        };
        assert_eq!(codec.decode_transfer(&native), None);

        // pair (3,0) lies outside the 8 addressable selectors
        let unreachable = Transfer {
            from: config.accounts[3].address,
            to: config.accounts[0].address,
            asset: Asset::Token(config.tokens[0]),
            value: 1,
        };
        assert_eq!(codec.decode_transfer(&unreachable), None);

        let too_large = Transfer {
            value: 257,
            ..Transfer {
                from: config.accounts[0].address,
                to: config.accounts[1].address,
                asset: Asset::Token(config.tokens[0]),
                value: 0,
            }
        };
        assert_eq!(codec.decode_transfer(&too_large), None);
    }

    #[test]
    fn test_wide_space_roundtrip() {
        let mut config = sample_config();
        config.fractions = 1 << 20;
        config.tokens.push(Address::repeat_byte(0xA2));
        config.tokens.push(Address::repeat_byte(0xA3));
        let codec = Codec::new(&config).unwrap();
        // 3 + 20 + 2 = 25 bits -> 3 bytes per transfer, 1 bit of padding
        assert_eq!(codec.space().bytes_per_operation(), 3);

        let payload: Vec<u8> = (0u8..=200).collect();
        let plan = codec.hide(&payload, 0).unwrap();
        assert_eq!(plan.sends().count(), (payload.len() + 4).div_ceil(3));
        assert_eq!(codec.reveal(plan.operations()).unwrap().payload, payload);
    }

    #[test]
    fn test_empty_payload() {
        let codec = codec();
        let plan = codec.hide(&[], 2).unwrap();
        let frame = codec.reveal(plan.operations()).unwrap();
        assert_eq!(frame, Frame::new(ContentType::Text, Vec::new()));
    }
}
