//! Frames: the typed, checksummed unit hidden inside one plan
//!
//! Wire layout:
//!
//! ```text
//! [len: u8][type: u8][payload ...][checksum: 2 bytes]
//! len = 1 + payload.len() + 2 <= 255
//! ```
//!
//! The checksum is the first two bytes of keccak-256 over the payload only.
//! A corrupted frame is accepted with probability ~1/65536.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use crate::constants::{CHECKSUM_LEN, FILE_GATEWAY, MAX_FRAME_LEN};
use crate::{Error, Result};

/// Known payload types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ContentType {
    Raw = 0,
    RedisCmd = 1,
    Text = 2,
    FileHash = 3,
    Call = 4,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Raw,
        ContentType::RedisCmd,
        ContentType::Text,
        ContentType::FileHash,
        ContentType::Call,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            ContentType::Raw => "raw",
            ContentType::RedisCmd => "rediscmd",
            ContentType::Text => "text",
            ContentType::FileHash => "filehash",
            ContentType::Call => "call",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|t| t.name()).collect();
                Error::UnknownContentType(format!("{s} (expected one of {})", names.join(", ")))
            })
    }
}

/// 16-bit checksum over a payload
pub fn checksum16(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Keccak::v256();
    hasher.update(payload);
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    [digest[0], digest[1]]
}

/// A recovered or to-be-hidden payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub type_tag: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(content_type: ContentType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            type_tag: content_type.tag(),
            payload: payload.into(),
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_tag(self.type_tag)
    }

    pub fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        checksum16(&self.payload)
    }

    /// `[len][type][payload][checksum]`
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        let body_len = 1 + self.payload.len() + CHECKSUM_LEN;
        if 1 + body_len > MAX_FRAME_LEN {
            return Err(Error::FrameTooLarge {
                size: 1 + body_len,
                max: MAX_FRAME_LEN,
            });
        }

        let mut wire = Vec::with_capacity(1 + body_len);
        wire.push((body_len & 0xFF) as u8);
        wire.push(self.type_tag);
        wire.extend_from_slice(&self.payload);
        wire.extend_from_slice(&self.checksum());
        Ok(wire)
    }

    /// Parse a wire buffer; trailing bytes past the declared length are ignored.
    ///
    /// Returns `None` for short buffers, unknown types and checksum mismatches.
    pub fn from_wire(wire: &[u8]) -> Option<Self> {
        let (&len, rest) = wire.split_first()?;
        let body = rest.get(..len as usize)?;
        if body.len() < 1 + CHECKSUM_LEN {
            return None;
        }

        let (data, checksum) = body.split_at(body.len() - CHECKSUM_LEN);
        let (&type_tag, payload) = data.split_first()?;

        ContentType::from_tag(type_tag)?;
        if checksum16(payload).as_slice() != checksum {
            return None;
        }

        Some(Self {
            type_tag,
            payload: payload.to_vec(),
        })
    }

    /// Interpret the payload according to its type
    pub fn content(&self) -> Content {
        match self.content_type() {
            Some(ContentType::Text) => Content::Text(String::from_utf8_lossy(&self.payload).into_owned()),
            Some(ContentType::RedisCmd) => {
                Content::RedisCmd(String::from_utf8_lossy(&self.payload).into_owned())
            }
            Some(ContentType::FileHash) => Content::FileUrl(format!(
                "{FILE_GATEWAY}{}",
                String::from_utf8_lossy(&self.payload)
            )),
            Some(ContentType::Call) => match self.payload.split_first() {
                Some((&method, params)) => Content::Call {
                    method,
                    params: params.to_vec(),
                },
                None => Content::Raw(Vec::new()),
            },
            Some(ContentType::Raw) | None => Content::Raw(self.payload.clone()),
        }
    }
}

/// A frame payload interpreted by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Content {
    Raw(Vec<u8>),
    RedisCmd(String),
    Text(String),
    FileUrl(String),
    Call { method: u8, params: Vec<u8> },
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Raw(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Content::RedisCmd(cmd) => f.write_str(cmd),
            Content::Text(text) => f.write_str(text),
            Content::FileUrl(url) => f.write_str(url),
            Content::Call { method, params } => {
                write!(f, "call {method}(0x{})", hex::encode(params))
            }
        }
    }
}
