//! MSB-first bit packing

/// Appends fixed-width fields to a byte buffer, most significant bit first
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`
    pub fn push(&mut self, value: u64, width: u32) {
        for shift in (0..width).rev() {
            self.push_bit((value >> shift) & 1 == 1);
        }
    }

    fn push_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Bytes written so far, the final byte zero-padded on the right
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads fixed-width fields out of a byte slice; bits past the end read as zero
#[derive(Debug)]
pub(crate) struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn read(&mut self, width: u32) -> u64 {
        let mut value = 0u64;
        for _ in 0..width {
            let bit = self
                .bytes
                .get(self.pos / 8)
                .map(|byte| (byte >> (7 - self.pos % 8)) & 1)
                .unwrap_or(0);
            value = (value << 1) | bit as u64;
            self.pos += 1;
        }
        value
    }
}
