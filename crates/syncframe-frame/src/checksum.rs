//! CRC-16/CCITT-FALSE.
//!
//! Polynomial `0x1021`, initial register `0xFFFF`, no input/output reflection,
//! no final XOR. The same convention is used on both the encode and the
//! validate side of the codec, so the checksum of a frame can be recomputed
//! from its raw bytes alone.

/// Generator polynomial (implicit leading bit omitted).
pub const CRC_POLY: u16 = 0x1021;

/// Initial register value.
pub const CRC_INIT: u16 = 0xFFFF;

/// Value XORed into the register before it is returned.
pub const CRC_XOR_OUT: u16 = 0x0000;

/// Standard check value: `checksum(b"123456789")`.
pub const CRC_CHECK: u16 = 0x29B1;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the checksum of a complete byte span.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}

/// Incremental CRC-16/CCITT-FALSE digest.
///
/// Feeding the same bytes in any chunking yields the same result as
/// [`checksum`] over their concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    state: u16,
}

impl Crc16 {
    pub const fn new() -> Self {
        Self { state: CRC_INIT }
    }

    /// Feed more bytes into the register.
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let idx = ((self.state >> 8) as u8 ^ byte) as usize;
            self.state = (self.state << 8) ^ TABLE[idx];
        }
    }

    /// Current checksum value. Does not reset the digest.
    pub fn finish(&self) -> u16 {
        self.state ^ CRC_XOR_OUT
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
