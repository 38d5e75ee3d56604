//! Variable-length-code LZW, as used by GIF image data and TIFF strips.
//!
//! One codec serves both formats. The two differ only in the order codes are
//! packed into bytes and in when the code length grows, which [`LzwConfig`]
//! carries explicitly.

mod bit_io;
mod decoder;
mod encoder;

pub use decoder::{Decoder, LzwStatus};
pub use encoder::Encoder;

use crate::error::LzwError;

/// Codes never grow past this many bits.
pub const MAX_CODE_LEN: u8 = 12;
/// Number of entries a full code table holds.
pub const MAX_ENTRIES: usize = 1 << MAX_CODE_LEN;

/// Order in which code bits are packed into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackingOrder {
    /// GIF: first code in the low bits of the first byte.
    Lsb,
    /// TIFF: first code in the high bits of the first byte.
    Msb,
}

/// When the code length grows by one bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthTrigger {
    /// GIF: grow once the table holds `1 << code_len` entries.
    AtLimit,
    /// TIFF: grow one entry earlier, at `(1 << code_len) - 1`.
    AtLimitMinusOne,
}

impl GrowthTrigger {
    /// Table size at which a table using `code_len`-bit codes is full.
    pub fn limit(self, code_len: u8) -> u16 {
        let entries = 1u16 << code_len;
        match self {
            GrowthTrigger::AtLimit => entries,
            GrowthTrigger::AtLimitMinusOne => entries - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzwConfig {
    pub min_code_size: u8,
    pub packing: PackingOrder,
    pub growth: GrowthTrigger,
}

impl LzwConfig {
    pub fn gif(min_code_size: u8) -> Self {
        Self {
            min_code_size,
            packing: PackingOrder::Lsb,
            growth: GrowthTrigger::AtLimit,
        }
    }

    pub fn tiff() -> Self {
        Self {
            min_code_size: 8,
            packing: PackingOrder::Msb,
            growth: GrowthTrigger::AtLimitMinusOne,
        }
    }

    pub fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    pub fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// First code available for table entries after a reset.
    pub(crate) fn first_free_code(&self) -> u16 {
        self.clear_code() + 2
    }

    pub(crate) fn initial_code_len(&self) -> u8 {
        self.min_code_size + 1
    }

    pub(crate) fn validate(&self) -> Result<(), LzwError> {
        if !(2..MAX_CODE_LEN).contains(&self.min_code_size) {
            return Err(LzwError::InvalidMinCodeSize(self.min_code_size));
        }
        Ok(())
    }
}

/// Compress `bytes` into a packed code stream in one call.
pub fn encode(bytes: &[u8], config: LzwConfig) -> Result<Vec<u8>, LzwError> {
    let mut encoder = Encoder::new(config)?;
    let mut out = Vec::with_capacity(bytes.len() / 2 + 4);
    encoder.encode(bytes, &mut out)?;
    encoder.finish(&mut out);
    Ok(out)
}

/// Decompress a whole code stream, producing at most `max_len` bytes.
///
/// A status of [`LzwStatus::NeedMore`] means the stream ended before its end
/// code; the bytes decoded up to that point are still returned.
pub fn decode(
    code_stream: &[u8],
    config: LzwConfig,
    max_len: usize,
) -> Result<(Vec<u8>, LzwStatus), LzwError> {
    let mut decoder = Decoder::new(config)?;
    let mut out = Vec::with_capacity(max_len.min(code_stream.len().saturating_mul(4)));
    let status = decoder.decode(code_stream, &mut out, max_len)?;
    Ok((out, status))
}
