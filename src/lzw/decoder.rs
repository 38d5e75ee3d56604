use log::trace;

use super::bit_io::BitReader;
use super::{LzwConfig, MAX_CODE_LEN, MAX_ENTRIES};
use crate::error::LzwError;

/// Where a [`Decoder`] stopped after consuming its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LzwStatus {
    /// All input was consumed without reaching the end code.
    NeedMore,
    /// The end code was read; further input is ignored.
    Done,
    /// The output reached the caller's length limit; further input is ignored.
    OutputFull,
}

/// Streaming LZW decompressor.
///
/// The decoder can be fed a stream in pieces (for GIF, one sub-block at a
/// time); partial codes carry over between calls.
#[derive(Debug)]
pub struct Decoder {
    config: LzwConfig,
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    next_code: u16,
    code_len: u8,
    previous: Option<u16>,
    bits: BitReader,
    // one table string, last byte first
    stack: Vec<u8>,
    finished: Option<LzwStatus>,
}

impl Decoder {
    pub fn new(config: LzwConfig) -> Result<Self, LzwError> {
        config.validate()?;

        let mut suffix = vec![0; MAX_ENTRIES];
        for (symbol, entry) in suffix.iter_mut().enumerate().take(config.clear_code() as usize) {
            *entry = symbol as u8;
        }

        Ok(Self {
            config,
            prefix: vec![0; MAX_ENTRIES],
            suffix,
            next_code: config.first_free_code(),
            code_len: config.initial_code_len(),
            previous: None,
            bits: BitReader::new(config.packing),
            stack: Vec::with_capacity(MAX_ENTRIES),
            finished: None,
        })
    }

    /// Current code length in bits.
    pub fn code_len(&self) -> u8 {
        self.code_len
    }

    /// Decode `input`, appending to `out` until it holds `max_len` bytes.
    pub fn decode(
        &mut self,
        input: &[u8],
        out: &mut Vec<u8>,
        max_len: usize,
    ) -> Result<LzwStatus, LzwError> {
        if let Some(status) = self.finished {
            return Ok(status);
        }
        if out.len() >= max_len {
            return Ok(self.finish(LzwStatus::OutputFull));
        }

        for &byte in input {
            self.bits.push(byte);
            while let Some(code) = self.bits.read(self.code_len) {
                if let Some(status) = self.process(code, out, max_len)? {
                    return Ok(self.finish(status));
                }
            }
        }
        Ok(LzwStatus::NeedMore)
    }

    fn finish(&mut self, status: LzwStatus) -> LzwStatus {
        self.finished = Some(status);
        status
    }

    fn process(
        &mut self,
        code: u16,
        out: &mut Vec<u8>,
        max_len: usize,
    ) -> Result<Option<LzwStatus>, LzwError> {
        let clear_code = self.config.clear_code();
        if code == clear_code {
            self.reset();
            return Ok(None);
        }
        if code == self.config.end_code() {
            return Ok(Some(LzwStatus::Done));
        }

        let Some(previous) = self.previous else {
            // first code after a reset must be a literal
            if code > clear_code {
                return Err(LzwError::InvalidCode {
                    code,
                    next_code: self.next_code,
                });
            }
            self.previous = Some(code);
            return Ok(self.emit(&[code as u8], out, max_len));
        };

        let first = if code < self.next_code {
            self.load_string(code)
        } else if code == self.next_code {
            // the code being defined right now: previous string plus its own first byte
            let first = self.load_string(previous);
            self.stack.insert(0, first);
            first
        } else {
            return Err(LzwError::InvalidCode {
                code,
                next_code: self.next_code,
            });
        };

        self.add_entry(previous, first);
        self.previous = Some(code);

        while let Some(byte) = self.stack.pop() {
            out.push(byte);
            if out.len() >= max_len {
                return Ok(Some(LzwStatus::OutputFull));
            }
        }
        Ok(None)
    }

    fn emit(&mut self, bytes: &[u8], out: &mut Vec<u8>, max_len: usize) -> Option<LzwStatus> {
        let room = max_len - out.len();
        out.extend_from_slice(&bytes[..bytes.len().min(room)]);
        (out.len() >= max_len).then_some(LzwStatus::OutputFull)
    }

    /// Fill the stack with the string for `code`, returning its first byte.
    fn load_string(&mut self, mut code: u16) -> u8 {
        self.stack.clear();
        let clear_code = self.config.clear_code();
        while code >= clear_code {
            self.stack.push(self.suffix[code as usize]);
            code = self.prefix[code as usize];
        }
        let first = code as u8;
        self.stack.push(first);
        first
    }

    fn add_entry(&mut self, prefix: u16, suffix: u8) {
        if (self.next_code as usize) < MAX_ENTRIES {
            self.prefix[self.next_code as usize] = prefix;
            self.suffix[self.next_code as usize] = suffix;
            self.next_code += 1;
        }
        if self.next_code == self.config.growth.limit(self.code_len) && self.code_len < MAX_CODE_LEN {
            self.code_len += 1;
            trace!("lzw code length grew to {} at code {}", self.code_len, self.next_code);
        }
    }

    fn reset(&mut self) {
        self.next_code = self.config.first_free_code();
        self.code_len = self.config.initial_code_len();
        self.previous = None;
    }
}
