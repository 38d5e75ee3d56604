use log::trace;

use super::bit_io::BitWriter;
use super::{LzwConfig, MAX_CODE_LEN, MAX_ENTRIES};
use crate::error::LzwError;

/// Trie node; its code is its index in the arena.
#[derive(Debug, Clone, Copy)]
struct Node {
    first_child: Option<u16>,
    next_sibling: Option<u16>,
    suffix: u8,
}

impl Node {
    fn leaf(suffix: u8, next_sibling: Option<u16>) -> Self {
        Self {
            first_child: None,
            next_sibling,
            suffix,
        }
    }
}

/// Streaming LZW compressor.
///
/// Feed input with [`Encoder::encode`] as often as needed, then call
/// [`Encoder::finish`] once to emit the last code and the end code.
#[derive(Debug)]
pub struct Encoder {
    config: LzwConfig,
    trie: Vec<Node>,
    code_len: u8,
    // code of the longest prefix matched so far
    current: Option<u16>,
    bits: BitWriter,
    started: bool,
}

impl Encoder {
    pub fn new(config: LzwConfig) -> Result<Self, LzwError> {
        config.validate()?;

        let mut trie = Vec::with_capacity(MAX_ENTRIES);
        for symbol in 0..config.clear_code() {
            trie.push(Node::leaf(symbol as u8, None));
        }
        // clear and end codes never get children
        trie.push(Node::leaf(0, None));
        trie.push(Node::leaf(0, None));

        Ok(Self {
            config,
            trie,
            code_len: config.initial_code_len(),
            current: None,
            bits: BitWriter::new(config.packing),
            started: false,
        })
    }

    pub fn encode(&mut self, bytes: &[u8], out: &mut Vec<u8>) -> Result<(), LzwError> {
        if !self.started {
            self.emit(self.config.clear_code(), out);
            self.started = true;
        }

        let clear_code = self.config.clear_code();
        for &byte in bytes {
            if byte as u16 >= clear_code {
                return Err(LzwError::SymbolOutOfRange {
                    symbol: byte,
                    min_code_size: self.config.min_code_size,
                });
            }

            self.current = match self.current {
                None => Some(byte as u16),
                Some(prefix) => match self.find_child(prefix, byte) {
                    Some(code) => Some(code),
                    None => {
                        self.emit(prefix, out);
                        self.add_entry(prefix, byte, out);
                        Some(byte as u16)
                    }
                },
            };
        }
        Ok(())
    }

    /// Emit the pending code and the end code, then flush the last partial byte.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if !self.started {
            self.emit(self.config.clear_code(), out);
            self.started = true;
        }
        if let Some(code) = self.current.take() {
            self.emit(code, out);
        }
        self.emit(self.config.end_code(), out);
        self.bits.flush(out);
    }

    fn emit(&mut self, code: u16, out: &mut Vec<u8>) {
        self.bits.write(code, self.code_len, out);
    }

    fn find_child(&self, prefix: u16, byte: u8) -> Option<u16> {
        let mut child = self.trie[prefix as usize].first_child;
        while let Some(code) = child {
            let node = &self.trie[code as usize];
            if node.suffix == byte {
                return Some(code);
            }
            child = node.next_sibling;
        }
        None
    }

    fn add_entry(&mut self, prefix: u16, byte: u8, out: &mut Vec<u8>) {
        let next_code = self.trie.len() as u16;
        if next_code == self.config.growth.limit(self.code_len) {
            if self.code_len < MAX_CODE_LEN {
                self.code_len += 1;
                trace!("lzw code length grew to {} at code {}", self.code_len, next_code);
            } else {
                self.emit(self.config.clear_code(), out);
                self.reset();
                return;
            }
        }

        let sibling = self.trie[prefix as usize].first_child;
        self.trie.push(Node::leaf(byte, sibling));
        self.trie[prefix as usize].first_child = Some(next_code);
    }

    fn reset(&mut self) {
        trace!("lzw table full, resetting");
        self.trie.truncate(self.config.first_free_code() as usize);
        for node in &mut self.trie {
            node.first_child = None;
        }
        self.code_len = self.config.initial_code_len();
    }
}
