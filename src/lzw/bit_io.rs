use super::PackingOrder;

/// Packs variable-length codes into bytes.
#[derive(Debug)]
pub(crate) struct BitWriter {
    order: PackingOrder,
    // pending bits that do not yet fill a byte
    acc: u32,
    len: u32,
}

impl BitWriter {
    pub(crate) fn new(order: PackingOrder) -> Self {
        Self { order, acc: 0, len: 0 }
    }

    pub(crate) fn write(&mut self, code: u16, code_len: u8, out: &mut Vec<u8>) {
        let code_len = code_len as u32;
        match self.order {
            PackingOrder::Lsb => {
                self.acc |= (code as u32) << self.len;
                self.len += code_len;
                while self.len >= 8 {
                    out.push(self.acc as u8);
                    self.acc >>= 8;
                    self.len -= 8;
                }
            }
            PackingOrder::Msb => {
                self.acc = (self.acc << code_len) | code as u32;
                self.len += code_len;
                while self.len >= 8 {
                    self.len -= 8;
                    out.push((self.acc >> self.len) as u8);
                }
                self.acc &= (1 << self.len) - 1;
            }
        }
    }

    /// Emit the partial last byte, padded with zero bits.
    pub(crate) fn flush(&mut self, out: &mut Vec<u8>) {
        if self.len > 0 {
            let byte = match self.order {
                PackingOrder::Lsb => self.acc as u8,
                PackingOrder::Msb => (self.acc << (8 - self.len)) as u8,
            };
            out.push(byte);
        }
        self.acc = 0;
        self.len = 0;
    }
}

/// Unpacks variable-length codes from bytes fed one at a time.
///
/// Bytes can arrive from separate buffers; whatever bits are left over at the
/// end of one buffer carry into the next.
#[derive(Debug)]
pub(crate) struct BitReader {
    order: PackingOrder,
    acc: u64,
    len: u32,
}

impl BitReader {
    pub(crate) fn new(order: PackingOrder) -> Self {
        Self { order, acc: 0, len: 0 }
    }

    pub(crate) fn push(&mut self, byte: u8) {
        match self.order {
            PackingOrder::Lsb => self.acc |= (byte as u64) << self.len,
            PackingOrder::Msb => self.acc = (self.acc << 8) | byte as u64,
        }
        self.len += 8;
    }

    /// Take the next `code_len` bits, if that many are buffered.
    pub(crate) fn read(&mut self, code_len: u8) -> Option<u16> {
        let code_len = code_len as u32;
        if self.len < code_len {
            return None;
        }
        let mask: u64 = (1 << code_len) - 1;
        let code = match self.order {
            PackingOrder::Lsb => {
                let code = self.acc & mask;
                self.acc >>= code_len;
                self.len -= code_len;
                code
            }
            PackingOrder::Msb => {
                self.len -= code_len;
                let code = (self.acc >> self.len) & mask;
                self.acc &= (1 << self.len) - 1;
                code
            }
        };
        Some(code as u16)
    }
}
