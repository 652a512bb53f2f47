//! LSB-first bit packing for 128-bit BC6H/BC7 blocks.

pub(crate) struct BitReader {
    bits: u128,
    pos: u32,
}

impl BitReader {
    pub fn new(block: &[u8; 16]) -> Self {
        Self {
            bits: u128::from_le_bytes(*block),
            pos: 0,
        }
    }

    /// Read `n` bits (at most 32). Reads past the end yield zeros.
    pub fn read(&mut self, n: u32) -> u32 {
        if n == 0 || self.pos >= 128 {
            self.pos = self.pos.saturating_add(n);
            return 0;
        }
        let v = (self.bits >> self.pos) as u32 & mask(n);
        self.pos += n;
        v
    }

    pub fn read_bit(&mut self) -> u32 {
        self.read(1)
    }
}

#[derive(Default)]
pub(crate) struct BitWriter {
    bits: u128,
    pos: u32,
}

impl BitWriter {
    pub fn write(&mut self, value: u32, n: u32) {
        debug_assert!(self.pos + n <= 128);
        if n == 0 {
            return;
        }
        self.bits |= u128::from(value & mask(n)) << self.pos;
        self.pos += n;
    }

    pub fn position(&self) -> u32 {
        self.pos
    }

    pub fn finish(self) -> [u8; 16] {
        self.bits.to_le_bytes()
    }
}

fn mask(n: u32) -> u32 {
    if n >= 32 { u32::MAX } else { (1 << n) - 1 }
}
