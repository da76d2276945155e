//! Bit-stream plumbing for the codec
//!
//! Variable-width codes are written least-significant-bit first, while each
//! output symbol is filled from its most significant bit down. Both ends are
//! explicit little state machines so the encode/decode steps in the parent
//! module stay pure.

use crate::errors::CodecError;

/// Accumulates bits into fixed-width output symbols.
pub(super) struct BitWriter {
    symbols: Vec<u16>,
    current: u16,
    filled: u32,
    bits_per_symbol: u32,
}

impl BitWriter {
    pub(super) fn new(bits_per_symbol: u32) -> Self {
        Self {
            symbols: Vec::new(),
            current: 0,
            filled: 0,
            bits_per_symbol,
        }
    }

    fn push_bit(&mut self, bit: u32) {
        self.current = (self.current << 1) | (bit & 1) as u16;
        self.filled += 1;
        if self.filled == self.bits_per_symbol {
            self.symbols.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    /// Write the low `count` bits of `value`, least significant first.
    pub(super) fn write_bits(&mut self, count: u32, mut value: u32) {
        for _ in 0..count {
            self.push_bit(value & 1);
            value >>= 1;
        }
    }

    /// Pad with zero bits to the next symbol boundary and return the stream.
    ///
    /// Always emits one final symbol, even when the last code ended exactly
    /// on a boundary. Decoders stop at the end-of-stream code, so the extra
    /// padding symbol is never interpreted.
    pub(super) fn finish(mut self) -> Vec<u16> {
        loop {
            self.current <<= 1;
            self.filled += 1;
            if self.filled == self.bits_per_symbol {
                self.symbols.push(self.current);
                break;
            }
        }
        self.symbols
    }
}

/// Reads bits back out of a fixed-width symbol stream.
pub(super) struct BitReader<'a> {
    symbols: &'a [u16],
    index: usize,
    current: u16,
    mask: u16,
    reset_mask: u16,
}

impl<'a> BitReader<'a> {
    pub(super) fn new(symbols: &'a [u16], bits_per_symbol: u32) -> Self {
        Self {
            symbols,
            index: 0,
            current: 0,
            mask: 0,
            reset_mask: 1 << (bits_per_symbol - 1),
        }
    }

    fn read_bit(&mut self) -> Result<u32, CodecError> {
        if self.mask == 0 {
            let symbol = self
                .symbols
                .get(self.index)
                .copied()
                .ok_or(CodecError::Truncated)?;
            self.current = symbol;
            self.index += 1;
            self.mask = self.reset_mask;
        }
        let bit = u32::from(self.current & self.mask != 0);
        self.mask >>= 1;
        Ok(bit)
    }

    /// Read `count` bits, least significant first, mirroring `write_bits`.
    pub(super) fn read_bits(&mut self, count: u32) -> Result<u32, CodecError> {
        let mut value = 0u32;
        for position in 0..count {
            value |= self.read_bit()? << position;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_pads_final_symbol_with_zeros() {
        let mut writer = BitWriter::new(6);
        writer.write_bits(2, 0b10);
        let symbols = writer.finish();
        // Bits arrive LSB-first (0 then 1), filled MSB-down: 010000.
        assert_eq!(symbols, vec![0b010000]);
    }

    #[test]
    fn writer_emits_trailing_symbol_on_exact_boundary() {
        let mut writer = BitWriter::new(4);
        writer.write_bits(4, 0b1111);
        assert_eq!(writer.finish(), vec![0b1111, 0b0000]);
    }

    #[test]
    fn reader_round_trips_writer_output() {
        let mut writer = BitWriter::new(15);
        writer.write_bits(2, 1);
        writer.write_bits(16, 40000);
        writer.write_bits(7, 77);
        let symbols = writer.finish();

        let mut reader = BitReader::new(&symbols, 15);
        assert_eq!(reader.read_bits(2).unwrap(), 1);
        assert_eq!(reader.read_bits(16).unwrap(), 40000);
        assert_eq!(reader.read_bits(7).unwrap(), 77);
    }

    #[test]
    fn reader_reports_truncation() {
        let symbols = vec![0u16];
        let mut reader = BitReader::new(&symbols, 6);
        assert_eq!(reader.read_bits(6).unwrap(), 0);
        assert_eq!(reader.read_bits(1), Err(CodecError::Truncated));
    }
}
