//! Reversible text compression for the persisted cache blob
//!
//! An LZ78-family codec compatible with LZ-String 1.4.4. The dictionary is
//! built in a single pass with no pre-shared state, so any finite string can
//! be packed into a stream of 6-, 15- or 16-bit symbols and recovered
//! exactly. Three variants are exposed:
//!
//! - [`compress_to_base64`] / [`decompress_from_base64`]: 6-bit symbols over
//!   a base64 table, padded with `=` to conventional four-symbol framing.
//! - [`compress_to_utf16`] / [`decompress_from_utf16`]: 15-bit symbols
//!   offset by 32, which keeps every output character a BMP scalar value and
//!   therefore safe to store wherever a `String` fits. The cache store uses
//!   this variant.
//! - [`compress`] / [`decompress`]: raw 16-bit symbols. The output can
//!   contain lone surrogate values, so this variant works on `Vec<u16>`.
//!
//! Input text is processed as UTF-16 code units; surrogate halves of a pair
//! travel through the dictionary as two independent units and reassemble on
//! decode. Decompression of data the compressor did not produce fails with a
//! [`CodecError`] rather than returning garbage.

mod bits;

use std::collections::{HashMap, HashSet};

use bits::{BitReader, BitWriter};

use crate::errors::CodecError;

/// Reserved code: the next 8 bits are a literal code unit.
const CODE_BYTE_LITERAL: u32 = 0;
/// Reserved code: the next 16 bits are a literal code unit.
const CODE_WIDE_LITERAL: u32 = 1;
/// Reserved code: end of stream.
const CODE_END_OF_STREAM: u32 = 2;
/// First code available for real dictionary entries.
const FIRST_DICTIONARY_CODE: u32 = 3;

/// 65-entry table: 64 data symbols plus `=` for framing padding.
const BASE64_ALPHABET: &[u8; 65] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";

/// Marker in [`BASE64_REVERSE`] for characters outside the alphabet.
const BASE64_INVALID: u8 = 0xFF;

/// Symbol value by ASCII character, the inverse of [`BASE64_ALPHABET`].
const BASE64_REVERSE: [u8; 128] = {
    let mut table = [BASE64_INVALID; 128];
    let mut i = 0;
    while i < BASE64_ALPHABET.len() {
        table[BASE64_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Offset added to 15-bit symbols; keeps them printable and below the
/// surrogate range (maximum 32767 + 32 < 0xD800).
const UTF16_SYMBOL_OFFSET: u32 = 32;

/// Compress to raw 16-bit symbols.
pub fn compress(input: &str) -> Vec<u16> {
    compress_units(&encode_units(input), 16)
}

/// Decompress a raw 16-bit symbol stream.
pub fn decompress(symbols: &[u16]) -> Result<String, CodecError> {
    decode_units(decompress_units(symbols, 16)?)
}

/// Compress to a string of 15-bit symbols, each offset by 32.
///
/// A single trailing space is appended, matching the framing of the original
/// format so blobs written by either implementation interchange.
pub fn compress_to_utf16(input: &str) -> String {
    let mut output: String = compress_units(&encode_units(input), 15)
        .into_iter()
        .map(|symbol| symbol_char(u32::from(symbol) + UTF16_SYMBOL_OFFSET))
        .collect();
    output.push(' ');
    output
}

/// Decompress a string produced by [`compress_to_utf16`].
pub fn decompress_from_utf16(input: &str) -> Result<String, CodecError> {
    let mut symbols = Vec::with_capacity(input.len());
    for symbol in input.chars() {
        let value = (symbol as u32)
            .checked_sub(UTF16_SYMBOL_OFFSET)
            .filter(|value| *value <= u32::from(u16::MAX))
            .ok_or(CodecError::InvalidSymbol { symbol })?;
        symbols.push(value as u16);
    }
    decode_units(decompress_units(&symbols, 15)?)
}

/// Compress to base64 text, padded with `=` to a multiple of four symbols.
pub fn compress_to_base64(input: &str) -> String {
    let mut output: String = compress_units(&encode_units(input), 6)
        .into_iter()
        .map(|symbol| BASE64_ALPHABET[symbol as usize] as char)
        .collect();
    while output.len() % 4 != 0 {
        output.push('=');
    }
    output
}

/// Decompress a string produced by [`compress_to_base64`].
///
/// The `=` padding maps to table entry 64; its high bit sits above the 6-bit
/// read mask, so padding decodes as zero bits past the end-of-stream code.
pub fn decompress_from_base64(input: &str) -> Result<String, CodecError> {
    let mut symbols = Vec::with_capacity(input.len());
    for symbol in input.chars() {
        let value = BASE64_REVERSE
            .get(symbol as usize)
            .copied()
            .filter(|&value| value != BASE64_INVALID)
            .ok_or(CodecError::InvalidSymbol { symbol })?;
        symbols.push(u16::from(value));
    }
    decode_units(decompress_units(&symbols, 6)?)
}

fn encode_units(input: &str) -> Vec<u16> {
    input.encode_utf16().collect()
}

fn decode_units(units: Vec<u16>) -> Result<String, CodecError> {
    String::from_utf16(&units).map_err(|_| CodecError::InvalidText)
}

fn symbol_char(value: u32) -> char {
    // Symbol values stay below the surrogate range, see UTF16_SYMBOL_OFFSET.
    char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Encoder state threaded through one compression pass.
struct Compressor {
    /// Substring -> code, grown as the pass discovers new substrings.
    dictionary: HashMap<Vec<u16>, u32>,
    /// Code units that have a dictionary code but have never been emitted.
    /// Their first emission goes out as a literal instead of the code.
    pending_literals: HashSet<Vec<u16>>,
    next_code: u32,
    /// Codes left at the current width before it grows by one bit.
    enlarge_in: u32,
    code_width: u32,
    writer: BitWriter,
}

impl Compressor {
    fn new(bits_per_symbol: u32) -> Self {
        Self {
            dictionary: HashMap::new(),
            pending_literals: HashSet::new(),
            next_code: FIRST_DICTIONARY_CODE,
            // The first entry gets its code for free; see LZ-String 1.4.4.
            enlarge_in: 2,
            code_width: 2,
            writer: BitWriter::new(bits_per_symbol),
        }
    }

    fn intern_unit(&mut self, unit: u16) {
        if !self.dictionary.contains_key(&[unit][..]) {
            self.dictionary.insert(vec![unit], self.next_code);
            self.next_code += 1;
            self.pending_literals.insert(vec![unit]);
        }
    }

    /// Emit the code for the current match `w`.
    ///
    /// A unit seen for the first time goes out as a literal: the 8-bit or
    /// 16-bit marker at the current code width, then the unit itself
    /// LSB-first. Anything already emitted once uses its dictionary code.
    fn emit(&mut self, w: &[u16]) {
        if self.pending_literals.remove(w) {
            let unit = u32::from(w[0]);
            if unit < 256 {
                self.writer.write_bits(self.code_width, CODE_BYTE_LITERAL);
                self.writer.write_bits(8, unit);
            } else {
                self.writer.write_bits(self.code_width, CODE_WIDE_LITERAL);
                self.writer.write_bits(16, unit);
            }
            self.count_code();
        } else {
            let code = self.dictionary[w];
            self.writer.write_bits(self.code_width, code);
        }
        self.count_code();
    }

    fn count_code(&mut self) {
        self.enlarge_in -= 1;
        if self.enlarge_in == 0 {
            self.enlarge_in = 1 << self.code_width;
            self.code_width += 1;
        }
    }

    fn insert_phrase(&mut self, phrase: Vec<u16>) {
        self.dictionary.insert(phrase, self.next_code);
        self.next_code += 1;
    }
}

/// One full compression pass over `input` code units.
fn compress_units(input: &[u16], bits_per_symbol: u32) -> Vec<u16> {
    let mut state = Compressor::new(bits_per_symbol);
    let mut w: Vec<u16> = Vec::new();

    for &unit in input {
        state.intern_unit(unit);

        let mut wc = w.clone();
        wc.push(unit);
        if state.dictionary.contains_key(&wc[..]) {
            w = wc;
        } else {
            state.emit(&w);
            state.insert_phrase(wc);
            w.clear();
            w.push(unit);
        }
    }

    if !w.is_empty() {
        state.emit(&w);
    }
    state
        .writer
        .write_bits(state.code_width, CODE_END_OF_STREAM);
    state.writer.finish()
}

/// One full decompression pass, reconstructing the encoder's dictionary in
/// lockstep.
fn decompress_units(symbols: &[u16], bits_per_symbol: u32) -> Result<Vec<u16>, CodecError> {
    if symbols.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = BitReader::new(symbols, bits_per_symbol);
    // Slots 0..3 are the reserved codes; they are matched before lookup and
    // the placeholder entries are never dereferenced.
    let mut dictionary: Vec<Vec<u16>> = vec![Vec::new(); FIRST_DICTIONARY_CODE as usize];
    let mut enlarge_in: u32 = 4;
    let mut code_width: u32 = 3;
    let mut output: Vec<u16> = Vec::new();

    // The first code is always a literal (or an immediate end of stream) and
    // is read at the initial two-bit width.
    let first = reader.read_bits(2)?;
    let seed: u16 = match first {
        CODE_BYTE_LITERAL => reader.read_bits(8)? as u16,
        CODE_WIDE_LITERAL => reader.read_bits(16)? as u16,
        CODE_END_OF_STREAM => return Ok(Vec::new()),
        code => return Err(CodecError::InvalidCode { code: code as usize }),
    };
    dictionary.push(vec![seed]);
    let mut w = vec![seed];
    output.push(seed);

    loop {
        let mut code = reader.read_bits(code_width)? as usize;
        match code as u32 {
            CODE_BYTE_LITERAL | CODE_WIDE_LITERAL => {
                let literal_bits = if code as u32 == CODE_BYTE_LITERAL { 8 } else { 16 };
                let unit = reader.read_bits(literal_bits)? as u16;
                dictionary.push(vec![unit]);
                code = dictionary.len() - 1;
                enlarge_in -= 1;
            }
            CODE_END_OF_STREAM => return Ok(output),
            _ => {}
        }
        if enlarge_in == 0 {
            enlarge_in = 1 << code_width;
            code_width += 1;
        }

        let entry = if code < dictionary.len() {
            dictionary[code].clone()
        } else if code == dictionary.len() {
            // The classic LZW special case: a code referencing the entry
            // currently being defined decodes as w + w[0].
            let mut entry = w.clone();
            entry.push(w[0]);
            entry
        } else {
            return Err(CodecError::InvalidCode { code });
        };
        output.extend_from_slice(&entry);

        let mut phrase = w;
        phrase.push(entry[0]);
        dictionary.push(phrase);
        enlarge_in -= 1;
        w = entry;

        if enlarge_in == 0 {
            enlarge_in = 1 << code_width;
            code_width += 1;
        }
    }
}
