//! Hamming(7,4) forward error correction
//!
//! Every byte travels as two 7-bit codewords (high nibble first), 14 bits in
//! total. A single flipped bit per codeword is corrected silently; two or more
//! flipped bits in the same codeword can decode to the wrong nibble and are not
//! detected.

use crate::error::{ModemError, Result};
use crate::BITS_PER_ENCODED_BYTE;

/// Generator matrix (7x4), applied mod 2 to the MSB-first data vector
const GENERATOR: [[u8; 4]; 7] = [
    [1, 1, 0, 1],
    [1, 0, 1, 1],
    [1, 0, 0, 0],
    [0, 1, 1, 1],
    [0, 1, 0, 0],
    [0, 0, 1, 0],
    [0, 0, 0, 1],
];

/// Parity-check matrix (3x7); column i is the binary form of i + 1
const PARITY: [[u8; 7]; 3] = [
    [1, 0, 1, 0, 1, 0, 1],
    [0, 1, 1, 0, 0, 1, 1],
    [0, 0, 0, 1, 1, 1, 1],
];

/// Codeword positions that carry the data bits, MSB first
const DATA_POSITIONS: [usize; 4] = [2, 4, 5, 6];

fn multiply<const R: usize, const C: usize>(matrix: &[[u8; C]; R], vector: &[u8; C]) -> [u8; R] {
    let mut out = [0u8; R];
    for (row, cell) in matrix.iter().zip(out.iter_mut()) {
        let sum: u8 = row
            .iter()
            .zip(vector.iter())
            .map(|(&m, &v)| m & v & 1)
            .sum();
        *cell = sum % 2;
    }
    out
}

/// Encode the low 4 bits of `nibble` into a 7-bit codeword
pub fn encode_nibble(nibble: u8) -> [u8; 7] {
    let data = [
        (nibble >> 3) & 1,
        (nibble >> 2) & 1,
        (nibble >> 1) & 1,
        nibble & 1,
    ];
    multiply(&GENERATOR, &data)
}

/// Syndrome of a received codeword as an integer: 0 means no error,
/// 1..=7 is the 1-indexed position of the flipped bit.
pub fn syndrome(codeword: &[u8; 7]) -> usize {
    let syn = multiply(&PARITY, codeword);
    (syn[2] as usize) * 4 + (syn[1] as usize) * 2 + syn[0] as usize
}

/// Decode a 7-bit codeword, correcting up to one flipped bit
pub fn decode_nibble(codeword: &[u8; 7]) -> u8 {
    let mut corrected = *codeword;
    let error_pos = syndrome(codeword);
    if error_pos != 0 {
        corrected[error_pos - 1] ^= 1;
    }

    DATA_POSITIONS
        .iter()
        .fold(0u8, |acc, &pos| (acc << 1) | (corrected[pos] & 1))
}

/// Encode one byte into 14 bits: high nibble codeword, then low nibble codeword
pub fn encode_byte(byte: u8) -> [u8; BITS_PER_ENCODED_BYTE] {
    let mut bits = [0u8; BITS_PER_ENCODED_BYTE];
    bits[..7].copy_from_slice(&encode_nibble(byte >> 4));
    bits[7..].copy_from_slice(&encode_nibble(byte & 0x0F));
    bits
}

pub fn decode_byte(bits: &[u8; BITS_PER_ENCODED_BYTE]) -> u8 {
    let mut high = [0u8; 7];
    let mut low = [0u8; 7];
    high.copy_from_slice(&bits[..7]);
    low.copy_from_slice(&bits[7..]);
    (decode_nibble(&high) << 4) | decode_nibble(&low)
}

/// Encode a payload into its transmitted bit sequence
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|&b| encode_byte(b)).collect()
}

/// Reassemble bytes from a received bit sequence.
///
/// Fails with `MalformedBitstream` when the sequence is empty or not a whole
/// number of 14-bit groups.
pub fn decode_bits(bits: &[u8]) -> Result<Vec<u8>> {
    if bits.is_empty() || bits.len() % BITS_PER_ENCODED_BYTE != 0 {
        return Err(ModemError::MalformedBitstream { bits: bits.len() });
    }

    let mut group = [0u8; BITS_PER_ENCODED_BYTE];
    let bytes = bits
        .chunks_exact(BITS_PER_ENCODED_BYTE)
        .map(|chunk| {
            group.copy_from_slice(chunk);
            decode_byte(&group)
        })
        .collect();

    Ok(bytes)
}
