//! Base16384 encoding of 64-bit fingerprints.
//!
//! The fingerprint is written big-endian and padded with six zero bits to a
//! 70-bit stream, which is split into five 14-bit groups. Each group `g` maps to
//! the CJK ideograph `U+4E00 + g`. Decoding rejects any string that could not
//! have been produced by [`encode`], so the mapping is a bijection.

use thiserror::Error;

/// Number of characters in an encoded identifier.
pub const IDENTIFIER_LEN: usize = 5;

/// First code point of the base16384 alphabet.
const ALPHABET_BASE: u32 = 0x4E00;

/// Bits carried by one character.
const BITS_PER_CHAR: u32 = 14;

/// Zero bits appended after the 64 fingerprint bits.
const PADDING_BITS: u32 = IDENTIFIER_LEN as u32 * BITS_PER_CHAR - 64;

const GROUP_MASK: u128 = (1 << BITS_PER_CHAR) - 1;

/// Errors returned when an identifier cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Identifier does not have exactly [`IDENTIFIER_LEN`] characters.
    #[error("identifier must be {IDENTIFIER_LEN} characters, got {0}")]
    InvalidLength(usize),

    /// A character lies outside the base16384 alphabet.
    #[error("invalid character {character:?} at position {position}")]
    InvalidCharacter {
        /// Offending character
        character: char,
        /// Character position (0-based)
        position: usize,
    },

    /// Padding bits are not zero, so no fingerprint encodes to this string.
    #[error("identifier {0:?} is not canonically encoded")]
    NonCanonical(String),
}

/// Encode a raw 64-bit value into its 5-character identifier string.
#[must_use]
pub fn encode(value: u64) -> String {
    let stream = u128::from(value) << PADDING_BITS;
    let mut out = String::with_capacity(IDENTIFIER_LEN * 3);

    for i in (0..IDENTIFIER_LEN as u32).rev() {
        let group = ((stream >> (i * BITS_PER_CHAR)) & GROUP_MASK) as u32;
        // group < 2^14, so the code point stays inside U+4E00..=U+8DFF
        if let Some(c) = char::from_u32(ALPHABET_BASE + group) {
            out.push(c);
        }
    }

    out
}

/// Decode an identifier string back into its 64-bit value.
pub fn decode(identifier: &str) -> Result<u64, CodecError> {
    let count = identifier.chars().count();
    if count != IDENTIFIER_LEN {
        return Err(CodecError::InvalidLength(count));
    }

    let mut stream: u128 = 0;
    for (position, character) in identifier.chars().enumerate() {
        let group = (character as u32)
            .checked_sub(ALPHABET_BASE)
            .filter(|g| u128::from(*g) <= GROUP_MASK)
            .ok_or(CodecError::InvalidCharacter {
                character,
                position,
            })?;
        stream = (stream << BITS_PER_CHAR) | u128::from(group);
    }

    if stream & ((1 << PADDING_BITS) - 1) != 0 {
        return Err(CodecError::NonCanonical(identifier.to_string()));
    }

    Ok((stream >> PADDING_BITS) as u64)
}
