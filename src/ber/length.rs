//! BER length encoding/decoding (X.690 definite length form).

use crate::error::{DecodeErrorKind, Error, Result};

/// Maximum accepted length field, guarding against absurd allocations from
/// malformed or adversarial input.
pub const MAX_LENGTH: usize = 64 * 1024 * 1024;

/// Encode a definite-form BER length.
///
/// Returns a fixed-size array holding the encoded bytes **in reverse
/// order** (so callers using the reverse buffer technique can push them
/// directly) along with the number of valid bytes at the front of the
/// array.
pub fn encode_length(len: usize) -> ([u8; 5], usize) {
    if len < 0x80 {
        // Short form: single byte, MSB clear.
        return ([len as u8, 0, 0, 0, 0], 1);
    }

    let bytes = (len as u64).to_be_bytes();
    let mut start = 0;
    while start < 7 && bytes[start] == 0 {
        start += 1;
    }
    let content = &bytes[start..];
    let count = content.len();

    let mut out = [0u8; 5];
    // out[0] is the long-form header byte, out[1..] the length octets in
    // reverse (most significant last) so the caller can push front-to-back.
    out[0] = 0x80 | count as u8;
    for (i, &b) in content.iter().rev().enumerate() {
        out[1 + i] = b;
    }

    (out, count + 1)
}

/// Decode a definite-form BER length from the front of `data`.
///
/// Returns the decoded length and the number of bytes consumed.
pub fn decode_length(data: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let octet_count = (first & 0x7F) as usize;
    if octet_count == 0 {
        return Err(Error::decode(offset, DecodeErrorKind::IndefiniteLength));
    }
    if octet_count > 8 {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::LengthTooLong { octets: octet_count },
        ));
    }

    let content = data
        .get(1..1 + octet_count)
        .ok_or_else(|| Error::decode(offset, DecodeErrorKind::TruncatedData))?;

    let mut value: u64 = 0;
    for &b in content {
        value = (value << 8) | b as u64;
    }

    if value as usize > MAX_LENGTH {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::LengthExceedsMax {
                length: value as usize,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((value as usize, 1 + octet_count))
}
