//! Compact difficulty ("bits") conversion and target comparison.

/// Convert compact "bits" representation to a 256-bit target.
///
/// The bits format is: [exponent (1 byte)][mantissa (3 bytes)]
/// Target = mantissa * 256^(exponent - 3)
///
/// The result is a 32-byte big-endian representation of the target. A
/// negative or overflowing encoding expands to zero, which no hash except
/// zero can meet.
pub fn bits_to_target(bits: u32) -> [u8; 32] {
    let exponent = (bits >> 24) as isize;
    let mantissa = bits & 0x007FFFFF;

    let mut target = [0u8; 32];

    // Negative flag (bit 23 of mantissa)
    if (bits & 0x00800000) != 0 && mantissa != 0 {
        return target;
    }

    let mantissa_bytes = [(mantissa >> 16) as u8, (mantissa >> 8) as u8, mantissa as u8];

    // Byte i of the mantissa lands at position (32 - exponent + i). Positions
    // past the end are shifted out; non-zero bytes before the start overflow.
    for (i, &byte) in mantissa_bytes.iter().enumerate() {
        let pos = 32 - exponent + i as isize;
        if pos < 0 {
            if byte != 0 {
                return [0u8; 32];
            }
        } else if pos < 32 {
            target[pos as usize] = byte;
        }
    }

    target
}

/// Convert a 256-bit target back to compact "bits" representation.
///
/// This is the inverse of `bits_to_target`, truncating the target to its
/// three most significant bytes.
pub fn target_to_bits(target: &[u8; 32]) -> u32 {
    // Find the first non-zero byte
    let first_nonzero = match target.iter().position(|&b| b != 0) {
        Some(pos) => pos,
        None => return 0,
    };

    // Calculate exponent (number of bytes from the right)
    let exponent = (32 - first_nonzero) as u32;

    // Extract mantissa (up to 3 bytes starting at first non-zero)
    let mut mantissa: u32 = 0;
    for offset in 0..3 {
        mantissa <<= 8;
        if let Some(&byte) = target.get(first_nonzero + offset) {
            mantissa |= byte as u32;
        }
    }

    // If the high bit of mantissa is set, shift right to avoid the negative flag
    let (exp_adj, mant_adj) = if mantissa & 0x00800000 != 0 {
        (exponent + 1, mantissa >> 8)
    } else {
        (exponent, mantissa)
    };

    (exp_adj << 24) | (mant_adj & 0x007FFFFF)
}

/// Check if a hash meets the difficulty target.
///
/// Both are 32-byte big-endian numbers. Returns true if hash <= target.
#[inline]
pub fn hash_meets_target(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    // Lexicographic order on equal-length big-endian arrays is numeric order.
    hash <= target
}
