//! Difficulty retargeting across Dogecoin's consensus epochs.
//!
//! The chain has run three parameter sets, picked by height alone:
//!
//! | epoch      | heights            | timespan | retarget every |
//! |------------|--------------------|----------|----------------|
//! | plain      | `< 145000`         | 4 hours  | 240 blocks     |
//! | digishield | `145000..371337`   | 1 minute | block          |
//! | auxpow     | `>= 371337`        | 1 minute | block          |
//!
//! [`calculate_target`] takes the two headers bounding a retarget window and
//! returns the new target. Looking those headers up is the caller's job,
//! either directly or through a [`HeaderSource`] with [`next_target`].

use crypto_bigint::{CheckedMul, Encoding, NonZero, U256};

use crate::block::BlockHeader;
use crate::difficulty::target_to_bits;

/// First height of the digishield epoch.
pub const DIGISHIELD_HEIGHT: u32 = 145_000;

/// First height at which AuxPoW blocks are accepted.
pub const AUXPOW_HEIGHT: u32 = 371_337;

/// Errors from looking up the headers a retarget needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RetargetError {
    /// The header source has no header at this height.
    #[error("no header at height {height}")]
    MissingHeader { height: u32 },
    /// The retarget window would start before genesis.
    #[error("height is before the first retarget window")]
    HeightBeforeInterval,
}

/// Consensus parameters of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Seconds one retarget window should take.
    pub target_timespan: u32,
    /// Seconds between blocks.
    pub target_spacing: u32,
    /// Easiest target the chain accepts.
    pub pow_limit: U256,
    /// Whether the digishield amplitude filter applies.
    pub digishield: bool,
    /// Whether blocks may carry an AuxPoW.
    pub aux_pow: bool,
}

impl ConsensusParams {
    /// Pre-digishield parameters.
    pub const PLAIN: ConsensusParams = ConsensusParams {
        target_timespan: 4 * 60 * 60,
        target_spacing: 60,
        pow_limit: U256::from_be_hex(
            "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        ),
        digishield: false,
        aux_pow: false,
    };

    pub const DIGISHIELD: ConsensusParams = ConsensusParams {
        target_timespan: 60,
        digishield: true,
        ..ConsensusParams::PLAIN
    };

    pub const AUXPOW: ConsensusParams = ConsensusParams {
        aux_pow: true,
        ..ConsensusParams::DIGISHIELD
    };

    /// Number of blocks between retargets.
    pub const fn interval(&self) -> u32 {
        self.target_timespan / self.target_spacing
    }

    pub const fn should_retarget(&self, height: u32) -> bool {
        height % self.interval() == 0
    }

    /// `pow_limit` as 32 big-endian bytes.
    pub fn pow_limit_bytes(&self) -> [u8; 32] {
        self.pow_limit.to_be_bytes()
    }
}

/// Parameters in force at `height`.
pub const fn consensus_at(height: u32) -> &'static ConsensusParams {
    if height < DIGISHIELD_HEIGHT {
        &ConsensusParams::PLAIN
    } else if height < AUXPOW_HEIGHT {
        &ConsensusParams::DIGISHIELD
    } else {
        &ConsensusParams::AUXPOW
    }
}

/// Whether the block at `height` gets a new target.
pub const fn should_retarget(height: u32) -> bool {
    consensus_at(height).should_retarget(height)
}

/// Height of the header that opens the retarget window ending at `height - 1`.
///
/// The window reaches one block further back than the interval, except on
/// the very first retarget where that block would be before genesis.
pub fn retarget_start_height(height: u32) -> Result<u32, RetargetError> {
    let interval = consensus_at(height).interval();
    let delta = if height == interval { interval } else { interval + 1 };
    height
        .checked_sub(delta)
        .ok_or(RetargetError::HeightBeforeInterval)
}

/// Clamp the observed window length into the epoch's allowed band.
fn clamp_timespan(height: u32, params: &ConsensusParams, actual: i64) -> i64 {
    let target = i64::from(params.target_timespan);

    let (timespan, min, max) = if params.digishield {
        let filtered = target + (actual - target).div_euclid(8);
        (filtered, target - target / 4, target + target / 2)
    } else if height > 10_000 {
        (actual, target / 4, target * 4)
    } else if height > 5_000 {
        (actual, target / 8, target * 4)
    } else {
        (actual, target / 16, target * 4)
    };

    timespan.clamp(min, max)
}

/// New target for the block at `height`, given the headers opening (`start`)
/// and closing (`end`) the retarget window.
///
/// Returned as a 256-bit big-endian number, never easier than the epoch's
/// proof-of-work limit.
pub fn calculate_target(height: u32, start: &BlockHeader, end: &BlockHeader) -> [u8; 32] {
    let params = consensus_at(height);
    let actual = i64::from(end.timestamp) - i64::from(start.timestamp);
    let timespan = clamp_timespan(height, params, actual);

    // The clamp keeps the timespan positive.
    let timespan = U256::from_u64(timespan as u64);
    let target_timespan = NonZero::new(U256::from_u32(params.target_timespan));

    let expanded = U256::from_be_bytes(end.target());
    let scaled: Option<U256> = expanded.checked_mul(&timespan).into();
    let divisor: Option<NonZero<U256>> = target_timespan.into();

    let target = match (scaled, divisor) {
        (Some(scaled), Some(divisor)) => {
            let (quotient, _) = scaled.div_rem(&divisor);
            quotient.min(params.pow_limit)
        }
        _ => params.pow_limit,
    };

    tracing::trace!(
        height,
        actual,
        bits = end.bits,
        "retarget: {}",
        hex::encode(target.to_be_bytes())
    );

    target.to_be_bytes()
}

/// [`calculate_target`] in compact form.
pub fn calculate_bits(height: u32, start: &BlockHeader, end: &BlockHeader) -> u32 {
    target_to_bits(&calculate_target(height, start, end))
}

/// Lookup of already-accepted headers by height.
pub trait HeaderSource {
    fn header_at(&self, height: u32) -> Option<BlockHeader>;
}

/// A contiguous chain starting at genesis: index is height.
impl HeaderSource for [BlockHeader] {
    fn header_at(&self, height: u32) -> Option<BlockHeader> {
        self.get(height as usize).copied()
    }
}

impl<S: HeaderSource + ?Sized> HeaderSource for &S {
    fn header_at(&self, height: u32) -> Option<BlockHeader> {
        (**self).header_at(height)
    }
}

/// Target required of the block at `height`.
///
/// Off a retarget height this is the previous block's target. Otherwise the
/// window headers are fetched from `source` and passed to
/// [`calculate_target`].
pub fn next_target<S: HeaderSource + ?Sized>(
    height: u32,
    source: &S,
) -> Result<[u8; 32], RetargetError> {
    let end_height = height
        .checked_sub(1)
        .ok_or(RetargetError::HeightBeforeInterval)?;
    let end = source
        .header_at(end_height)
        .ok_or(RetargetError::MissingHeader { height: end_height })?;

    if !should_retarget(height) {
        return Ok(end.target());
    }

    let start_height = retarget_start_height(height)?;
    let start = source
        .header_at(start_height)
        .ok_or(RetargetError::MissingHeader {
            height: start_height,
        })?;

    Ok(calculate_target(height, &start, &end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::bits_to_target;
    use alloc::vec::Vec;
    use hex_literal::hex;

    fn header(timestamp: u32, bits: u32) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Target at `height` for a window that took `actual` seconds.
    fn target_after(height: u32, actual: i64, bits: u32) -> [u8; 32] {
        let start_time = 1_400_000_000u32;
        let end_time = (i64::from(start_time) + actual) as u32;
        calculate_target(height, &header(start_time, bits), &header(end_time, bits))
    }

    #[test]
    fn test_epochs() {
        assert_eq!(consensus_at(0), &ConsensusParams::PLAIN);
        assert_eq!(consensus_at(144_999), &ConsensusParams::PLAIN);
        assert_eq!(consensus_at(145_000), &ConsensusParams::DIGISHIELD);
        assert_eq!(consensus_at(371_336), &ConsensusParams::DIGISHIELD);
        assert_eq!(consensus_at(371_337), &ConsensusParams::AUXPOW);

        assert!(!ConsensusParams::DIGISHIELD.aux_pow);
        assert!(ConsensusParams::AUXPOW.aux_pow);
        assert!(ConsensusParams::AUXPOW.digishield);
        assert_eq!(ConsensusParams::AUXPOW.pow_limit, ConsensusParams::PLAIN.pow_limit);
        assert_eq!(
            ConsensusParams::PLAIN.pow_limit_bytes(),
            hex!("00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff")
        );
    }

    #[test]
    fn test_should_retarget() {
        assert_eq!(ConsensusParams::PLAIN.interval(), 240);
        assert!(should_retarget(240));
        assert!(!should_retarget(241));
        assert!(should_retarget(480));

        // Digishield retargets every block.
        assert_eq!(ConsensusParams::DIGISHIELD.interval(), 1);
        assert!(should_retarget(145_001));
        assert!(should_retarget(400_000));
    }

    #[test]
    fn test_retarget_start_height() {
        // First retarget does not reach back past genesis.
        assert_eq!(retarget_start_height(240), Ok(0));
        assert_eq!(retarget_start_height(480), Ok(239));
        assert_eq!(retarget_start_height(200_000), Ok(199_998));
        assert_eq!(
            retarget_start_height(100),
            Err(RetargetError::HeightBeforeInterval)
        );
    }

    #[test]
    fn test_digishield_filter() {
        // No time passed: 60 + floor(-60 / 8) = 52.
        assert_eq!(
            target_after(200_000, 0, 0x1d00ffff),
            hex!("00000000dddd0000000000000000000000000000000000000000000000000000")
        );
        // Slow window clamps to 90.
        assert_eq!(
            target_after(200_000, 10_000, 0x1d00ffff),
            hex!("000000017ffe8000000000000000000000000000000000000000000000000000")
        );
        // On schedule: unchanged.
        assert_eq!(
            target_after(200_000, 60, 0x1b499dfd),
            hex!("0000000000499dfd000000000000000000000000000000000000000000000000")
        );
        // 60 + floor(60 / 8) = 67.
        assert_eq!(
            target_after(200_000, 120, 0x1b499dfd),
            hex!("00000000005234afd99999999999999999999999999999999999999999999999")
        );
    }

    #[test]
    fn test_negative_timespan_in_auxpow_epoch() {
        // End before start: filtered to 60 - 70, clamped to 45.
        assert_eq!(
            target_after(400_000, -500, 0x1b499dfd),
            hex!("000000000037367dc00000000000000000000000000000000000000000000000")
        );
    }

    #[test]
    fn test_plain_bands() {
        // The same fast window clamps differently per band.
        assert_eq!(
            target_after(20_000, 1000, 0x1c0ffff0),
            hex!("0000000003fffc00000000000000000000000000000000000000000000000000")
        );
        assert_eq!(
            target_after(7_000, 1000, 0x1c0ffff0),
            hex!("0000000001fffe00000000000000000000000000000000000000000000000000")
        );
        assert_eq!(
            target_after(3_000, 1000, 0x1c0ffff0),
            hex!("00000000011c70aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
        );
    }

    #[test]
    fn test_pow_limit_cap() {
        assert_eq!(
            target_after(240, 115_200, 0x1e0ffff0),
            ConsensusParams::PLAIN.pow_limit_bytes()
        );
        // Maximal compact value overflows the multiplication and still caps.
        assert_eq!(
            target_after(20_000, 57_600, 0x2000ffff),
            ConsensusParams::PLAIN.pow_limit_bytes()
        );
    }

    #[test]
    fn test_calculate_bits() {
        let start = header(1_400_000_000, 0x1e0ffff0);
        let end = header(1_400_000_000 + 7_200, 0x1e0ffff0);
        assert_eq!(calculate_bits(480, &start, &end), 0x1e07fff8);
    }

    #[test]
    fn test_next_target_from_chain() {
        let bits = 0x1e0ffff0;
        let chain: Vec<BlockHeader> = (0..480u32)
            .map(|height| header(1_386_325_540 + height * 30, bits))
            .collect();

        // Between retargets the previous target carries over.
        assert_eq!(next_target(300, chain.as_slice()), Ok(bits_to_target(bits)));

        // Window 239..=479 took 240 * 30 seconds, half the schedule.
        assert_eq!(
            next_target(480, chain.as_slice()),
            Ok(hex!("000007fff8000000000000000000000000000000000000000000000000000000"))
        );
    }

    #[test]
    fn test_next_target_missing_headers() {
        let chain = [header(0, 0x1e0ffff0); 10];

        assert_eq!(
            next_target(20, &chain[..]),
            Err(RetargetError::MissingHeader { height: 19 })
        );
        assert_eq!(
            next_target(0, &chain[..]),
            Err(RetargetError::HeightBeforeInterval)
        );

        let sparse: Vec<BlockHeader> = Vec::new();
        assert_eq!(
            next_target(1, sparse.as_slice()),
            Err(RetargetError::MissingHeader { height: 0 })
        );
    }
}
