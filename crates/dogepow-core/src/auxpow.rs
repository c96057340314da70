//! Auxiliary proof-of-work: a block's claim to work done on a parent chain.
//!
//! The parent chain's coinbase commits to the root of a merkle tree of
//! auxiliary block hashes, and the coinbase itself is proven to be in the
//! parent block. [`AuxPow::check`] verifies both proofs and the rules that stop
//! one piece of work from being counted twice for the same chain.

use crate::block::{BlockHeader, BLOCK_HEADER_SIZE};
use crate::cursor::{Decode, DecodeError, Encode, Reader, Writer};
use crate::hash::{ChainHasher, DogeHasher};
use crate::merkle::MerkleBranch;
use crate::transaction::Transaction;

/// Marker placed immediately before the chain merkle root in the coinbase.
pub const MERGED_MINING_HEADER: [u8; 4] = [0xfa, 0xbe, 0x6d, 0x6d];

/// Deepest chain merkle tree accepted.
pub const MAX_CHAIN_BRANCH_LEN: usize = 30;

/// Without a marker, the chain merkle root must start within this many bytes
/// of the coinbase script start.
pub const MAX_ROOT_OFFSET: usize = 20;

/// Reasons an AuxPoW payload is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuxPowError {
    #[error("auxpow is not a generate")]
    NotAGenerate,
    #[error("auxpow parent has our chain id {0}")]
    SameChainId(u32),
    #[error("auxpow chain merkle branch too long: {0}")]
    BranchTooLong(usize),
    #[error("auxpow parent coinbase has no inputs")]
    NoCoinbaseInput,
    #[error("auxpow missing chain merkle root in parent coinbase")]
    RootHashMissing,
    #[error("auxpow merkle root incorrect")]
    MerkleRootMismatch,
    #[error("multiple merged mining headers in coinbase")]
    MultipleMergedMiningHeaders,
    #[error("merged mining header is not just before chain merkle root")]
    MergedMiningHeaderNotAdjacent,
    #[error("auxpow chain merkle root starts at byte {0}, must be within the first 20 bytes of the parent coinbase")]
    RootHashNotEarly(usize),
    #[error("auxpow missing chain merkle tree size and nonce in parent coinbase")]
    MissingSizeAndNonce,
    #[error("auxpow merkle branch size {found} does not match parent coinbase, expected {expected}")]
    SizeMismatch { expected: i32, found: i32 },
    #[error("auxpow wrong index: expected {expected}, side mask {side_mask}")]
    WrongIndex { expected: u32, side_mask: i32 },
}

/// Choose a pseudo-random slot in the chain merkle tree that is fixed for a
/// nonce, chain ID and tree height.
///
/// The same work cannot sit at two slots for one chain, and two chains are
/// unlikely to claim the same slot. All arithmetic wraps at 32 bits.
pub fn expected_index(nonce: u32, chain_id: u32, height: u32) -> u32 {
    let mut rand = nonce;
    rand = rand.wrapping_mul(1103515245).wrapping_add(12345);
    rand = rand.wrapping_add(chain_id);
    rand = rand.wrapping_mul(1103515245).wrapping_add(12345);

    // Heights of 32 and above leave every bit in place.
    match 1u32.checked_shl(height) {
        Some(slots) => rand % slots,
        None => rand,
    }
}

/// An AuxPoW record as it follows a flagged block header on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuxPow {
    /// Parent chain coinbase carrying the merged-mining commitment.
    pub coinbase_tx: Transaction,
    /// Parent block hash as carried on the wire. Not used by validation.
    pub block_hash: [u8; 32],
    /// Proves the coinbase is in the parent block.
    pub coinbase_branch: MerkleBranch,
    /// Proves our block hash is under the root committed in the coinbase.
    pub chain_branch: MerkleBranch,
    /// Parent block header. Never carries payloads of its own.
    pub parent_block: BlockHeader,
}

impl AuxPow {
    /// Validate against the auxiliary block hash (display byte order) and the
    /// chain ID of the block carrying this payload.
    pub fn check(&self, aux_block_hash: &[u8; 32], chain_id: u32) -> Result<(), AuxPowError> {
        self.check_with(aux_block_hash, chain_id, &DogeHasher::default())
    }

    pub fn check_with<H: ChainHasher + ?Sized>(
        &self,
        aux_block_hash: &[u8; 32],
        chain_id: u32,
        hasher: &H,
    ) -> Result<(), AuxPowError> {
        if self.coinbase_branch.side_mask == 0 {
            return Err(AuxPowError::NotAGenerate);
        }
        if self.parent_block.chain_id() == chain_id {
            return Err(AuxPowError::SameChainId(chain_id));
        }
        if self.chain_branch.len() > MAX_CHAIN_BRANCH_LEN {
            return Err(AuxPowError::BranchTooLong(self.chain_branch.len()));
        }

        let script = self
            .coinbase_tx
            .coinbase_script()
            .ok_or(AuxPowError::NoCoinbaseInput)?;

        // The chain merkle root must be in the coinbase
        let root_hash = self
            .chain_branch
            .get_hash(aux_block_hash, hasher)
            .ok_or(AuxPowError::RootHashMissing)?;
        let root_pos = find(script, &root_hash).ok_or(AuxPowError::RootHashMissing)?;

        // The coinbase must be in the parent block
        let merkle_root = self
            .coinbase_branch
            .get_hash(&self.coinbase_tx.hash_with(hasher), hasher);
        if merkle_root.as_deref() != Some(&self.parent_block.merkle_root[..]) {
            return Err(AuxPowError::MerkleRootMismatch);
        }

        // Only one chain merkle root may be committed
        match find(script, &MERGED_MINING_HEADER) {
            Some(head_pos) => {
                if find(&script[head_pos + 1..], &MERGED_MINING_HEADER).is_some() {
                    return Err(AuxPowError::MultipleMergedMiningHeaders);
                }
                if head_pos + MERGED_MINING_HEADER.len() != root_pos {
                    return Err(AuxPowError::MergedMiningHeaderNotAdjacent);
                }
            }
            None => {
                // Older coinbases carry no marker; 8-12 bytes are enough for
                // the extra nonce and bits ahead of the root.
                if root_pos > MAX_ROOT_OFFSET {
                    return Err(AuxPowError::RootHashNotEarly(root_pos));
                }
            }
        }

        // Tree size and nonce follow the root
        let tail = &script[root_pos + root_hash.len()..];
        if tail.len() < 8 {
            return Err(AuxPowError::MissingSizeAndNonce);
        }

        let height = self.chain_branch.len() as u32;
        let size = i32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let expected_size = 1i32 << height;
        if size != expected_size {
            return Err(AuxPowError::SizeMismatch {
                expected: expected_size,
                found: size,
            });
        }

        let nonce = u32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]);
        let expected = expected_index(nonce, chain_id, height);
        let side_mask = self.chain_branch.side_mask;
        if u32::try_from(side_mask) != Ok(expected) {
            return Err(AuxPowError::WrongIndex {
                expected,
                side_mask,
            });
        }

        tracing::trace!("auxpow commitment found at byte {} of parent coinbase", root_pos);
        Ok(())
    }
}

/// Offset of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

impl Decode for AuxPow {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let coinbase_tx = reader.read_object()?;
        let block_hash = reader.read_array()?;
        let coinbase_branch = MerkleBranch::decode_from(reader)?;
        let chain_branch = MerkleBranch::decode_from(reader)?;
        // A fixed slice keeps the parent to its header.
        let parent_block = BlockHeader::decode(reader.read_slice(BLOCK_HEADER_SIZE)?)?;

        Ok(AuxPow {
            coinbase_tx,
            block_hash,
            coinbase_branch,
            chain_branch,
            parent_block,
        })
    }
}

impl Encode for AuxPow {
    fn encoded_len(&self) -> usize {
        self.coinbase_tx.encoded_len()
            + 32
            + self.coinbase_branch.encoded_len()
            + self.chain_branch.encoded_len()
            + BLOCK_HEADER_SIZE
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_object(&self.coinbase_tx);
        writer.write_slice(&self.block_hash);
        writer.write_object(&self.coinbase_branch);
        writer.write_object(&self.chain_branch);
        writer.write_object(&self.parent_block);
    }
}
