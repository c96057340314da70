//! Merkle branches as carried in merged-mining proofs.

use alloc::vec::Vec;
use crate::cursor::{var_int_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::hash::ChainHasher;

/// Side mask value marking a branch that cannot be folded.
pub const INVALID_SIDE_MASK: i32 = -1;

/// A merkle proof path: sibling hashes in fold order plus one direction bit
/// per level.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MerkleBranch {
    pub hashes: Vec<[u8; 32]>,
    /// Bit i (LSB first) set means `hashes[i]` goes on the left.
    pub side_mask: i32,
}

impl MerkleBranch {
    pub fn new(hashes: Vec<[u8; 32]>, side_mask: i32) -> Self {
        MerkleBranch { hashes, side_mask }
    }

    /// Number of levels in the branch.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Fold `leaf` up the branch and return the implied root.
    ///
    /// Returns `None` when the side mask is [`INVALID_SIDE_MASK`].
    pub fn get_hash<H: ChainHasher + ?Sized>(&self, leaf: &[u8], hasher: &H) -> Option<Vec<u8>> {
        if self.side_mask == INVALID_SIDE_MASK {
            return None;
        }

        let mut mask = self.side_mask;
        let mut hash = leaf.to_vec();
        for node in &self.hashes {
            hash = if mask & 1 == 1 {
                hasher.merkle_combine(node, &hash)
            } else {
                hasher.merkle_combine(&hash, node)
            };
            // Arithmetic shift: negative masks keep their sign bits.
            mask >>= 1;
        }
        Some(hash)
    }
}

impl Decode for MerkleBranch {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let hashes = reader.read_list(|r| r.read_array())?;
        let side_mask = reader.read_i32()?;
        Ok(MerkleBranch { hashes, side_mask })
    }
}

impl Encode for MerkleBranch {
    fn encoded_len(&self) -> usize {
        var_int_len(self.hashes.len() as u64) + self.hashes.len() * 32 + 4
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_list(&self.hashes, |w, hash| w.write_slice(hash));
        writer.write_i32(self.side_mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{double_sha256_pair, sha1_pair, DogeHasher, MerkleCombine};
    use alloc::vec;

    #[test]
    fn test_empty_branch_returns_leaf() {
        let leaf = [0x42u8; 32];
        let branch = MerkleBranch::new(vec![], 0);
        assert_eq!(
            branch.get_hash(&leaf, &DogeHasher::default()),
            Some(leaf.to_vec())
        );
    }

    #[test]
    fn test_invalid_side_mask() {
        let branch = MerkleBranch::new(vec![[0x11; 32], [0x22; 32]], INVALID_SIDE_MASK);
        assert_eq!(branch.get_hash(&[0u8; 32], &DogeHasher::default()), None);

        let empty = MerkleBranch::new(vec![], INVALID_SIDE_MASK);
        assert_eq!(empty.get_hash(&[0u8; 32], &DogeHasher::default()), None);
    }

    #[test]
    fn test_fold_directions() {
        let leaf = [0x01u8; 32];
        let a = [0xaau8; 32];
        let b = [0xbbu8; 32];

        // Bit 0 clear: leaf on the left. Bit 1 set: b on the left.
        let branch = MerkleBranch::new(vec![a, b], 0b10);
        let level1 = sha1_pair(&leaf, &a);
        let expected = sha1_pair(&b, &level1);

        assert_eq!(branch.get_hash(&leaf, &DogeHasher::default()), Some(expected));
    }

    #[test]
    fn test_negative_mask_folds_left() {
        // -2 is ...11110: first level right, every later level left.
        let leaf = [0x01u8; 32];
        let a = [0xaau8; 32];
        let b = [0xbbu8; 32];
        let c = [0xccu8; 32];
        let hasher = DogeHasher::with_merkle(MerkleCombine::DoubleSha256);

        let branch = MerkleBranch::new(vec![a, b, c], -2);
        let level1 = double_sha256_pair(&leaf, &a);
        let level2 = double_sha256_pair(&b, &level1);
        let expected = double_sha256_pair(&c, &level2);

        assert_eq!(branch.get_hash(&leaf, &hasher), Some(expected));
    }

    #[test]
    fn test_wire_layout() {
        let branch = MerkleBranch::new(vec![[0x11; 32], [0x22; 32]], 3);
        let raw = branch.encode();

        assert_eq!(raw.len(), 1 + 64 + 4);
        assert_eq!(raw[0], 2);
        assert_eq!(&raw[65..], &[0x03, 0x00, 0x00, 0x00]);
        assert_eq!(MerkleBranch::decode(&raw).unwrap(), branch);
    }
}
