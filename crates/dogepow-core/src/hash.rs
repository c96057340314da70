//! Hash primitives used by block, transaction and merkle hashing.
//!
//! Consensus code never calls these directly; it goes through a
//! [`ChainHasher`] so that callers can swap in their own implementation.

use alloc::vec::Vec;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Bitcoin's double SHA256: SHA256(SHA256(data)).
///
/// Used for block identity hashes and transaction IDs.
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut result = [0u8; 32];
    result.copy_from_slice(&second);
    result
}

/// Litecoin-style scrypt proof-of-work hash.
///
/// The header is both password and salt, with N=1024, r=1, p=1 and a
/// 32-byte output.
pub fn scrypt_hash(data: &[u8]) -> [u8; 32] {
    // log2(N) = 10 with r = p = 1 is within every bound `Params::new` checks,
    // and it only fails on out-of-range parameters.
    let params = scrypt::Params::new(10, 1, 1, 32).expect("static scrypt parameters");
    let mut result = [0u8; 32];
    // `scrypt` only fails when the output buffer length is zero or too long;
    // 32 bytes is neither.
    scrypt::scrypt(data, data, &params, &mut result).expect("32-byte scrypt output");
    result
}

/// SHA1 over `left || right`. Produces 20 bytes.
pub fn sha1_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
    Sha1::new()
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .to_vec()
}

/// Double SHA256 over `left || right`.
pub fn double_sha256_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
    let first = Sha256::new().chain_update(left).chain_update(right).finalize();
    Sha256::digest(first).to_vec()
}

/// Reverse the byte order of a 32-byte array.
///
/// Hashes are computed in internal order and compared or displayed reversed.
#[inline]
pub fn reverse_bytes(bytes: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *bytes;
    reversed.reverse();
    reversed
}

/// Convert a hash to its display format (reversed hex).
pub fn hash_to_display_hex(hash: &[u8; 32]) -> alloc::string::String {
    hex::encode(reverse_bytes(hash))
}

/// The hash functions consensus checks depend on.
pub trait ChainHasher {
    /// Identity hash of a header or a transaction.
    fn double_hash(&self, data: &[u8]) -> [u8; 32];

    /// Proof-of-work hash of an 80-byte header.
    fn pow_hash(&self, header: &[u8]) -> [u8; 32];

    /// Combine two merkle nodes. The output length depends on the combiner.
    fn merkle_combine(&self, left: &[u8], right: &[u8]) -> Vec<u8>;
}

/// How merkle branch nodes are folded together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MerkleCombine {
    /// Single SHA1 over the concatenation, giving 20-byte nodes.
    ///
    /// Merged-mining proofs on the live chain fold with double SHA256, so a
    /// branch with at least one node will not reproduce a 32-byte merkle root
    /// under this combiner.
    #[default]
    Sha1,
    /// Double SHA256 over the concatenation, giving 32-byte nodes.
    DoubleSha256,
}

/// Default [`ChainHasher`]: double SHA256 identity, scrypt proof-of-work and a
/// selectable merkle combiner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DogeHasher {
    pub merkle: MerkleCombine,
}

impl DogeHasher {
    pub const fn with_merkle(merkle: MerkleCombine) -> Self {
        DogeHasher { merkle }
    }
}

impl ChainHasher for DogeHasher {
    fn double_hash(&self, data: &[u8]) -> [u8; 32] {
        double_sha256(data)
    }

    fn pow_hash(&self, header: &[u8]) -> [u8; 32] {
        scrypt_hash(header)
    }

    fn merkle_combine(&self, left: &[u8], right: &[u8]) -> Vec<u8> {
        match self.merkle {
            MerkleCombine::Sha1 => sha1_pair(left, right),
            MerkleCombine::DoubleSha256 => double_sha256_pair(left, right),
        }
    }
}
