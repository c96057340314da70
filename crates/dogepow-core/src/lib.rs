//! Dogecoin proof-of-work validation.
//!
//! This crate provides pure Rust implementations of:
//! - Block, transaction and merkle branch wire decoding and encoding
//! - Merged-mining (AuxPoW) proof validation
//! - Scrypt proof-of-work checks against the compact target
//! - Difficulty retargeting across the plain, digishield and AuxPoW epochs
//!
//! Hashing goes through [`ChainHasher`]; [`DogeHasher`] is the default.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod auxpow;
pub mod block;
pub mod cursor;
pub mod difficulty;
pub mod hash;
pub mod merkle;
pub mod retarget;
pub mod transaction;

pub use auxpow::{expected_index, AuxPow, AuxPowError};
pub use block::{Block, BlockHeader, EncodeError, PowError, SerializationMode};
pub use cursor::{Decode, DecodeError, Encode};
pub use difficulty::{bits_to_target, hash_meets_target, target_to_bits};
pub use hash::{double_sha256, scrypt_hash, ChainHasher, DogeHasher, MerkleCombine};
pub use merkle::MerkleBranch;
pub use retarget::{
    calculate_bits, calculate_target, consensus_at, next_target, should_retarget, ConsensusParams,
    HeaderSource, RetargetError,
};
pub use transaction::Transaction;
