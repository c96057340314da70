//! Dogecoin mainnet parameters: network constants, the genesis header and
//! checkpoint bundles for bootstrapping a header chain.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod checkpoints;
pub mod network;

pub use checkpoints::{
    checkpoints, decode_checkpoints, encode_checkpoints, genesis_header, is_checkpoint_height,
    Checkpoint, CheckpointError, CHECKPOINT_INTERVAL,
};
pub use network::{NetworkParams, VersionBytes};
