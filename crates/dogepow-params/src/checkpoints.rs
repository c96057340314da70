//! Genesis header and checkpoint bundles.
//!
//! A checkpoint bundle is the header chain's bootstrap data: pairs of
//! consecutive headers (the checkpoint and its parent) so that retargeting
//! can resume from the checkpoint without the history before it.
//!
//! Layout:
//!
//! ```text
//! "Doge checkpoints v1\n"            20 bytes
//! count                              u32 big-endian
//! count x { height u32 big-endian, header 80 bytes }
//! ```

use alloc::vec::Vec;
use dogepow_core::block::BLOCK_HEADER_SIZE;
use dogepow_core::cursor::{DecodeError, Reader, Writer};
use dogepow_core::hash::reverse_bytes;
use dogepow_core::BlockHeader;
use hex_literal::hex;

/// Bundle header bytes.
pub const CHECKPOINT_MAGIC: &[u8; 20] = b"Doge checkpoints v1\n";

/// Heights at which new checkpoints are cut.
pub const CHECKPOINT_INTERVAL: u32 = 30_000;

const ENTRY_SIZE: usize = 4 + BLOCK_HEADER_SIZE;

/// Errors from decoding a checkpoint bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint bundle does not start with the expected magic")]
    BadMagic,
    #[error("malformed checkpoint bundle: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0} trailing bytes after checkpoint bundle")]
    TrailingBytes(usize),
}

/// A header at a known height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint {
    pub height: u32,
    pub header: BlockHeader,
}

impl Checkpoint {
    pub const fn new(height: u32, header: BlockHeader) -> Self {
        Checkpoint { height, header }
    }

    /// Whether `child` sits directly on top of this checkpoint.
    pub fn is_parent_of(&self, child: &Checkpoint) -> bool {
        self.height.checked_add(1) == Some(child.height)
            && child.header.prev_block_hash == self.header.hash()
    }
}

/// Whether a checkpoint is cut at `height`.
pub const fn is_checkpoint_height(height: u32) -> bool {
    height != 0 && height % CHECKPOINT_INTERVAL == 0
}

/// The mainnet genesis header.
pub const fn genesis_header() -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block_hash: [0u8; 32],
        merkle_root: hex!("696ad20e2dd4365c7459b4a4a5af743d5e92c6da3229e6532cd605f6533f2a5b"),
        timestamp: 1386325540,
        bits: 0x1e0ffff0,
        nonce: 99943,
    }
}

/// Built-in mainnet checkpoints: the first digishield block and its parent.
pub fn checkpoints() -> Vec<Checkpoint> {
    alloc::vec![
        Checkpoint::new(
            144_999,
            BlockHeader {
                version: 2,
                prev_block_hash: reverse_bytes(&hex!(
                    "2e910459e9ec3062e7b4e2cfb569c579b43254da53cdd98da671d4ecdeb6a018"
                )),
                merkle_root: reverse_bytes(&hex!(
                    "d0279ba883ca04d216735dcf2978beafeaae852ddf8b7ecf7881c9a29091b74f"
                )),
                timestamp: 1395094427,
                bits: 0x1b499dfd,
                nonce: 3341239808,
            },
        ),
        Checkpoint::new(
            145_000,
            BlockHeader {
                version: 2,
                prev_block_hash: reverse_bytes(&hex!(
                    "919a380db4b45eb97abb131633d87ff690387ebe03ac76690da3f4d681400558"
                )),
                merkle_root: reverse_bytes(&hex!(
                    "316614dcd65aa75888cfe1ebb2190740bd8d1fc3e30a0c1952062740b1419c33"
                )),
                timestamp: 1395094679,
                bits: 0x1b499dfd,
                nonce: 1200826624,
            },
        ),
    ]
}

/// Serialize checkpoints into a bundle.
pub fn encode_checkpoints(checkpoints: &[Checkpoint]) -> Vec<u8> {
    let mut writer =
        Writer::with_capacity(CHECKPOINT_MAGIC.len() + 4 + checkpoints.len() * ENTRY_SIZE);

    writer.write_slice(CHECKPOINT_MAGIC);
    writer.write_u32_be(checkpoints.len() as u32);
    for checkpoint in checkpoints {
        writer.write_u32_be(checkpoint.height);
        writer.write_object(&checkpoint.header);
    }

    writer.into_inner()
}

/// Parse a bundle produced by [`encode_checkpoints`].
///
/// The whole buffer must be consumed.
pub fn decode_checkpoints(bytes: &[u8]) -> Result<Vec<Checkpoint>, CheckpointError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.read_slice(CHECKPOINT_MAGIC.len()).map_err(|err| {
        tracing::debug!("checkpoint bundle too short for magic: {}", err);
        CheckpointError::BadMagic
    })?;
    if magic != CHECKPOINT_MAGIC {
        tracing::debug!("checkpoint bundle has wrong magic");
        return Err(CheckpointError::BadMagic);
    }

    let count = reader.read_u32_be()? as usize;
    let mut checkpoints = Vec::with_capacity(count.min(reader.remaining() / ENTRY_SIZE));
    for _ in 0..count {
        let height = reader.read_u32_be()?;
        let header: BlockHeader = reader.read_object()?;
        checkpoints.push(Checkpoint { height, header });
    }

    if !reader.is_eof() {
        tracing::debug!(
            "checkpoint bundle has {} bytes after {} entries",
            reader.remaining(),
            count
        );
        return Err(CheckpointError::TrailingBytes(reader.remaining()));
    }

    tracing::debug!("decoded {} checkpoints", checkpoints.len());
    Ok(checkpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dogepow_core::hash::hash_to_display_hex;
    use dogepow_core::{Block, SerializationMode};

    #[test]
    fn test_genesis_hash() {
        let genesis = genesis_header();

        assert!(genesis.is_legacy());
        assert_eq!(
            hash_to_display_hex(&genesis.hash()),
            "1a91e3dace36e2be3bf030a65679fe821aa1d6ef92e7c9902eb318182c355691"
        );
        assert!(Block::from_header(genesis).check_proof_of_work().unwrap());
    }

    #[test]
    fn test_checkpoints_link() {
        let list = checkpoints();

        assert_eq!(list.len(), 2);
        assert!(list[0].is_parent_of(&list[1]));
        assert!(!list[1].is_parent_of(&list[0]));
        assert_eq!(
            hash_to_display_hex(&list[1].header.hash()),
            "cc47cae70d7c5c92828d3214a266331dde59087d4a39071fa76ddfff9b7bde72"
        );
    }

    #[test]
    fn test_checkpoints_meet_their_target() {
        for checkpoint in checkpoints() {
            let block = Block::from_header(checkpoint.header);
            assert!(block.check_proof_of_work().unwrap(), "height {}", checkpoint.height);
        }
    }

    #[test]
    fn test_checkpoint_heights() {
        assert!(!is_checkpoint_height(0));
        assert!(is_checkpoint_height(30_000));
        assert!(!is_checkpoint_height(145_000));
        assert!(is_checkpoint_height(150_000));
    }

    #[test]
    fn test_bundle_layout() {
        let list = checkpoints();
        let raw = encode_checkpoints(&list);

        assert_eq!(raw.len(), 20 + 4 + 2 * ENTRY_SIZE);
        assert_eq!(&raw[..20], b"Doge checkpoints v1\n");
        assert_eq!(&raw[20..24], &[0, 0, 0, 2]);
        // 144999 big-endian
        assert_eq!(&raw[24..28], &[0x00, 0x02, 0x36, 0x67]);
        let header_bytes = Block::from_header(list[0].header)
            .encode(SerializationMode::HeadersOnly)
            .unwrap();
        assert_eq!(&raw[28..28 + BLOCK_HEADER_SIZE], &header_bytes[..]);

        assert_eq!(decode_checkpoints(&raw).unwrap(), list);
    }

    #[test]
    fn test_empty_bundle() {
        let raw = encode_checkpoints(&[]);
        assert_eq!(raw.len(), 24);
        assert_eq!(decode_checkpoints(&raw).unwrap(), Vec::new());
    }

    #[test]
    fn test_bad_magic() {
        let mut raw = encode_checkpoints(&checkpoints());
        raw[0] = b'd';
        assert_eq!(decode_checkpoints(&raw), Err(CheckpointError::BadMagic));

        assert_eq!(decode_checkpoints(b"Doge"), Err(CheckpointError::BadMagic));
    }

    #[test]
    fn test_truncated_and_trailing() {
        let raw = encode_checkpoints(&checkpoints());

        assert!(matches!(
            decode_checkpoints(&raw[..raw.len() - 1]),
            Err(CheckpointError::Decode(DecodeError::UnexpectedEof { .. }))
        ));

        let mut padded = raw.clone();
        padded.extend_from_slice(&[0, 0, 0]);
        assert_eq!(
            decode_checkpoints(&padded),
            Err(CheckpointError::TrailingBytes(3))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_checkpoint_json() {
        let genesis = Checkpoint::new(0, genesis_header());
        let json = serde_json::to_string(&genesis).unwrap();
        let parsed: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, genesis);
    }
}
