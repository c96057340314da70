//! Block headers, blocks and proof-of-work verification.

use alloc::vec::Vec;
use crate::auxpow::{AuxPow, AuxPowError};
use crate::cursor::{var_int_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::difficulty::{bits_to_target, hash_meets_target};
use crate::hash::{hash_to_display_hex, reverse_bytes, ChainHasher, DogeHasher};
use crate::transaction::Transaction;

/// Size of a block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Version bit announcing an AuxPoW payload after the header.
pub const VERSION_AUXPOW: i32 = 0x100;

/// A block header (80 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// Packed version: low byte is the wire version, bit 0x100 the AuxPoW
    /// flag, the high 16 bits the chain ID.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: u32,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Wire version from the low byte of the version field.
    pub fn wire_version(&self) -> u32 {
        (self.version as u32) & 0xff
    }

    /// Chain ID from the high 16 bits of the version field, read unsigned.
    pub fn chain_id(&self) -> u32 {
        (self.version as u32) >> 16
    }

    /// Whether the version announces an AuxPoW payload.
    pub fn has_aux_pow(&self) -> bool {
        self.version & VERSION_AUXPOW != 0
    }

    /// Whether this is a pre-merged-mining block without a chain ID.
    pub fn is_legacy(&self) -> bool {
        let version = self.wire_version();
        version == 1 || (version == 2 && self.chain_id() == 0)
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];

        // Version (4 bytes, little-endian)
        header[0..4].copy_from_slice(&self.version.to_le_bytes());

        // Previous block hash (32 bytes, internal byte order)
        header[4..36].copy_from_slice(&self.prev_block_hash);

        // Merkle root (32 bytes)
        header[36..68].copy_from_slice(&self.merkle_root);

        // Timestamp, bits and nonce (4 bytes each, little-endian)
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_le_bytes());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());

        header
    }

    /// Block identity hash (double SHA256, internal byte order).
    pub fn hash(&self) -> [u8; 32] {
        self.hash_with(&DogeHasher::default())
    }

    pub fn hash_with<H: ChainHasher + ?Sized>(&self, hasher: &H) -> [u8; 32] {
        hasher.double_hash(&self.serialize())
    }

    /// Raw scrypt proof-of-work hash (internal byte order).
    pub fn pow_hash(&self) -> [u8; 32] {
        self.pow_hash_with(&DogeHasher::default())
    }

    pub fn pow_hash_with<H: ChainHasher + ?Sized>(&self, hasher: &H) -> [u8; 32] {
        hasher.pow_hash(&self.serialize())
    }

    /// Get the target as a 256-bit big-endian number.
    pub fn target(&self) -> [u8; 32] {
        bits_to_target(self.bits)
    }
}

impl Decode for BlockHeader {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(BlockHeader {
            version: reader.read_i32()?,
            prev_block_hash: reader.read_array()?,
            merkle_root: reader.read_array()?,
            timestamp: reader.read_u32()?,
            bits: reader.read_u32()?,
            nonce: reader.read_u32()?,
        })
    }
}

impl Encode for BlockHeader {
    fn encoded_len(&self) -> usize {
        BLOCK_HEADER_SIZE
    }

    fn encode_to(&self, writer: &mut Writer) {
        writer.write_slice(&self.serialize());
    }
}

/// Which parts of a block are read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SerializationMode {
    /// The 80-byte header only.
    HeadersOnly,
    /// Header plus the AuxPoW payload when the version flags one.
    WithAuxPow,
    /// Header, AuxPoW payload and the transaction list.
    Full,
}

impl SerializationMode {
    fn includes_aux_pow(self) -> bool {
        self != SerializationMode::HeadersOnly
    }

    fn includes_transactions(self) -> bool {
        self == SerializationMode::Full
    }
}

/// Errors from proof-of-work verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PowError {
    /// The AuxPoW payload failed validation.
    #[error("invalid auxpow: {0}")]
    AuxPow(#[from] AuxPowError),
    /// The version flags an AuxPoW payload but none was decoded.
    #[error("block is flagged auxpow but carries no auxpow payload")]
    MissingAuxPow,
}

/// Errors from encoding a block whose version flag and payload disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// An AuxPoW payload is attached but the version does not flag it.
    #[error("auxpow payload present but version flag is clear")]
    PayloadWithoutFlag,
    /// The version flags an AuxPoW payload that is missing, and transactions
    /// would be read in its place.
    #[error("version flags auxpow but no payload precedes the transactions")]
    FlagWithoutPayload,
}

/// A block: header plus the optional payloads that follow it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    pub header: BlockHeader,
    pub aux_pow: Option<AuxPow>,
    pub transactions: Option<Vec<Transaction>>,
}

impl Block {
    /// A block without payloads.
    pub fn from_header(header: BlockHeader) -> Self {
        Block {
            header,
            aux_pow: None,
            transactions: None,
        }
    }

    /// Attach an AuxPoW payload, setting the version flag to match.
    pub fn with_aux_pow(mut self, aux_pow: AuxPow) -> Self {
        self.header.version |= VERSION_AUXPOW;
        self.aux_pow = Some(aux_pow);
        self
    }

    /// Attach a transaction list.
    pub fn with_transactions(mut self, transactions: Vec<Transaction>) -> Self {
        self.transactions = Some(transactions);
        self
    }

    pub fn chain_id(&self) -> u32 {
        self.header.chain_id()
    }

    pub fn has_aux_pow(&self) -> bool {
        self.header.has_aux_pow()
    }

    pub fn is_legacy(&self) -> bool {
        self.header.is_legacy()
    }

    /// Decode a block from `bytes` in the given mode.
    pub fn decode(bytes: &[u8], mode: SerializationMode) -> Result<Self, DecodeError> {
        Self::decode_from(&mut Reader::new(bytes), mode)
    }

    /// Decode a block from a reader in the given mode.
    ///
    /// Optional parts are only read while bytes remain, so a headers-only
    /// buffer decodes in every mode.
    pub fn decode_from(
        reader: &mut Reader<'_>,
        mode: SerializationMode,
    ) -> Result<Self, DecodeError> {
        let header = BlockHeader::decode_from(reader)?;

        let aux_pow = if mode.includes_aux_pow() && header.has_aux_pow() && !reader.is_eof() {
            Some(AuxPow::decode_from(reader)?)
        } else {
            None
        };

        let transactions = if mode.includes_transactions() && !reader.is_eof() {
            Some(reader.read_list(|r| r.read_object::<Transaction>())?)
        } else {
            None
        };

        Ok(Block {
            header,
            aux_pow,
            transactions,
        })
    }

    /// Byte size of [`Block::encode`] in the given mode.
    pub fn encoded_len(&self, mode: SerializationMode) -> usize {
        let mut size = BLOCK_HEADER_SIZE;
        if let Some(aux_pow) = self.aux_pow.as_ref().filter(|_| mode.includes_aux_pow()) {
            size += aux_pow.encoded_len();
        }
        if let Some(txs) = self.transactions.as_ref().filter(|_| mode.includes_transactions()) {
            size += var_int_len(txs.len() as u64);
            size += txs.iter().map(|tx| tx.encoded_len()).sum::<usize>();
        }
        size
    }

    /// Whether `mode` would write bytes that decode back to this block.
    ///
    /// A flagged block without a payload is fine on its own, since decoding
    /// stops at the end of the buffer, but not when transactions follow.
    pub fn check_layout(&self, mode: SerializationMode) -> Result<(), EncodeError> {
        if !mode.includes_aux_pow() {
            return Ok(());
        }
        match (self.has_aux_pow(), self.aux_pow.is_some()) {
            (false, true) => Err(EncodeError::PayloadWithoutFlag),
            (true, false) if mode.includes_transactions() && self.transactions.is_some() => {
                Err(EncodeError::FlagWithoutPayload)
            }
            _ => Ok(()),
        }
    }

    /// Encode the block in the given mode.
    ///
    /// Fails when the AuxPoW flag and payload disagree in a way that decoding
    /// in the same mode could not undo.
    pub fn encode(&self, mode: SerializationMode) -> Result<Vec<u8>, EncodeError> {
        self.check_layout(mode)?;

        let len = self.encoded_len(mode);
        let mut writer = Writer::with_capacity(len);

        writer.write_object(&self.header);
        if mode.includes_aux_pow() {
            if let Some(aux_pow) = &self.aux_pow {
                writer.write_object(aux_pow);
            }
        }
        if mode.includes_transactions() {
            if let Some(txs) = &self.transactions {
                writer.write_list(txs, |w, tx| w.write_object(tx));
            }
        }

        debug_assert_eq!(writer.len(), len, "encoded length mismatch");
        Ok(writer.into_inner())
    }

    /// Canonical block hash used for chain linkage.
    pub fn block_hash(&self) -> [u8; 32] {
        self.header.hash()
    }

    /// Raw proof-of-work hash of this block's own header.
    pub fn pow_hash(&self) -> [u8; 32] {
        self.header.pow_hash()
    }

    /// The big-endian hash that must meet the target.
    ///
    /// For an AuxPoW block this validates the payload and returns the parent
    /// header's proof-of-work hash.
    pub fn mining_hash(&self) -> Result<[u8; 32], PowError> {
        self.mining_hash_with(&DogeHasher::default())
    }

    pub fn mining_hash_with<H: ChainHasher + ?Sized>(
        &self,
        hasher: &H,
    ) -> Result<[u8; 32], PowError> {
        if !self.has_aux_pow() {
            return Ok(reverse_bytes(&self.header.pow_hash_with(hasher)));
        }

        let aux_pow = self.aux_pow.as_ref().ok_or(PowError::MissingAuxPow)?;
        let aux_block_hash = reverse_bytes(&self.header.hash_with(hasher));
        aux_pow.check_with(&aux_block_hash, self.chain_id(), hasher)?;

        Ok(reverse_bytes(&aux_pow.parent_block.pow_hash_with(hasher)))
    }

    /// Whether the mining hash is at or below the target encoded in `bits`.
    pub fn check_proof_of_work(&self) -> Result<bool, PowError> {
        self.check_proof_of_work_with(&DogeHasher::default())
    }

    pub fn check_proof_of_work_with<H: ChainHasher + ?Sized>(
        &self,
        hasher: &H,
    ) -> Result<bool, PowError> {
        let hash = self.mining_hash_with(hasher).map_err(|err| {
            tracing::debug!(
                "rejecting block {}: {}",
                hash_to_display_hex(&self.header.hash_with(hasher)),
                err
            );
            err
        })?;
        let target = self.header.target();

        let valid = hash_meets_target(&hash, &target);
        if !valid {
            tracing::debug!(
                "proof of work above target: hash {}, target {}",
                hex::encode(hash),
                hex::encode(target)
            );
        }
        Ok(valid)
    }
}
