//! Transaction wire layout.
//!
//! Consensus checks in this crate only look at a transaction's byte length,
//! its hash and the script of its first input. The rest of the layout is
//! decoded so that those three can be found and the record re-encoded.

use alloc::vec::Vec;
use crate::cursor::{var_int_len, Decode, DecodeError, Encode, Reader, Writer};
use crate::hash::ChainHasher;

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxInput {
    /// Previous output txid (all zeros for a coinbase).
    pub prev_hash: [u8; 32],
    /// Previous output index (0xFFFFFFFF for a coinbase).
    pub prev_index: u32,
    /// scriptSig. For a coinbase this carries the merged-mining commitment.
    pub script: Vec<u8>,
    pub sequence: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A transaction in its legacy (non-witness) serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Script of the first input, if there is one.
    pub fn coinbase_script(&self) -> Option<&[u8]> {
        self.inputs.first().map(|input| input.script.as_slice())
    }

    /// Transaction ID in internal byte order.
    pub fn hash_with<H: ChainHasher + ?Sized>(&self, hasher: &H) -> [u8; 32] {
        hasher.double_hash(&self.encode())
    }
}

impl TxInput {
    fn encoded_len(&self) -> usize {
        32 + 4 + var_int_len(self.script.len() as u64) + self.script.len() + 4
    }
}

impl TxOutput {
    fn encoded_len(&self) -> usize {
        8 + var_int_len(self.script_pubkey.len() as u64) + self.script_pubkey.len()
    }
}

impl Decode for Transaction {
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = reader.read_i32()?;
        let inputs = reader.read_list(|r| {
            Ok(TxInput {
                prev_hash: r.read_array()?,
                prev_index: r.read_u32()?,
                script: r.read_var_bytes()?.to_vec(),
                sequence: r.read_u32()?,
            })
        })?;
        let outputs = reader.read_list(|r| {
            Ok(TxOutput {
                value: r.read_u64()?,
                script_pubkey: r.read_var_bytes()?.to_vec(),
            })
        })?;
        let lock_time = reader.read_u32()?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }
}

impl Encode for Transaction {
    fn encoded_len(&self) -> usize {
        4 + var_int_len(self.inputs.len() as u64)
            + self.inputs.iter().map(|input| input.encoded_len()).sum::<usize>()
            + var_int_len(self.outputs.len() as u64)
            + self.outputs.iter().map(|output| output.encoded_len()).sum::<usize>()
            + 4
    }

    fn encode_to(&self, writer: &mut Writer) {
        // Version (4 bytes, little-endian)
        writer.write_i32(self.version);

        writer.write_list(&self.inputs, |w, input| {
            w.write_slice(&input.prev_hash);
            w.write_u32(input.prev_index);
            w.write_var_bytes(&input.script);
            w.write_u32(input.sequence);
        });

        writer.write_list(&self.outputs, |w, output| {
            w.write_u64(output.value);
            w.write_var_bytes(&output.script_pubkey);
        });

        // Locktime (4 bytes)
        writer.write_u32(self.lock_time);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cursor::Reader;
    use crate::hash::{double_sha256, DogeHasher};
    use alloc::vec;

    /// A coinbase transaction carrying `script` as its scriptSig.
    pub(crate) fn coinbase_with_script(script: Vec<u8>) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_hash: [0u8; 32],
                prev_index: 0xFFFFFFFF,
                script,
                sequence: 0xFFFFFFFF,
            }],
            outputs: vec![TxOutput {
                value: 10_000 * 100_000_000,
                script_pubkey: vec![0x76, 0xa9, 0x14, 0x00, 0x88, 0xac],
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn test_coinbase_layout() {
        let tx = coinbase_with_script(vec![0x03, 0x01, 0x02, 0x03]);
        let raw = tx.encode();

        assert_eq!(raw.len(), tx.encoded_len());
        // Version
        assert_eq!(&raw[0..4], &[0x01, 0x00, 0x00, 0x00]);
        // Input count
        assert_eq!(raw[4], 0x01);
        // Null prevout
        assert_eq!(&raw[5..37], &[0u8; 32]);
        assert_eq!(&raw[37..41], &[0xff; 4]);
        // scriptSig length and body
        assert_eq!(raw[41], 4);
        assert_eq!(&raw[42..46], &[0x03, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_decode_matches_encode() {
        let tx = coinbase_with_script(vec![0xaa; 300]);
        let raw = tx.encode();
        let decoded = Transaction::decode(&raw).unwrap();

        assert_eq!(decoded, tx);
        assert_eq!(decoded.coinbase_script(), Some(&[0xaa; 300][..]));
    }

    #[test]
    fn test_read_object_advances_by_encoded_len() {
        let tx = coinbase_with_script(vec![0x51]);
        let mut raw = tx.encode();
        raw.extend_from_slice(&[0xde, 0xad]);

        let mut reader = Reader::new(&raw);
        let decoded: Transaction = reader.read_object().unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(reader.rest(), &[0xde, 0xad]);
    }

    #[test]
    fn test_truncated_transaction() {
        let raw = coinbase_with_script(vec![0x51]).encode();
        assert!(matches!(
            Transaction::decode(&raw[..raw.len() - 1]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_hash_is_double_sha256_of_encoding() {
        let tx = coinbase_with_script(vec![0x51]);
        assert_eq!(tx.hash_with(&DogeHasher::default()), double_sha256(&tx.encode()));
    }
}
