//! Wallet transaction records.
//!
//! Legacy layout:
//!
//! ```text
//! i32 version | vin[] | vout[] | u32 lock_time
//! ```
//!
//! Segwit layout (an empty input list followed by a non-zero flag byte):
//!
//! ```text
//! i32 version | 0x00 | flag | vin[] | vout[] | witness[vin.len()] | u32 lock_time
//! ```
//!
//! Wallet `tx` values carry merkle-branch and bookkeeping fields after the
//! transaction; those are left unread.

use crate::error::{Result, WalletError};
use vaultscan_core::{ByteCursor, ByteWriter, StreamError};

/// Smallest possible serialized input: 32 hash + 4 index + 1 script len + 4 sequence
const MIN_TXIN_LEN: usize = 41;
/// Smallest possible serialized output: 8 value + 1 script len
const MIN_TXOUT_LEN: usize = 9;

/// Read a compact-size element count, rejecting counts the remaining bytes
/// could not possibly hold.
pub(crate) fn read_count(
    cursor: &mut ByteCursor,
    min_item_len: usize,
) -> std::result::Result<usize, StreamError> {
    let offset = cursor.position();
    let count = cursor.read_length()?;
    let wanted = count.saturating_mul(min_item_len.max(1));
    if wanted > cursor.remaining() {
        return Err(StreamError::Truncated {
            offset,
            wanted,
            available: cursor.remaining(),
        });
    }
    Ok(count)
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    /// Previous transaction hash, as stored
    pub prev_hash: [u8; 32],
    /// Previous output index
    pub prev_index: u32,
    /// Unlocking script
    pub script_sig: Vec<u8>,
    /// Sequence number
    pub sequence: u32,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Amount in base units
    pub value: i64,
    /// Locking script
    pub script_pubkey: Vec<u8>,
}

/// A decoded wallet transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction id in storage (little-endian) order
    pub txid: [u8; 32],
    /// Transaction version
    pub version: i32,
    /// Inputs
    pub inputs: Vec<TxIn>,
    /// Outputs
    pub outputs: Vec<TxOut>,
    /// Witness stacks, one per input; empty for legacy transactions
    pub witnesses: Vec<Vec<Vec<u8>>>,
    /// Lock time
    pub lock_time: u32,
}

impl Transaction {
    /// Transaction id as displayed by block explorers (byte-reversed hex).
    pub fn txid_hex(&self) -> String {
        let mut display = self.txid;
        display.reverse();
        hex::encode(display)
    }

    /// True if the transaction was serialized with witness data.
    pub fn is_segwit(&self) -> bool {
        !self.witnesses.is_empty()
    }

    /// Sum of output values, `None` if it does not fit in an `i64`.
    pub fn total_output_value(&self) -> Option<i64> {
        self.outputs
            .iter()
            .try_fold(0i64, |total, o| total.checked_add(o.value))
    }

    /// Decode the transaction body from a `tx` record value.
    pub fn decode(txid: [u8; 32], cursor: &mut ByteCursor) -> Result<Self> {
        let version = cursor.read_i32()?;

        let mut input_count = read_count(cursor, MIN_TXIN_LEN)?;
        let mut segwit = false;
        if input_count == 0 {
            if cursor.read_u8()? == 0 {
                return Err(WalletError::InvalidRecord(
                    "transaction has no inputs and no witness flag".to_string(),
                ));
            }
            segwit = true;
            input_count = read_count(cursor, MIN_TXIN_LEN)?;
        }

        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxIn {
                prev_hash: cursor.read_hash256()?,
                prev_index: cursor.read_u32()?,
                script_sig: cursor.read_string()?,
                sequence: cursor.read_u32()?,
            });
        }

        let output_count = read_count(cursor, MIN_TXOUT_LEN)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOut {
                value: cursor.read_i64()?,
                script_pubkey: cursor.read_string()?,
            });
        }

        let mut witnesses = Vec::new();
        if segwit {
            for _ in 0..input_count {
                let items = read_count(cursor, 1)?;
                let mut stack = Vec::with_capacity(items);
                for _ in 0..items {
                    stack.push(cursor.read_string()?);
                }
                witnesses.push(stack);
            }
        }

        let lock_time = cursor.read_u32()?;
        Ok(Transaction {
            txid,
            version,
            inputs,
            outputs,
            witnesses,
            lock_time,
        })
    }

    /// Serialize the transaction body (the inverse of [`Transaction::decode`]).
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.write_i32(self.version);
        let segwit = self.is_segwit();
        if segwit {
            writer.write_u8(0x00).write_u8(0x01);
        }
        writer.write_compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            writer
                .write_bytes(&input.prev_hash)
                .write_u32(input.prev_index)
                .write_string(&input.script_sig)
                .write_u32(input.sequence);
        }
        writer.write_compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            writer
                .write_i64(output.value)
                .write_string(&output.script_pubkey);
        }
        if segwit {
            for stack in &self.witnesses {
                writer.write_compact_size(stack.len() as u64);
                for item in stack {
                    writer.write_string(item);
                }
            }
        }
        writer.write_u32(self.lock_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(segwit: bool) -> Transaction {
        Transaction {
            txid: [0x11; 32],
            version: 2,
            inputs: vec![TxIn {
                prev_hash: [0xaa; 32],
                prev_index: 1,
                script_sig: if segwit { vec![] } else { vec![0x51, 0x52] },
                sequence: 0xffff_fffe,
            }],
            outputs: vec![
                TxOut {
                    value: 50_000,
                    script_pubkey: vec![0x76, 0xa9],
                },
                TxOut {
                    value: 1_234,
                    script_pubkey: vec![0x00, 0x14],
                },
            ],
            witnesses: if segwit {
                vec![vec![vec![0x30; 71], vec![0x02; 33]]]
            } else {
                vec![]
            },
            lock_time: 700_000,
        }
    }

    fn roundtrip(tx: &Transaction) -> Transaction {
        let mut writer = ByteWriter::new();
        tx.encode(&mut writer);
        let mut cursor = ByteCursor::new(writer.into_inner());
        let decoded = Transaction::decode(tx.txid, &mut cursor).unwrap();
        assert!(cursor.is_exhausted());
        decoded
    }

    #[test]
    fn test_legacy_transaction() {
        let tx = sample(false);
        let decoded = roundtrip(&tx);
        assert_eq!(decoded, tx);
        assert!(!decoded.is_segwit());
        assert_eq!(decoded.total_output_value(), Some(51_234));
    }

    #[test]
    fn test_segwit_transaction() {
        let tx = sample(true);
        let decoded = roundtrip(&tx);
        assert_eq!(decoded, tx);
        assert!(decoded.is_segwit());
        assert_eq!(decoded.witnesses[0].len(), 2);
    }

    #[test]
    fn test_garbage_output_values_do_not_overflow() {
        let mut tx = sample(false);
        tx.outputs[0].value = i64::MAX;
        assert_eq!(tx.total_output_value(), None);

        tx.outputs[0].value = i64::MIN;
        tx.outputs[1].value = -1;
        assert_eq!(tx.total_output_value(), None);

        tx.outputs.clear();
        assert_eq!(tx.total_output_value(), Some(0));
    }

    #[test]
    fn test_txid_display_is_reversed() {
        let mut tx = sample(false);
        tx.txid = [0u8; 32];
        tx.txid[0] = 0xab;
        let shown = tx.txid_hex();
        assert!(shown.ends_with("ab"));
        assert!(shown.starts_with("00"));
    }

    #[test]
    fn test_truncated_transaction_fails() {
        let mut writer = ByteWriter::new();
        sample(false).encode(&mut writer);
        let bytes = writer.into_inner();
        let mut cursor = ByteCursor::from_slice(&bytes[..bytes.len() - 2]);
        assert!(Transaction::decode([0; 32], &mut cursor).is_err());
    }

    #[test]
    fn test_absurd_input_count_rejected() {
        let mut writer = ByteWriter::new();
        writer.write_i32(1).write_compact_size(u32::MAX as u64);
        let mut cursor = ByteCursor::new(writer.into_inner());
        let err = Transaction::decode([0; 32], &mut cursor).unwrap_err();
        assert!(matches!(err, WalletError::Stream(ref e) if e.is_truncated()));
    }

    #[test]
    fn test_zero_flag_rejected() {
        let mut writer = ByteWriter::new();
        writer.write_i32(1).write_u8(0).write_u8(0);
        let mut cursor = ByteCursor::new(writer.into_inner());
        assert!(matches!(
            Transaction::decode([0; 32], &mut cursor),
            Err(WalletError::InvalidRecord(_))
        ));
    }
}
