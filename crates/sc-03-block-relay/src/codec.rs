//! Packing blocks into blob payloads and back.
//!
//! A blob payload holds consecutive packed sections, one per block: 8-byte
//! height, 8-byte iteration count, 32-byte chain value, 4-byte transaction
//! count, then the fixed-size transactions. A block is never split across
//! blobs; a blob that fills up starts the next one.

use std::collections::HashMap;

use shared_types::{Block, Transaction, VdfValue, TRANSACTION_SIZE, VDF_SIZE};
use thiserror::Error;
use tracing::warn;

use sc_01_erasure_wire::{Blob, BLOB_PAYLOAD_SIZE};

/// Fixed bytes per packed section before its transactions.
const SECTION_HEADER_SIZE: usize = 8 + 8 + VDF_SIZE + 4;

/// Errors from block packing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("block of {size} bytes exceeds blob payload capacity of {capacity}")]
    BlockTooLarge { size: usize, capacity: usize },
}

/// Pack consecutive blocks into as many blobs as needed.
pub fn blocks_to_blobs(blocks: &[Block]) -> Result<Vec<Blob>, CodecError> {
    let mut blobs = Vec::new();
    let mut start = 0;
    while start < blocks.len() {
        let end = blocks_in_one_blob(blocks, start)?;
        blobs.push(pack_section(&blocks[start..=end]));
        start = end + 1;
    }
    Ok(blobs)
}

/// Greedy fit: the index of the last block that still fits in a blob
/// starting at `start`.
fn blocks_in_one_blob(blocks: &[Block], start: usize) -> Result<usize, CodecError> {
    let mut bytes = 0;
    for end in start..blocks.len() {
        bytes += blocks[end].size();
        if bytes >= BLOB_PAYLOAD_SIZE {
            if end == start {
                return Err(CodecError::BlockTooLarge {
                    size: blocks[end].size(),
                    capacity: BLOB_PAYLOAD_SIZE,
                });
            }
            return Ok(end - 1);
        }
    }
    Ok(blocks.len() - 1)
}

fn pack_section(blocks: &[Block]) -> Blob {
    let mut payload = Vec::new();
    for block in blocks {
        payload.extend_from_slice(&block.number.to_be_bytes());
        payload.extend_from_slice(&block.count.to_be_bytes());
        payload.extend_from_slice(&block.chain_value);
        payload.extend_from_slice(&(block.transactions.len() as u32).to_be_bytes());
        for transaction in &block.transactions {
            payload.extend_from_slice(&transaction.to_bytes());
        }
    }
    let mut blob = Blob::new();
    blob.write_payload(&payload);
    blob
}

/// Unpack blobs back into blocks, in first-seen order.
///
/// Sections with the same chain value are merged into one block, because
/// the coding fan-out may deliver a block's pieces across blobs in any
/// alignment. Parity blobs are skipped, an all-zero section header is
/// erasure-recovery padding and ends its blob, and a truncated trailing
/// section is dropped with a warning.
#[must_use]
pub fn blobs_to_blocks(blobs: &[Blob]) -> Vec<Block> {
    let mut order: Vec<VdfValue> = Vec::new();
    let mut by_value: HashMap<VdfValue, Block> = HashMap::new();

    for blob in blobs {
        if blob.is_coding() {
            continue;
        }
        let payload = blob.payload();
        let mut at = 0;
        while at + SECTION_HEADER_SIZE <= payload.len() {
            let number = u64::from_be_bytes(payload[at..at + 8].try_into().unwrap_or_default());
            let count =
                u64::from_be_bytes(payload[at + 8..at + 16].try_into().unwrap_or_default());
            let mut chain_value: VdfValue = [0u8; VDF_SIZE];
            chain_value.copy_from_slice(&payload[at + 16..at + 16 + VDF_SIZE]);
            let transaction_count = u32::from_be_bytes(
                payload[at + 16 + VDF_SIZE..at + SECTION_HEADER_SIZE]
                    .try_into()
                    .unwrap_or_default(),
            ) as usize;
            at += SECTION_HEADER_SIZE;

            if number == 0 && count == 0 && transaction_count == 0 && chain_value == [0u8; 32] {
                break;
            }
            let transactions_end = at + transaction_count * TRANSACTION_SIZE;
            if transactions_end > payload.len() {
                warn!(
                    index = blob.index(),
                    "truncated block section dropped"
                );
                break;
            }
            let mut transactions = Vec::with_capacity(transaction_count);
            let mut intact = true;
            while at < transactions_end {
                match Transaction::from_bytes(&payload[at..at + TRANSACTION_SIZE]) {
                    Ok(transaction) => transactions.push(transaction),
                    Err(err) => {
                        warn!(%err, index = blob.index(), "unreadable transaction dropped");
                        intact = false;
                        break;
                    }
                }
                at += TRANSACTION_SIZE;
            }
            if !intact {
                break;
            }

            if let Some(existing) = by_value.get_mut(&chain_value) {
                existing.transactions.append(&mut transactions);
            } else {
                order.push(chain_value);
                by_value.insert(
                    chain_value,
                    Block {
                        number,
                        count,
                        chain_value,
                        transactions,
                    },
                );
            }
        }
    }

    order
        .into_iter()
        .filter_map(|value| by_value.remove(&value))
        .collect()
}
