//! Blocks: delay-chain-timestamped batches of transactions.

use crate::transaction::{Transaction, TRANSACTION_SIZE};
use crate::vdf::{extended_vdf, vdf, VdfValue, VDF_SIZE};

/// One block of the append-only stream.
///
/// `count` is the number of delay-function iterations separating this block's
/// `chain_value` from its predecessor's. A block with transactions spends one
/// of those iterations folding the transaction signatures into the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Height in the stream, starting at 1 above the seed value.
    pub number: u64,
    /// Delay-function iterations since the previous block.
    pub count: u64,
    /// Chain value after `count` iterations.
    pub chain_value: VdfValue,
    /// Transactions timestamped by this block; may be empty.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Next block in the chain: advances the delay chain `count` iterations
    /// from `previous_value`, folding `transactions` into the final one.
    #[must_use]
    pub fn next(
        previous_value: &VdfValue,
        previous_number: u64,
        count: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let chain_value = next_chain_value(previous_value, count, &transactions);
        Self {
            number: previous_number + 1,
            count,
            chain_value,
            transactions,
        }
    }

    /// An empty block that carries the previous chain value forward.
    #[must_use]
    pub fn empty(previous_value: &VdfValue, previous_number: u64, count: u64) -> Self {
        Self {
            number: previous_number + 1,
            count,
            chain_value: *previous_value,
            transactions: Vec::new(),
        }
    }

    /// Check the block against its predecessor's chain value: every
    /// transaction signature must hold and the delay chain must replay to
    /// `chain_value`.
    #[must_use]
    pub fn verify(&self, previous_value: &VdfValue) -> bool {
        if !self.transactions.iter().all(Transaction::verify_signature) {
            return false;
        }
        next_chain_value(previous_value, self.count, &self.transactions) == self.chain_value
    }

    /// Packed size of this block in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        8 + 8 + VDF_SIZE + 4 + self.transactions.len() * TRANSACTION_SIZE
    }
}

/// Advance the delay chain `count` iterations, folding the transactions into
/// the final iteration when there are any.
fn next_chain_value(previous: &VdfValue, count: u64, transactions: &[Transaction]) -> VdfValue {
    let mut value = *previous;
    for _ in 1..count {
        value = vdf(&value);
    }
    if transactions.is_empty() {
        if count != 0 {
            value = vdf(&value);
        }
    } else {
        value = extended_vdf(&fold_bytes(transactions), &value);
    }
    value
}

/// The byte string folded into the chain for a transaction batch: a zero
/// separator followed by each signature.
fn fold_bytes(transactions: &[Transaction]) -> Vec<u8> {
    let mut data = Vec::with_capacity(65 * transactions.len());
    for transaction in transactions {
        data.push(0);
        data.extend_from_slice(&transaction.signature);
    }
    data
}
