//! Deterministic fixtures for subsystem tests and the unified test suite.
//!
//! Gated behind the `test-utils` feature so production builds never link
//! fixture generators.

use crate::block::Block;
use crate::keys::KeyPair;
use crate::transaction::Transaction;
use crate::vdf::{vdf, VdfValue};

/// `n` signed self-transfers from one fresh account, tokens `0..n`.
#[must_use]
pub fn sample_transactions(n: i64, valid_chain_value: VdfValue) -> Vec<Transaction> {
    let from = KeyPair::generate();
    (0..n)
        .map(|token| Transaction::new(&from, from.public(), token, 0, valid_chain_value))
        .collect()
}

/// A chain of `n` blocks, `transactions_per_block` transactions each,
/// starting from the delay value of `seed`.
#[must_use]
pub fn sample_blocks(n: u64, transactions_per_block: i64, seed: &[u8]) -> Vec<Block> {
    let mut previous = vdf(seed);
    let mut blocks = Vec::with_capacity(n as usize);
    for number in 0..n {
        let block = Block::next(
            &previous,
            number,
            1,
            sample_transactions(transactions_per_block, previous),
        );
        previous = block.chain_value;
        blocks.push(block);
    }
    blocks
}

/// Order-insensitive transaction multiset equality.
#[must_use]
pub fn transaction_set_equal(left: &[Transaction], right: &[Transaction]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut remaining: Vec<&Transaction> = right.iter().collect();
    for transaction in left {
        match remaining.iter().position(|candidate| *candidate == transaction) {
            Some(at) => {
                remaining.swap_remove(at);
            }
            None => return false,
        }
    }
    true
}
