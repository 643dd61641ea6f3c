//! Collaborator interfaces at the relay boundary.
//!
//! The relay neither produces blocks nor applies them; it moves them. These
//! ports are what the surrounding node wires in: block production behind
//! [`BlockSource`], the ledger state machine behind [`LedgerSink`], and
//! optional storage behind [`PersistenceSink`].

use async_trait::async_trait;
use shared_types::{Block, VdfValue};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by the sink ports. Logged by the pipelines, never fatal
/// to them.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("block batch rejected: {0}")]
    Rejected(String),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Source of freshly produced blocks on the producer node.
#[async_trait]
pub trait BlockSource: Send {
    /// The next batch of blocks, or `None` when production stops.
    async fn next_batch(&mut self) -> Option<Vec<Block>>;

    /// The chain value production currently considers valid.
    fn last_chain_value(&self) -> VdfValue;
}

/// Consumer of decoded block batches on a signer node.
pub trait LedgerSink: Send + Sync {
    fn process_blocks(&self, blocks: Vec<Block>) -> Result<(), SinkError>;
}

/// Optional best-effort per-block persistence.
pub trait PersistenceSink: Send + Sync {
    fn save_block(&self, block: &Block) -> Result<(), SinkError>;
}

/// [`BlockSource`] over a channel from the block generation pipeline.
pub struct ChannelBlockSource {
    blocks: mpsc::Receiver<Vec<Block>>,
    last_chain_value: VdfValue,
}

impl ChannelBlockSource {
    /// Wrap a block channel, reporting `genesis` until the first batch.
    #[must_use]
    pub fn new(blocks: mpsc::Receiver<Vec<Block>>, genesis: VdfValue) -> Self {
        Self {
            blocks,
            last_chain_value: genesis,
        }
    }
}

#[async_trait]
impl BlockSource for ChannelBlockSource {
    async fn next_batch(&mut self) -> Option<Vec<Block>> {
        let batch = self.blocks.recv().await?;
        if let Some(block) = batch.last() {
            self.last_chain_value = block.chain_value;
        }
        Some(batch)
    }

    fn last_chain_value(&self) -> VdfValue {
        self.last_chain_value
    }
}
