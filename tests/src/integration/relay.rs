//! Producer-to-signer block delivery through the erasure-coded relay,
//! over real localhost UDP sockets.
//!
//! Membership tables are pre-seeded instead of gossiped so the relay path
//! is tested in isolation; gossip convergence has its own tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use sc_02_membership_sync::{Node, SyncTable};
    use sc_03_block_relay::{
        run_block_producer, run_block_signer, ChannelBlockSource, LedgerSink, PersistenceSink,
        RelayConfig, SinkError,
    };
    use shared_types::testing::transaction_set_equal;
    use shared_types::{vdf, Block, KeyPair, Transaction};
    use tokio::sync::mpsc;

    use crate::init_tracing;

    /// A ledger that just keeps what it is given.
    #[derive(Default)]
    struct CollectingLedger {
        blocks: Mutex<Vec<Block>>,
    }

    impl CollectingLedger {
        fn len(&self) -> usize {
            self.blocks.lock().len()
        }
        fn cloned(&self) -> Vec<Block> {
            self.blocks.lock().clone()
        }
    }

    impl LedgerSink for CollectingLedger {
        fn process_blocks(&self, blocks: Vec<Block>) -> Result<(), SinkError> {
            self.blocks.lock().extend(blocks);
            Ok(())
        }
    }

    /// Best-effort persistence that counts saves.
    #[derive(Default)]
    struct CountingStore {
        saved: Mutex<usize>,
    }

    impl PersistenceSink for CountingStore {
        fn save_block(&self, _block: &Block) -> Result<(), SinkError> {
            *self.saved.lock() += 1;
            Ok(())
        }
    }

    /// Blocks sized so exactly one fits per blob: 16 of them pack to one
    /// full coding group and come out as one delivered batch.
    fn blob_sized_blocks(count: u64, start_number: u64, seed: &[u8]) -> Vec<Block> {
        let signer = KeyPair::generate();
        let mut previous = vdf(seed);
        let mut blocks = Vec::new();
        for number in start_number..start_number + count {
            let transactions: Vec<Transaction> = (0..200)
                .map(|i| Transaction::new(&signer, signer.public(), i, 0, previous))
                .collect();
            let block = Block::next(&previous, number - 1, 1, transactions);
            previous = block.chain_value;
            blocks.push(block);
        }
        blocks
    }

    async fn wait_for(ledger: &CollectingLedger, count: usize) {
        for _ in 0..300 {
            if ledger.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("ledger stuck at {} of {} blocks", ledger.len(), count);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_producer_delivers_blocks_to_both_signers() {
        init_tracing();

        let producer = Node::bind("producer", "p0").await.unwrap();
        let signer_a = Node::bind("signer", "a").await.unwrap();
        let signer_b = Node::bind("signer", "b").await.unwrap();

        // everyone already knows everyone and follows the producer
        let mut tables = Vec::new();
        for node in [&producer, &signer_a, &signer_b] {
            let mut data = node.data.clone();
            data.producer = producer.data.identity;
            let table = Arc::new(SyncTable::new(data).unwrap());
            for other in [&producer, &signer_a, &signer_b] {
                if other.data.identity != node.data.identity {
                    let mut record = other.data.clone();
                    record.producer = producer.data.identity;
                    record.version = 1;
                    table.insert(record);
                }
            }
            tables.push(table);
        }
        let (producer_table, table_a, table_b) = (
            tables[0].clone(),
            tables[1].clone(),
            tables[2].clone(),
        );

        let ledger_a = Arc::new(CollectingLedger::default());
        let ledger_b = Arc::new(CollectingLedger::default());
        let store_a = Arc::new(CountingStore::default());

        tokio::spawn(run_block_signer(
            table_a,
            ledger_a.clone(),
            Some(store_a.clone()),
            signer_a.sockets.replication.clone(),
            signer_a.sockets.repair.clone(),
            signer_a.sockets.relay_send.clone(),
            RelayConfig::default(),
        ));
        tokio::spawn(run_block_signer(
            table_b,
            ledger_b.clone(),
            None,
            signer_b.sockets.replication.clone(),
            signer_b.sockets.repair.clone(),
            signer_b.sockets.relay_send.clone(),
            RelayConfig::default(),
        ));

        let (blocks_tx, blocks_rx) = mpsc::channel(4);
        let source = ChannelBlockSource::new(blocks_rx, vdf(b"genesis"));
        tokio::spawn(run_block_producer(
            source,
            producer_table,
            producer.sockets.relay_send.clone(),
            Some(producer.sockets.repair.clone()),
            RelayConfig::default(),
        ));

        let chain = blob_sized_blocks(32, 1, b"genesis");
        // small sends keep datagram bursts under socket buffer sizes
        for batch in chain[..16].chunks(4) {
            blocks_tx.send(batch.to_vec()).await.unwrap();
        }
        wait_for(&ledger_a, 16).await;
        wait_for(&ledger_b, 16).await;

        for batch in chain[16..].chunks(4) {
            blocks_tx.send(batch.to_vec()).await.unwrap();
        }
        wait_for(&ledger_a, 32).await;
        wait_for(&ledger_b, 32).await;

        for ledger in [&ledger_a, &ledger_b] {
            let got = ledger.cloned();
            assert_eq!(got.len(), 32);
            for (sent, received) in chain.iter().zip(&got) {
                assert_eq!(sent.number, received.number);
                assert_eq!(sent.chain_value, received.chain_value);
                assert!(transaction_set_equal(
                    &sent.transactions,
                    &received.transactions
                ));
            }
        }
        // the persistence tee saw traffic too
        assert!(*store_a.saved.lock() > 0);
    }
}
