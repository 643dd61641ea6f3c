//! Gossip convergence over real localhost UDP sockets.
//!
//! A producer and a handful of signers each start knowing only the
//! producer; a spy node watches until its own table has pulled everyone.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sc_02_membership_sync::{run_gossip, GossipConfig, Node, SyncTable, UNSET_ADDR};

    use crate::init_tracing;

    /// Short pull period so tests converge in seconds, not minutes.
    fn fast_config() -> GossipConfig {
        GossipConfig::default().with_period(Duration::from_millis(100))
    }

    /// Bind a node, point it at the producer, seed its table, and start its
    /// gossip pump.
    async fn start_member(node_type: &str, name: &str, producer: &Node) -> Arc<SyncTable> {
        let node = Node::bind(node_type, name).await.unwrap();
        let mut data = node.data.clone();
        data.producer = producer.data.identity;
        let table = Arc::new(SyncTable::new(data).unwrap());
        table.insert(producer.data.clone());
        tokio::spawn(run_gossip(
            table.clone(),
            node.sockets.gossip.clone(),
            node.sockets.gossip_send.clone(),
            fast_config(),
        ));
        table
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cluster_converges_through_one_seed() {
        init_tracing();

        let producer = Node::bind("producer", "p0").await.unwrap();
        let mut producer_data = producer.data.clone();
        producer_data.producer = producer_data.identity;
        let producer_table = Arc::new(SyncTable::new(producer_data).unwrap());
        tokio::spawn(run_gossip(
            producer_table.clone(),
            producer.sockets.gossip.clone(),
            producer.sockets.gossip_send.clone(),
            fast_config(),
        ));

        let mut signer_tables = Vec::new();
        for i in 0..2 {
            signer_tables.push(start_member("signer", &format!("s{i}"), &producer).await);
        }

        // the spy only watches: no replication endpoint to receive blocks on
        let spy = Node::bind("spy", "watcher").await.unwrap();
        let mut spy_data = spy.data.clone();
        spy_data.producer = producer.data.identity;
        spy_data.addresses.replication = UNSET_ADDR;
        let spy_table = Arc::new(SyncTable::new(spy_data).unwrap());
        spy_table.insert(producer.data.clone());
        tokio::spawn(run_gossip(
            spy_table.clone(),
            spy.sockets.gossip.clone(),
            spy.sockets.gossip_send.clone(),
            fast_config(),
        ));

        // producer + 2 signers must end up reporting clocks to the spy
        let mut converged = false;
        for _ in 0..100 {
            if spy_table.connected_nodes() == 3 {
                converged = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(
            converged,
            "spy saw only {} synced peers",
            spy_table.connected_nodes()
        );

        // every identity and its advertised endpoints made it across
        let spy_view = spy_table.table_copy();
        assert_eq!(spy_view.len(), 4);
        assert_eq!(
            spy_view[&producer.data.identity].addresses,
            producer.data.addresses
        );
        for signer in &signer_tables {
            let record = signer.my_copy();
            assert_eq!(spy_view[&record.identity].addresses, record.addresses);
        }

        // and the signers learn everyone, spy included, through the producer
        for signer in &signer_tables {
            let mut known = 0;
            for _ in 0..100 {
                known = signer.table_copy().len();
                if known == 4 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            assert_eq!(known, 4, "signer table incomplete");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_version_bump_propagates() {
        init_tracing();

        let producer = Node::bind("producer", "p0").await.unwrap();
        let mut producer_data = producer.data.clone();
        producer_data.producer = producer_data.identity;
        let producer_table = Arc::new(SyncTable::new(producer_data).unwrap());
        tokio::spawn(run_gossip(
            producer_table.clone(),
            producer.sockets.gossip.clone(),
            producer.sockets.gossip_send.clone(),
            fast_config(),
        ));

        let signer_table = start_member("signer", "s0", &producer).await;

        // wait until the producer knows the signer
        for _ in 0..100 {
            if producer_table.table_copy().len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(producer_table.table_copy().len(), 2);

        // the producer re-elects itself; the bumped record must reach the
        // signer and replace the old version
        producer_table.change_producer(producer.data.identity);
        let bumped = producer_table.my_copy().version;

        let mut seen = 0;
        for _ in 0..100 {
            seen = signer_table.table_copy()[&producer.data.identity].version;
            if seen == bumped {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(seen, bumped);
    }
}
