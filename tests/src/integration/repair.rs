//! Missing-blob repair over real localhost UDP sockets.
//!
//! A server node holds one fully encoded coding group in its frame; a
//! client that received too few blobs to decode locally fetches the rest
//! through repair requests and still delivers the group intact.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sc_01_erasure_wire::{
        add_coding_blobs, blob_receiver, encode_frame, Blob, BlobBatch, Frame, NUM_CODED, NUM_DATA,
    };
    use sc_02_membership_sync::{Node, SyncTable};
    use sc_03_block_relay::{reconstruct, run_repair_responder, RelayConfig};
    use shared_types::Pubkey;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::init_tracing;

    /// One encoded coding group, indices 0..20, stamped by `sender`, loaded
    /// into a fresh frame the way the broadcaster would leave it.
    fn encoded_group(sender: Pubkey) -> (Arc<Frame>, BlobBatch) {
        let frame = Arc::new(Frame::new());
        let mut blobs: BlobBatch = (0..NUM_DATA)
            .map(|i| {
                let mut blob = Blob::new();
                blob.write_payload(&vec![i as u8 + 1; 120 + i]);
                blob
            })
            .collect();
        add_coding_blobs(&mut blobs, 0);
        for (offset, blob) in blobs.iter_mut().enumerate() {
            blob.set_from(&sender);
            blob.set_index(offset as u64);
            frame.store(blob.clone());
        }
        encode_frame(&frame, 0, NUM_CODED as u64).unwrap();
        let encoded = (0..NUM_CODED as u64)
            .map(|i| frame.snapshot(i).unwrap())
            .collect();
        (frame, encoded)
    }

    /// A client node wired for repair: replication traffic and repair
    /// replies both feed the decoder, requests go out the relay socket.
    fn start_client(
        client: &Node,
        table: Arc<SyncTable>,
    ) -> (mpsc::Sender<BlobBatch>, mpsc::Receiver<BlobBatch>) {
        let (input_tx, input_rx) = mpsc::channel(8);
        let delivered = reconstruct(
            Arc::new(Frame::new()),
            input_rx,
            table,
            client.sockets.relay_send.clone(),
            8,
        );
        let mut replication = blob_receiver(client.sockets.replication.clone(), 8);
        let pump = input_tx.clone();
        tokio::spawn(async move {
            while let Some(batch) = replication.recv().await {
                if pump.send(batch).await.is_err() {
                    return;
                }
            }
        });
        (input_tx, delivered)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_client_repairs_losses_from_server() {
        init_tracing();

        let server = Node::bind("producer", "server").await.unwrap();
        let client = Node::bind("signer", "client").await.unwrap();

        let server_table = Arc::new(SyncTable::new(server.data.clone()).unwrap());
        let client_table = Arc::new(SyncTable::new(client.data.clone()).unwrap());
        let mut server_record = server.data.clone();
        server_record.version = 1;
        client_table.insert(server_record);

        let (server_frame, originals) = encoded_group(server.data.identity);
        tokio::spawn(run_repair_responder(
            server_table.clone(),
            server_frame,
            server.sockets.repair.clone(),
            server.sockets.relay_send.clone(),
            RelayConfig::default(),
        ));

        let (input_tx, mut delivered) = start_client(&client, client_table);

        // six slots never arrive, two past what coding can absorb
        let survivors: BlobBatch = originals
            .iter()
            .filter(|blob| ![1, 4, 7, 10, 13, 16].contains(&blob.index()))
            .cloned()
            .collect();
        input_tx.send(survivors).await.unwrap();

        let batch = timeout(Duration::from_secs(5), delivered.recv())
            .await
            .expect("timed out waiting for repaired delivery")
            .unwrap();
        assert_eq!(batch.len(), NUM_DATA);
        for (i, blob) in batch.iter().enumerate() {
            assert_eq!(blob.index(), i as u64);
            assert_eq!(
                blob.payload()[..originals[i].payload().len()],
                *originals[i].payload()
            );
        }
        // the server learned the requester from the requests themselves
        assert!(server_table
            .table_copy()
            .contains_key(&client.data.identity));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_recoverable_losses_issue_no_repair() {
        init_tracing();

        let server = Node::bind("producer", "server").await.unwrap();
        let client = Node::bind("signer", "client").await.unwrap();

        let server_table = Arc::new(SyncTable::new(server.data.clone()).unwrap());
        let client_table = Arc::new(SyncTable::new(client.data.clone()).unwrap());
        let mut server_record = server.data.clone();
        server_record.version = 1;
        client_table.insert(server_record);

        let (server_frame, originals) = encoded_group(server.data.identity);
        tokio::spawn(run_repair_responder(
            server_table.clone(),
            server_frame,
            server.sockets.repair.clone(),
            server.sockets.relay_send.clone(),
            RelayConfig::default(),
        ));

        let (input_tx, mut delivered) = start_client(&client, client_table);

        // four losses sit inside the coding margin
        let survivors: BlobBatch = originals
            .iter()
            .filter(|blob| ![3, 9, 15, 18].contains(&blob.index()))
            .cloned()
            .collect();
        input_tx.send(survivors).await.unwrap();

        let batch = timeout(Duration::from_secs(5), delivered.recv())
            .await
            .expect("timed out waiting for decoded delivery")
            .unwrap();
        assert_eq!(batch.len(), NUM_DATA);
        for (i, blob) in batch.iter().enumerate() {
            assert_eq!(blob.index(), i as u64);
            assert_eq!(
                blob.payload()[..originals[i].payload().len()],
                *originals[i].payload()
            );
        }
        // coding absorbed the losses, so the server never heard from us
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!server_table
            .table_copy()
            .contains_key(&client.data.identity));
    }
}
