//! Producer-side fan-out and signer-side re-fan of the block stream.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use sc_01_erasure_wire::{add_coding_blobs, encode_frame, BlobBatch, Frame, FRAME_SIZE};
use sc_02_membership_sync::SyncTable;

/// Broadcast the blob stream to the transit peers.
///
/// Keeps the global sequence counter across batches. Per batch: insert the
/// parity placeholders (before chunking, or a batch could outgrow the
/// frame), stamp every blob with its index and the local identity, then per
/// chunk of at most [`FRAME_SIZE`] blobs copy into the frame, fill parity,
/// and fan out round-robin: blob `i` of the chunk goes to peer
/// `i mod peer_count`. Peers repair the rest from each other.
///
/// A batch that arrives while no transit peer is known is dropped without
/// advancing the counter.
pub async fn broadcaster(
    table: Arc<SyncTable>,
    frame: Arc<Frame>,
    socket: Arc<UdpSocket>,
    mut input: mpsc::Receiver<BlobBatch>,
) {
    let mut index: u64 = 0;
    while let Some(mut blobs) = input.recv().await {
        let peers = table.transit_nodes();
        if peers.is_empty() {
            info!("no transit peers, dropping batch");
            continue;
        }

        add_coding_blobs(&mut blobs, index);
        let me = table.identity();
        for (offset, blob) in blobs.iter_mut().enumerate() {
            blob.set_from(&me);
            blob.set_index(index + offset as u64);
        }

        for chunk in blobs.chunks(FRAME_SIZE) {
            for blob in chunk {
                frame.store(blob.clone());
            }
            if let Err(err) = encode_frame(&frame, index, chunk.len() as u64) {
                warn!(%err, index, "parity encoding failed, chunk goes out uncoded");
            }
            for (offset, blob) in chunk.iter().enumerate() {
                // parity slots were filled in the frame, not in the chunk
                let Some(out) = frame.snapshot(blob.index()) else {
                    continue;
                };
                let peer = &peers[offset % peers.len()];
                if let Err(err) = socket.send_to(out.bytes(), peer.addresses.replication).await {
                    error!(%err, peer = %peer.identity, "broadcast send failed");
                }
            }
            index += chunk.len() as u64;
            debug!(index, chunk = chunk.len(), peers = peers.len(), "chunk broadcast");
        }
    }
}

/// Re-fan producer traffic from a signer: every inbound blob stamped by the
/// current producer is forwarded to all transit peers, restamped with the
/// local identity. Combined with the producer's `1/n` fan-out this restores
/// full coverage without waiting on repair round-trips.
pub async fn transporter(
    table: Arc<SyncTable>,
    mut input: mpsc::Receiver<BlobBatch>,
    socket: Arc<UdpSocket>,
) {
    while let Some(batch) = input.recv().await {
        let producer = table.my_copy().producer;
        for blob in &batch {
            if blob.from() != producer {
                continue;
            }
            let mut relayed = blob.clone();
            relayed.set_from(&table.identity());
            for peer in table.transit_nodes() {
                debug!(index = relayed.index(), peer = %peer.identity, "re-fanning blob");
                if let Err(err) = socket
                    .send_to(relayed.bytes(), peer.addresses.replication)
                    .await
                {
                    error!(%err, peer = %peer.identity, "re-fan send failed");
                }
            }
        }
    }
}
