//! Pipeline entry points: wire already-open sockets and a shared membership
//! table into the long-running relay tasks. Each entry runs for the node's
//! lifetime.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{error, warn};

use sc_01_erasure_wire::{blob_receiver, blob_sender, Frame};
use sc_02_membership_sync::SyncTable;

use crate::broadcast::{broadcaster, transporter};
use crate::codec::{blobs_to_blocks, blocks_to_blobs};
use crate::ports::{BlockSource, LedgerSink, PersistenceSink};
use crate::repair::{reconstruct, repair_listener};

/// Tunables for the relay pipelines.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Bound on every internal channel.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 10,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}

/// Repair responder: answer peers' repair requests out of `frame`.
pub async fn run_repair_responder(
    table: Arc<SyncTable>,
    frame: Arc<Frame>,
    repair_socket: Arc<UdpSocket>,
    send_socket: Arc<UdpSocket>,
    config: RelayConfig,
) {
    let inbound = blob_receiver(repair_socket, config.channel_capacity);
    let outbound = blob_sender(send_socket, config.channel_capacity);
    repair_listener(table, frame, inbound, outbound).await;
}

/// Producer pipeline: pack every batch from the source and broadcast it.
///
/// The producer also answers repair requests out of its broadcast frame
/// when a repair socket is supplied; it holds the complete stream, so it
/// can serve any index still inside the window.
pub async fn run_block_producer<S: BlockSource>(
    mut source: S,
    table: Arc<SyncTable>,
    broadcast_socket: Arc<UdpSocket>,
    repair_socket: Option<Arc<UdpSocket>>,
    config: RelayConfig,
) {
    let frame = Arc::new(Frame::new());
    if let Some(repair_socket) = repair_socket {
        tokio::spawn(run_repair_responder(
            table.clone(),
            frame.clone(),
            repair_socket,
            broadcast_socket.clone(),
            config.clone(),
        ));
    }

    let (blobs_tx, blobs_rx) = mpsc::channel(config.channel_capacity);
    let fan_out = tokio::spawn(broadcaster(
        table.clone(),
        frame.clone(),
        broadcast_socket,
        blobs_rx,
    ));

    while let Some(blocks) = source.next_batch().await {
        match blocks_to_blobs(&blocks) {
            Ok(blobs) => {
                if blobs_tx.send(blobs).await.is_err() {
                    break;
                }
            }
            Err(err) => error!(%err, "dropping unpackable block batch"),
        }
    }
    drop(blobs_tx);
    let _ = fan_out.await;
}

/// Signer pipeline: receive the stream, repair holes, re-fan producer
/// traffic, and deliver decoded batches to the ledger.
///
/// Sink errors are logged and never stop the pipeline; the stream keeps
/// flowing and the ledger catches up from repair.
pub async fn run_block_signer(
    table: Arc<SyncTable>,
    ledger: Arc<dyn LedgerSink>,
    persistence: Option<Arc<dyn PersistenceSink>>,
    replication_socket: Arc<UdpSocket>,
    repair_socket: Arc<UdpSocket>,
    relay_send_socket: Arc<UdpSocket>,
    config: RelayConfig,
) {
    let frame = Arc::new(Frame::new());
    tokio::spawn(run_repair_responder(
        table.clone(),
        frame.clone(),
        repair_socket,
        relay_send_socket.clone(),
        config.clone(),
    ));

    let (to_decode_tx, to_decode_rx) = mpsc::channel(config.channel_capacity);
    let (to_refan_tx, to_refan_rx) = mpsc::channel(config.channel_capacity);
    tokio::spawn(transporter(
        table.clone(),
        to_refan_rx,
        relay_send_socket.clone(),
    ));

    // tee replication traffic to the decoder, the re-fan, and persistence
    let mut inbound = blob_receiver(replication_socket, config.channel_capacity);
    tokio::spawn(async move {
        while let Some(batch) = inbound.recv().await {
            if let Some(sink) = &persistence {
                for block in blobs_to_blocks(&batch) {
                    if let Err(err) = sink.save_block(&block) {
                        warn!(%err, number = block.number, "persistence failed");
                    }
                }
            }
            if to_refan_tx.send(batch.clone()).await.is_err() {
                return;
            }
            if to_decode_tx.send(batch).await.is_err() {
                return;
            }
        }
    });

    let mut delivered = reconstruct(
        frame,
        to_decode_rx,
        table.clone(),
        relay_send_socket,
        config.channel_capacity,
    );
    while let Some(batch) = delivered.recv().await {
        let blocks = blobs_to_blocks(&batch);
        if let Err(err) = ledger.process_blocks(blocks) {
            error!(%err, "ledger sink rejected batch");
        }
    }
}
