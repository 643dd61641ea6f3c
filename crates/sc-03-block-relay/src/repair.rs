//! Point-to-point repair of missing blobs.
//!
//! When erasure coding cannot restore a group, the frame generator emits
//! the missing indices and reconstruction asks one random peer per index
//! for its copy. The responder side serves snapshots out of its own frame;
//! a stale snapshot is harmless because the requester's frame generator
//! revalidates the stamped index on arrival.

use std::sync::Arc;

use bincode::Error as BincodeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use sc_01_erasure_wire::{Blob, BlobBatch, Frame, BLOB_PAYLOAD_SIZE};
use sc_02_membership_sync::{NodeData, SyncTable};

use crate::frame_task::frame_generator;

/// A repair request: one missing index plus the requester's own record, so
/// the responder learns the requester and its reply endpoint in one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub index: u64,
    pub from: NodeData,
}

/// Errors from repair request encoding and decoding.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("malformed repair request: {0}")]
    Malformed(#[from] BincodeError),
    #[error("repair request exceeds blob capacity: {0} bytes")]
    Oversized(usize),
}

impl Request {
    /// Frame this request into a blob payload. The caller addresses the
    /// blob to the peer's repair endpoint.
    pub fn to_blob(&self) -> Result<Blob, RepairError> {
        let body = bincode::serialize(self)?;
        if body.len() > BLOB_PAYLOAD_SIZE {
            return Err(RepairError::Oversized(body.len()));
        }
        let mut blob = Blob::new();
        blob.write_payload(&body);
        Ok(blob)
    }

    /// Parse a blob payload back into a request.
    pub fn from_blob(blob: &Blob) -> Result<Self, RepairError> {
        Ok(bincode::deserialize(blob.payload())?)
    }
}

/// Repair responder: serve index-matched frame snapshots to requesters.
///
/// Every request also carries the requester's record, which is merged into
/// the membership table before anything else, so even a node we have never
/// gossiped with can be answered at its replication endpoint.
pub async fn repair_listener(
    table: Arc<SyncTable>,
    frame: Arc<Frame>,
    mut input: mpsc::Receiver<BlobBatch>,
    output: mpsc::Sender<BlobBatch>,
) {
    while let Some(batch) = input.recv().await {
        let mut replies = Vec::new();
        for blob in &batch {
            if let Some(reply) = handle_request(&table, &frame, blob) {
                replies.push(reply);
            }
        }
        if !replies.is_empty() && output.send(replies).await.is_err() {
            return;
        }
    }
}

fn handle_request(table: &SyncTable, frame: &Frame, blob: &Blob) -> Option<Blob> {
    let request = match Request::from_blob(blob) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "malformed repair request dropped");
            return None;
        }
    };
    table.insert(request.from.clone());
    if request.from.identity == table.identity() {
        debug!(index = request.index, "repair request from self ignored");
        return None;
    }
    let mut found = frame.snapshot(request.index)?;
    found.addr = Some(request.from.addresses.replication);
    found.set_from(&table.identity());
    debug!(index = request.index, to = %request.from.identity, "serving repair");
    Some(found)
}

/// Run the frame generator over `input` and turn every missing-index batch
/// into repair requests, one freshly chosen random peer per index. Returns
/// the delivered-batches channel.
pub fn reconstruct(
    frame: Arc<Frame>,
    input: mpsc::Receiver<BlobBatch>,
    table: Arc<SyncTable>,
    socket: Arc<UdpSocket>,
    capacity: usize,
) -> mpsc::Receiver<BlobBatch> {
    let (delivered, mut missing) = frame_generator(frame, input, capacity);
    tokio::spawn(async move {
        while let Some(indexes) = missing.recv().await {
            for index in indexes {
                let peer = match table.random_node() {
                    Ok(peer) => peer,
                    Err(err) => {
                        debug!(%err, index, "no peer to repair from");
                        break;
                    }
                };
                let request = Request {
                    index,
                    from: table.my_copy(),
                };
                match request.to_blob() {
                    Ok(blob) => {
                        debug!(index, peer = %peer.identity, "requesting repair");
                        if let Err(err) =
                            socket.send_to(blob.bytes(), peer.addresses.repair).await
                        {
                            error!(%err, index, "repair request send failed");
                        }
                    }
                    Err(err) => warn!(%err, index, "failed to encode repair request"),
                }
            }
        }
    });
    delivered
}
