//! Socket pump tasks: batched blob receive and send.
//!
//! Each pump owns one socket role for the node's lifetime. The receiver
//! blocks for the first datagram of a burst, then keeps draining with a
//! short timeout so one channel message carries the whole burst downstream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, warn};

use crate::blob::Blob;

/// A burst of blobs moved between tasks as one message.
pub type BlobBatch = Vec<Blob>;

/// Most blobs delivered per batch.
pub const RECV_BATCH: usize = 64;

/// How long the receiver keeps draining a burst after its first datagram.
pub const READ_TIMEOUT: Duration = Duration::from_millis(120);

/// Spawn the read pump for `socket`: batches of inbound blobs appear on the
/// returned channel. Runs until the consumer drops the receiver.
pub fn blob_receiver(socket: Arc<UdpSocket>, capacity: usize) -> mpsc::Receiver<BlobBatch> {
    let (batches, output) = mpsc::channel(capacity);
    tokio::spawn(async move {
        loop {
            let mut batch = Vec::new();
            match recv_blob(&socket).await {
                Ok(Some(blob)) => batch.push(blob),
                Ok(None) => continue,
                Err(err) => {
                    error!(%err, "blob receive failed");
                    continue;
                }
            }
            while batch.len() < RECV_BATCH {
                match timeout(READ_TIMEOUT, recv_blob(&socket)).await {
                    Ok(Ok(Some(blob))) => batch.push(blob),
                    Ok(Ok(None)) => continue,
                    Ok(Err(err)) => {
                        error!(%err, "blob receive failed");
                        break;
                    }
                    Err(_) => break,
                }
            }
            if batches.send(batch).await.is_err() {
                return;
            }
        }
    });
    output
}

async fn recv_blob(socket: &UdpSocket) -> std::io::Result<Option<Blob>> {
    let mut blob = Blob::new();
    let (size, addr) = socket.recv_from(blob.buffer_mut()).await?;
    if size == 0 {
        return Ok(None);
    }
    blob.set_size(size);
    blob.addr = Some(addr);
    Ok(Some(blob))
}

/// Spawn the write pump for `socket`: every blob sent into the returned
/// channel goes out as one datagram to its `addr`. Runs until all senders
/// drop the channel.
pub fn blob_sender(socket: Arc<UdpSocket>, capacity: usize) -> mpsc::Sender<BlobBatch> {
    let (input, mut batches) = mpsc::channel::<BlobBatch>(capacity);
    tokio::spawn(async move {
        while let Some(batch) = batches.recv().await {
            for blob in &batch {
                let Some(addr) = blob.addr else {
                    warn!(index = blob.index(), "blob without destination dropped");
                    continue;
                };
                send_blob(&socket, blob.bytes(), addr).await;
            }
        }
    });
    input
}

async fn send_blob(socket: &UdpSocket, bytes: &[u8], addr: SocketAddr) {
    if let Err(err) = socket.send_to(bytes, addr).await {
        error!(%err, %addr, "blob send failed");
    }
}
