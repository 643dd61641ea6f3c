//! Gossip pump tasks: the periodic pull generator and the listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use sc_01_erasure_wire::{blob_receiver, blob_sender, Blob, BlobBatch};

use crate::messages::{SyncMessage, Updates};
use crate::table::SyncTable;

/// Tunables for the gossip pump.
#[derive(Clone, Debug)]
pub struct GossipConfig {
    /// How often the generator pulls from a random peer.
    pub period: Duration,
    /// Bound on every internal channel.
    pub channel_capacity: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            channel_capacity: 10,
        }
    }
}

impl GossipConfig {
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

/// Periodic pull generator: every `period`, ask one random peer for
/// everything since the clock it last reported. A too-small table just
/// skips the tick; the next one retries naturally.
pub async fn sync_requester(
    table: Arc<SyncTable>,
    output: mpsc::Sender<BlobBatch>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let Some((addr, request)) = table.request_sync() else {
            trace!("membership table too small, skipping pull tick");
            continue;
        };
        match SyncMessage::GetUpdates(request).to_blob() {
            Ok(mut blob) => {
                blob.addr = Some(addr);
                if output.send(vec![blob]).await.is_err() {
                    return;
                }
            }
            Err(err) => warn!(%err, "failed to encode pull request"),
        }
    }
}

/// Listener: dispatch every inbound gossip blob by its type tag.
///
/// A pull request gets a reply only when something actually changed since
/// the requester's clock; replies carry our whole news batch. Updates are
/// merged. Malformed blobs are logged and dropped; the sender's next tick
/// is the retry.
pub async fn sync_listener(
    table: Arc<SyncTable>,
    mut input: mpsc::Receiver<BlobBatch>,
    output: mpsc::Sender<BlobBatch>,
) {
    while let Some(batch) = input.recv().await {
        let mut replies = Vec::new();
        for blob in &batch {
            if let Some(reply) = handle_blob(&table, blob) {
                replies.push(reply);
            }
        }
        if !replies.is_empty() && output.send(replies).await.is_err() {
            return;
        }
    }
}

fn handle_blob(table: &SyncTable, blob: &Blob) -> Option<Blob> {
    match SyncMessage::from_blob(blob) {
        Ok(SyncMessage::GetUpdates(request)) => {
            let reply_to = request.requester.addresses.gossip;
            let (from, clock, records) = table.updates_since(request.since_clock);
            if records.is_empty() {
                trace!(since = request.since_clock, "nothing new, no reply");
                return None;
            }
            let response = SyncMessage::Updates(Updates {
                from,
                clock,
                records,
            });
            let mut reply = match response.to_blob() {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(%err, "failed to encode update batch");
                    return None;
                }
            };
            reply.addr = Some(reply_to);
            table.insert(request.requester);
            Some(reply)
        }
        Ok(SyncMessage::Updates(updates)) => {
            table.update(updates);
            None
        }
        Err(err) => {
            warn!(%err, "malformed gossip blob dropped");
            None
        }
    }
}

/// The gossip pump: wire the listener and the pull generator to an
/// already-open socket pair and run for the node's lifetime.
pub async fn run_gossip(
    table: Arc<SyncTable>,
    listen: Arc<UdpSocket>,
    send: Arc<UdpSocket>,
    config: GossipConfig,
) {
    let inbound = blob_receiver(listen, config.channel_capacity);
    let outbound = blob_sender(send, config.channel_capacity);
    let requester = tokio::spawn(sync_requester(
        table.clone(),
        outbound.clone(),
        config.period,
    ));
    sync_listener(table, inbound, outbound).await;
    requester.abort();
}
