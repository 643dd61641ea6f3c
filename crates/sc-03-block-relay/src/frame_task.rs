//! Receiver-side frame generator: fill the window, decode complete groups,
//! deliver data blobs in stream order.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace};

use sc_01_erasure_wire::{decode_frame, BlobBatch, Frame, MAX_MISSING, NUM_CODED, NUM_DATA};

/// Spawn the frame generator over `input` batches.
///
/// Returns the delivered-batches channel and the missing-indices channel.
/// Two cursors drive it: `start` is the next undelivered index, `end` one
/// past the highest index observed. Every inbound blob lands in its slot by
/// its own stamped index (blobs behind `start` are ignored); whenever a full
/// coding group fits under `end`, it is decoded and its data blobs go out as
/// one batch. A group missing more than the recoverable maximum emits its
/// missing indices instead and waits for repair; draining one group may
/// complete the next, so decoding loops.
pub fn frame_generator(
    frame: Arc<Frame>,
    mut input: mpsc::Receiver<BlobBatch>,
    capacity: usize,
) -> (mpsc::Receiver<BlobBatch>, mpsc::Receiver<Vec<u64>>) {
    let (delivered_tx, delivered_rx) = mpsc::channel(capacity);
    let (missing_tx, missing_rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let mut start: u64 = 0;
        let mut end: u64 = 0;
        while let Some(batch) = input.recv().await {
            trace!(start, end, batch = batch.len(), "frame generator batch");
            for blob in batch {
                let index = blob.index();
                if index < start {
                    debug!(index, start, "blob behind the window ignored");
                    continue;
                }
                end = end.max(index + 1);
                frame.store(blob);
            }

            while start + NUM_CODED as u64 <= end {
                match decode_frame(&frame, start, end) {
                    Ok(()) => {
                        let (next, recovered) = collect_group(&frame, start);
                        start = next;
                        match recovered {
                            Some(group) => {
                                if delivered_tx.send(group).await.is_err() {
                                    return;
                                }
                            }
                            None => break,
                        }
                    }
                    Err(err) => {
                        debug!(%err, start, "group not decodable, asking for repair");
                        let indexes = frame.missing_indexes(start, end);
                        if !indexes.is_empty() && missing_tx.send(indexes).await.is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    });

    (delivered_rx, missing_rx)
}

/// Walk forward from `start` collecting one group's worth of contiguous
/// data blobs, then skip the parity slots. Returns the advanced cursor and
/// the batch, or `None` when the walk hit a hole.
fn collect_group(frame: &Frame, mut start: u64) -> (u64, Option<BlobBatch>) {
    let mut collected = Vec::with_capacity(NUM_DATA);
    while collected.len() < NUM_DATA {
        match frame.snapshot(start) {
            Some(blob) => {
                collected.push(blob);
                start += 1;
            }
            None => break,
        }
    }
    if collected.len() == NUM_DATA {
        start += MAX_MISSING as u64;
        (start, Some(collected))
    } else {
        debug!(start, "not enough contiguous blobs to deliver");
        (start, None)
    }
}
