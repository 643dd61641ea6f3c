//! Reed-Solomon coding over the blob stream.
//!
//! The engine itself ([`encode_rs_block`] / [`decode_rs_block`]) is stateless
//! and works on bare byte shards. The frame-window functions anchor coding
//! groups to absolute sequence indices: every run of [`NUM_DATA`] data slots
//! is followed by [`MAX_MISSING`] parity slots, [`NUM_CODED`] slots per group,
//! so any [`MAX_MISSING`] losses per group are recoverable locally.

use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;
use tracing::debug;

use crate::blob::{Blob, DATA_OFFSET};
use crate::frame::Frame;

/// Slots per coding group.
pub const NUM_CODED: usize = 20;

/// Parity slots per group; the maximum recoverable losses.
pub const MAX_MISSING: usize = 4;

/// Data slots per group.
pub const NUM_DATA: usize = NUM_CODED - MAX_MISSING;

/// Errors from the coding engine and the frame-window codecs.
#[derive(Debug, Error)]
pub enum CodingError {
    #[error("too many missing shards: {missing}, at most {max} recoverable")]
    TooManyMissing { missing: usize, max: usize },
    #[error("shard verification failed after reconstruction")]
    VerifyFailed,
    #[error("window [{start}, {end}) holds no complete coding group")]
    ShortWindow { start: u64, end: u64 },
    #[error("coding group incomplete: no blob at index {index}")]
    IncompleteGroup { index: u64 },
    #[error("coding group at {start} has no payload to encode")]
    EmptyGroup { start: u64 },
    #[error("reed-solomon: {0:?}")]
    ReedSolomon(reed_solomon_erasure::Error),
}

/// Compute `coding.len()` parity shards from the data shards.
///
/// All shards must be the same length; callers pad to the longest payload
/// first. Parity is written into `coding` in place.
pub fn encode_rs_block(coding: &mut [Vec<u8>], data: &[Vec<u8>]) -> Result<(), CodingError> {
    let encoder = ReedSolomon::new(data.len(), coding.len()).map_err(CodingError::ReedSolomon)?;
    let mut shards: Vec<Vec<u8>> = data.iter().cloned().chain(coding.iter().cloned()).collect();
    encoder.encode(&mut shards).map_err(CodingError::ReedSolomon)?;
    for (slot, shard) in coding.iter_mut().zip(shards.split_off(data.len())) {
        *slot = shard;
    }
    Ok(())
}

/// Reconstruct missing shards in place, then verify the whole set.
///
/// A missing shard is zero-length. Fails when more than `coding.len()`
/// shards are missing, or when the reconstructed set does not verify.
pub fn decode_rs_block(coding: &mut [Vec<u8>], data: &mut [Vec<u8>]) -> Result<(), CodingError> {
    let missing = data
        .iter()
        .chain(coding.iter())
        .filter(|shard| shard.is_empty())
        .count();
    if missing > coding.len() {
        return Err(CodingError::TooManyMissing {
            missing,
            max: coding.len(),
        });
    }

    let decoder = ReedSolomon::new(data.len(), coding.len()).map_err(CodingError::ReedSolomon)?;
    let mut shards: Vec<Option<Vec<u8>>> = data
        .iter()
        .chain(coding.iter())
        .map(|shard| (!shard.is_empty()).then(|| shard.clone()))
        .collect();
    decoder
        .reconstruct(&mut shards)
        .map_err(CodingError::ReedSolomon)?;

    let restored: Vec<Vec<u8>> = shards
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect();
    if !decoder.verify(&restored).map_err(CodingError::ReedSolomon)? {
        return Err(CodingError::VerifyFailed);
    }

    for (slot, shard) in data.iter_mut().chain(coding.iter_mut()).zip(restored) {
        *slot = shard;
    }
    Ok(())
}

/// A parity placeholder: flagged as coding, payload filled in by
/// [`encode_frame`] once its group is complete.
fn coding_placeholder() -> Blob {
    let mut blob = Blob::new();
    blob.set_coding();
    blob
}

/// Insert [`MAX_MISSING`] parity placeholders immediately before every
/// absolute index boundary where `(i + MAX_MISSING) % NUM_CODED == 0`.
///
/// `start` is the absolute sequence index of `blobs[0]`; groups anchor to
/// absolute indices, not batch boundaries, so a batch that starts mid-group
/// completes the group its predecessor opened.
pub fn add_coding_blobs(blobs: &mut Vec<Blob>, start: u64) {
    let original = blobs.len() as u64;
    let added =
        ((start % NUM_CODED as u64) + original) / NUM_DATA as u64 * MAX_MISSING as u64;
    let mut i = start;
    while i < start + original + added {
        if i != 0 && (i + MAX_MISSING as u64) % NUM_CODED as u64 == 0 {
            let at = (i - start) as usize;
            debug!(index = i, at, "inserting parity placeholders");
            blobs.splice(
                at..at,
                std::iter::repeat_with(coding_placeholder).take(MAX_MISSING),
            );
        }
        i += 1;
    }
}

/// Fill the parity slots of every group completed by the `num_blobs` blobs
/// starting at absolute index `start`.
///
/// Data shards are padded to the longest payload in the group; the parity
/// blobs take that padded size so decoders recover the exact pad.
pub fn encode_frame(frame: &Frame, start: u64, num_blobs: u64) -> Result<(), CodingError> {
    let mut block_start = start - (start % NUM_CODED as u64);
    for i in start..start + num_blobs {
        if i % NUM_CODED as u64 == NUM_CODED as u64 - 1 {
            encode_group(frame, block_start)?;
            debug!(block_start, "parity encoded for coding group");
            block_start += NUM_CODED as u64;
        }
    }
    Ok(())
}

fn encode_group(frame: &Frame, block_start: u64) -> Result<(), CodingError> {
    let data_end = block_start + NUM_DATA as u64;

    let mut data_blobs = Vec::with_capacity(NUM_DATA);
    let mut max_size = 0usize;
    for i in block_start..data_end {
        let blob = frame
            .snapshot(i)
            .ok_or(CodingError::IncompleteGroup { index: i })?;
        max_size = max_size.max(blob.size());
        data_blobs.push(blob);
    }
    if max_size <= DATA_OFFSET {
        return Err(CodingError::EmptyGroup { start: block_start });
    }

    let data: Vec<Vec<u8>> = data_blobs
        .iter()
        .map(|blob| blob.padded_payload(max_size).to_vec())
        .collect();
    let mut coding = vec![vec![0u8; max_size - DATA_OFFSET]; MAX_MISSING];
    encode_rs_block(&mut coding, &data)?;

    for (offset, shard) in coding.into_iter().enumerate() {
        let i = data_end + offset as u64;
        let mut blob = frame
            .snapshot(i)
            .ok_or(CodingError::IncompleteGroup { index: i })?;
        blob.write_payload(&shard);
        frame.store(blob);
    }
    Ok(())
}

/// Decode the one coding group containing `start`, given blobs observed up
/// to (but not including) index `end`.
///
/// Counts missing slots first and refuses groups past the recovery limit so
/// the caller can ask peers for the missing indices instead. On success the
/// recovered slots are written back with their index, coding flag, and the
/// group's padded size, so the group reads back complete.
pub fn decode_frame(frame: &Frame, start: u64, end: u64) -> Result<(), CodingError> {
    if end <= start {
        return Err(CodingError::ShortWindow { start, end });
    }
    let block_start = start - (start % NUM_CODED as u64);
    if end - block_start < NUM_CODED as u64 {
        return Err(CodingError::ShortWindow { start, end });
    }
    let data_end = block_start + NUM_DATA as u64;
    let coding_end = block_start + NUM_CODED as u64;

    let mut present: Vec<Option<Blob>> = Vec::with_capacity(NUM_CODED);
    let mut max_size = 0usize;
    for i in block_start..coding_end {
        let blob = frame.snapshot(i).filter(|blob| blob.size() > DATA_OFFSET);
        if let Some(blob) = &blob {
            max_size = max_size.max(blob.size());
        }
        present.push(blob);
    }

    let data_missing = present[..NUM_DATA].iter().filter(|s| s.is_none()).count();
    let coded_missing = present[NUM_DATA..].iter().filter(|s| s.is_none()).count();
    if data_missing + coded_missing > MAX_MISSING {
        return Err(CodingError::TooManyMissing {
            missing: data_missing + coded_missing,
            max: MAX_MISSING,
        });
    }
    if max_size <= DATA_OFFSET {
        return Err(CodingError::EmptyGroup { start: block_start });
    }
    debug!(block_start, data_missing, coded_missing, "decoding group");

    let shard = |slot: &Option<Blob>| -> Vec<u8> {
        slot.as_ref()
            .map(|blob| blob.padded_payload(max_size).to_vec())
            .unwrap_or_default()
    };
    let mut data: Vec<Vec<u8>> = present[..NUM_DATA].iter().map(shard).collect();
    let mut coding: Vec<Vec<u8>> = present[NUM_DATA..].iter().map(shard).collect();
    decode_rs_block(&mut coding, &mut data)?;

    for (offset, slot) in present.iter().enumerate() {
        if slot.is_some() {
            continue;
        }
        let index = block_start + offset as u64;
        let mut blob = Blob::new();
        blob.set_index(index);
        if index >= data_end {
            blob.set_coding();
        }
        let restored = if index < data_end {
            &data[offset]
        } else {
            &coding[offset - NUM_DATA]
        };
        blob.write_payload(restored);
        debug!(index, "recovered blob written back");
        frame.store(blob);
    }
    Ok(())
}
