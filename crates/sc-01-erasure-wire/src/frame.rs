//! Circular, index-addressed window of blob slots.

use parking_lot::RwLock;

use crate::blob::Blob;
use crate::coding::NUM_CODED;

/// Number of blob slots in a frame.
pub const FRAME_SIZE: usize = 2 * 1024;

/// A sliding window over the blob stream: slot(i) = i mod [`FRAME_SIZE`].
///
/// Each slot holds only the most recently stored blob claiming it, which
/// bounds the pipeline to one window. One task writes a frame (the
/// broadcaster on the producer, the frame generator on a signer); the repair
/// responder reads it concurrently. Slots are individually locked and every
/// read copies out, so a reader never observes a slot mid-write; what it may
/// observe is a stale or about-to-be-replaced blob, which callers tolerate by
/// revalidating the stamped index.
pub struct Frame {
    slots: Vec<RwLock<Option<Blob>>>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: (0..FRAME_SIZE).map(|_| RwLock::new(None)).collect(),
        }
    }

    fn slot(&self, index: u64) -> &RwLock<Option<Blob>> {
        &self.slots[(index % FRAME_SIZE as u64) as usize]
    }

    /// Store a blob in the slot its stamped index maps to, displacing any
    /// previous occupant.
    pub fn store(&self, blob: Blob) {
        let index = blob.index();
        *self.slot(index).write() = Some(blob);
    }

    /// Copy out the blob claiming `index`, if the slot currently holds one
    /// stamped with exactly that index.
    #[must_use]
    pub fn snapshot(&self, index: u64) -> Option<Blob> {
        self.slot(index)
            .read()
            .as_ref()
            .filter(|blob| blob.index() == index)
            .cloned()
    }

    /// True when the slot holds an undamaged blob stamped `index`.
    #[must_use]
    pub fn is_present(&self, index: u64) -> bool {
        self.slot(index)
            .read()
            .as_ref()
            .is_some_and(|blob| blob.index() == index && blob.size() != 0)
    }

    /// Missing indices in `[start, end)`, bounded to one coding group.
    #[must_use]
    pub fn missing_indexes(&self, start: u64, end: u64) -> Vec<u64> {
        let end = end.min(start + NUM_CODED as u64);
        (start..end).filter(|&i| !self.is_present(i)).collect()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_at(index: u64) -> Blob {
        let mut blob = Blob::new();
        blob.set_index(index);
        blob.write_payload(&index.to_be_bytes());
        blob
    }

    #[test]
    fn test_snapshot_revalidates_index() {
        let frame = Frame::new();
        frame.store(blob_at(5));
        assert!(frame.snapshot(5).is_some());
        // same slot, different index
        assert!(frame.snapshot(5 + FRAME_SIZE as u64).is_none());
    }

    #[test]
    fn test_store_displaces_previous_occupant() {
        let frame = Frame::new();
        frame.store(blob_at(5));
        frame.store(blob_at(5 + FRAME_SIZE as u64));
        assert!(frame.snapshot(5).is_none());
        assert!(frame.snapshot(5 + FRAME_SIZE as u64).is_some());
    }

    #[test]
    fn test_missing_indexes_bounded_to_one_group() {
        let frame = Frame::new();
        for i in 0..3 {
            frame.store(blob_at(i));
        }
        let missing = frame.missing_indexes(0, 64);
        assert_eq!(missing.len(), NUM_CODED - 3);
        assert_eq!(missing[0], 3);
        assert_eq!(*missing.last().unwrap(), NUM_CODED as u64 - 1);
    }
}
