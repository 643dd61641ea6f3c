//! The wire unit: a fixed-capacity framed packet.

use std::fmt;
use std::net::SocketAddr;

use shared_types::Pubkey;

/// Total capacity of a blob buffer in bytes.
pub const BLOB_SIZE: usize = 64 * 1024;

/// Offset of the sender identity in the header.
pub const FROM_OFFSET: usize = 8;

/// Offset of the flags word in the header.
pub const FLAGS_OFFSET: usize = FROM_OFFSET + Pubkey::LEN;

/// Offset at which the payload starts.
pub const DATA_OFFSET: usize = FLAGS_OFFSET + 4;

/// Payload capacity of a single blob.
pub const BLOB_PAYLOAD_SIZE: usize = BLOB_SIZE - DATA_OFFSET;

/// Flags bit marking a parity (coding) slot.
pub const FLAG_CODING: u32 = 1;

/// A framed packet: the only thing ever sent on a node socket.
///
/// Header layout: bytes [0, 8) big-endian sequence index, [8, 40) sender
/// identity, [40, 44) big-endian flags, [44, 65536) payload. `size` is the
/// number of used bytes including the header; `addr` is the datagram source
/// on receive and the destination on send.
#[derive(Clone)]
pub struct Blob {
    data: Vec<u8>,
    size: usize,
    pub addr: Option<SocketAddr>,
}

impl Blob {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: vec![0u8; BLOB_SIZE],
            size: 0,
            addr: None,
        }
    }

    /// Used length in bytes, header included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Set the used length, as reported by a socket read or a codec write.
    pub fn set_size(&mut self, size: usize) {
        debug_assert!(size <= BLOB_SIZE);
        self.size = size.min(BLOB_SIZE);
    }

    /// The used bytes, ready to put on the wire.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// The whole buffer, for socket reads.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Sequence index stamped in the header.
    #[must_use]
    pub fn index(&self) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[..FROM_OFFSET]);
        u64::from_be_bytes(bytes)
    }

    pub fn set_index(&mut self, index: u64) {
        self.data[..FROM_OFFSET].copy_from_slice(&index.to_be_bytes());
        self.size = self.size.max(DATA_OFFSET);
    }

    /// Sender identity stamped in the header.
    #[must_use]
    pub fn from(&self) -> Pubkey {
        let mut bytes = [0u8; Pubkey::LEN];
        bytes.copy_from_slice(&self.data[FROM_OFFSET..FLAGS_OFFSET]);
        Pubkey::new(bytes)
    }

    pub fn set_from(&mut self, from: &Pubkey) {
        self.data[FROM_OFFSET..FLAGS_OFFSET].copy_from_slice(from.as_bytes());
        self.size = self.size.max(DATA_OFFSET);
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[FLAGS_OFFSET..DATA_OFFSET]);
        u32::from_be_bytes(bytes)
    }

    pub fn set_flags(&mut self, flags: u32) {
        self.data[FLAGS_OFFSET..DATA_OFFSET].copy_from_slice(&flags.to_be_bytes());
        self.size = self.size.max(DATA_OFFSET);
    }

    /// True when this slot carries Reed-Solomon parity instead of data.
    #[must_use]
    pub fn is_coding(&self) -> bool {
        self.flags() & FLAG_CODING != 0
    }

    pub fn set_coding(&mut self) {
        self.set_flags(self.flags() | FLAG_CODING);
    }

    /// The used payload, empty when the blob is header-only.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[DATA_OFFSET..self.size.max(DATA_OFFSET)]
    }

    /// Replace the payload and stamp the new used length.
    ///
    /// # Panics
    ///
    /// Panics if `payload` exceeds [`BLOB_PAYLOAD_SIZE`]; callers size
    /// payloads to the blob capacity by construction.
    pub fn write_payload(&mut self, payload: &[u8]) {
        assert!(payload.len() <= BLOB_PAYLOAD_SIZE);
        let end = DATA_OFFSET + payload.len();
        self.data[DATA_OFFSET..end].copy_from_slice(payload);
        // the region past the payload must stay zero, parity shards over it
        if self.size > end {
            self.data[end..self.size].fill(0);
        }
        self.size = end;
    }

    /// The payload zero-padded out to absolute offset `end`, the view the
    /// coding engine shards over.
    #[must_use]
    pub fn padded_payload(&self, end: usize) -> &[u8] {
        debug_assert!(end >= DATA_OFFSET && end <= BLOB_SIZE);
        &self.data[DATA_OFFSET..end.clamp(DATA_OFFSET, BLOB_SIZE)]
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("index", &self.index())
            .field("from", &self.from())
            .field("coding", &self.is_coding())
            .field("size", &self.size)
            .field("addr", &self.addr)
            .finish()
    }
}
