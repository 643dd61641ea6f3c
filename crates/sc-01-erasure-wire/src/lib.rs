//! # Erasure Wire Subsystem (sc-01)
//!
//! The transport layer of the block stream: every datagram on every node
//! socket is one [`Blob`], a framed 64 KiB packet. Blobs are addressed by a
//! global sequence index into a circular [`Frame`] window, and every group of
//! 16 data slots is protected by 4 Reed-Solomon parity slots, so a receiver
//! that sees any 16 of 20 blobs reconstructs the rest locally.
//!
//! ## Architecture Role
//!
//! ```text
//! [Block Relay (3)] ──encode──→ Frame ──UDP──→ peer Frame ──decode──→ [Block Relay (3)]
//!                                 ↑ snapshot
//!                           [repair reader]
//! ```
//!
//! ## Sharing Model
//!
//! A `Frame` is written by exactly one task (broadcaster on the producer,
//! frame generator on a signer) and read concurrently by the repair
//! responder. Reads are eventually-consistent snapshots: the reader gets an
//! owned copy and revalidates the stamped index before trusting it.

pub mod blob;
pub mod coding;
pub mod frame;
pub mod sockets;

pub use blob::{Blob, BLOB_PAYLOAD_SIZE, BLOB_SIZE, DATA_OFFSET, FLAG_CODING};
pub use coding::{
    add_coding_blobs, decode_frame, decode_rs_block, encode_frame, encode_rs_block, CodingError,
    MAX_MISSING, NUM_CODED, NUM_DATA,
};
pub use frame::{Frame, FRAME_SIZE};
pub use sockets::{blob_receiver, blob_sender, BlobBatch, READ_TIMEOUT, RECV_BATCH};
