//! # Block Relay Subsystem (sc-03)
//!
//! Moves the producer's block stream to every signer using a fraction of
//! full-replication bandwidth. The broadcaster packs blocks into indexed
//! blobs, inserts parity slots, and fans each chunk round-robin across the
//! transit peers, so each peer receives roughly `1/n` of the stream
//! directly; the frame generator on the receiving side decodes complete
//! coding groups and the repair exchange fetches whatever erasure coding
//! could not restore.
//!
//! ## Architecture Role
//!
//! ```text
//! BlockSource ──pack──→ [Broadcaster] ──1/n each──→ peer replication sockets
//!                                                        │
//!                              [Frame Generator] ←───────┘
//!                                │        │ missing indices
//!                                │        └──→ [Reconstruct] ──Request──→ random peer
//!                                ↓ decoded batches
//!                            LedgerSink (+ optional PersistenceSink)
//! ```
//!
//! ## Delivery Contract
//!
//! Batches come out in stream order, each exactly one coding group's worth
//! of data blobs. Lossy, duplicated, or reordered datagrams are absorbed by
//! the frame window; nothing here retries in-call, ambient tasks do.

pub mod broadcast;
pub mod codec;
pub mod frame_task;
pub mod pipeline;
pub mod ports;
pub mod repair;

pub use broadcast::{broadcaster, transporter};
pub use codec::{blobs_to_blocks, blocks_to_blobs, CodecError};
pub use frame_task::frame_generator;
pub use pipeline::{run_block_producer, run_block_signer, run_repair_responder, RelayConfig};
pub use ports::{BlockSource, ChannelBlockSource, LedgerSink, PersistenceSink, SinkError};
pub use repair::{reconstruct, repair_listener, RepairError, Request};
