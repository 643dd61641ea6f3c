//! # Membership Sync Subsystem (sc-02)
//!
//! Keeps every node's view of cluster membership and addressing eventually
//! consistent without pairwise configuration. Each node owns one
//! [`NodeData`] record (bumping its version on every self-mutation) and
//! holds version-merged copies of everyone else's; a periodic anti-entropy
//! pull from one random peer spreads changes epidemically.
//!
//! ## Architecture Role
//!
//! ```text
//!        every ~1s                    on request
//! [generator] ──GetUpdates──→ peer ──Updates──→ [listener] ──merge──→ SyncTable
//!                                                                        │
//!                                            broadcaster / repair ←──────┘
//!                                            (transit peers, endpoints)
//! ```
//!
//! ## Merge Rule
//!
//! Last-writer-wins by version: for a given identity the higher version
//! always replaces the lower, equal or lower is dropped, and the table's
//! logical clock advances only on accepted merges. Merging is commutative
//! and idempotent, so record order and duplication on the wire are
//! harmless.

pub mod messages;
pub mod node;
pub mod node_data;
pub mod table;
pub mod tasks;

pub use messages::{GetUpdates, MessageError, SyncMessage, Updates};
pub use node::{Node, NodeError, Sockets};
pub use node_data::{Addresses, NodeData, UNSET_ADDR};
pub use table::{SyncError, SyncTable};
pub use tasks::{run_gossip, sync_listener, sync_requester, GossipConfig};
