//! The replicated membership table.
//!
//! One exclusive lock protects the whole table; every accessor copies data
//! out under it, so no caller ever observes lock-protected state after
//! release. The table keeps three pieces of bookkeeping besides the records:
//! a logical clock advanced on every accepted merge, a per-identity
//! changed-at-clock map answering "what changed since clock X", and a
//! per-peer map of the last clock each peer reported, which seeds the next
//! pull request to that peer.

use std::collections::HashMap;
use std::net::SocketAddr;

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use shared_types::Pubkey;
use thiserror::Error;
use tracing::debug;

use crate::messages::{GetUpdates, Updates};
use crate::node_data::NodeData;

/// Errors from membership table construction and peer selection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("own record must start at version 0, got {0}")]
    NonZeroVersion(u64),
    #[error("membership table too small for peer selection")]
    TableTooSmall,
}

#[derive(Debug)]
struct TableState {
    table: HashMap<Pubkey, NodeData>,
    changed_at: HashMap<Pubkey, u64>,
    peer_clocks: HashMap<Pubkey, u64>,
    clock: u64,
}

/// The shared membership table. Cheap to share as `Arc<SyncTable>` across
/// the gossip, broadcast, and repair tasks.
#[derive(Debug)]
pub struct SyncTable {
    me: Pubkey,
    state: RwLock<TableState>,
}

impl SyncTable {
    /// Build a table seeded with the local node's own record.
    ///
    /// The record must be fresh: a non-zero version means it was merged from
    /// somewhere else, which would let this node clobber its former self.
    pub fn new(me: NodeData) -> Result<Self, SyncError> {
        if me.version != 0 {
            return Err(SyncError::NonZeroVersion(me.version));
        }
        let identity = me.identity;
        let mut table = HashMap::new();
        let mut changed_at = HashMap::new();
        changed_at.insert(identity, 1);
        table.insert(identity, me);
        Ok(Self {
            me: identity,
            state: RwLock::new(TableState {
                table,
                changed_at,
                peer_clocks: HashMap::new(),
                clock: 1,
            }),
        })
    }

    /// The local node's identity.
    #[must_use]
    pub fn identity(&self) -> Pubkey {
        self.me
    }

    /// Merge one record, last-writer-wins by version.
    pub fn insert(&self, record: NodeData) {
        self.state.write().insert(record);
    }

    /// Owned copy of the local node's record.
    #[must_use]
    pub fn my_copy(&self) -> NodeData {
        // own record is inserted at construction and never removed
        self.state.read().table[&self.me].clone()
    }

    /// Owned copy of the whole table.
    #[must_use]
    pub fn table_copy(&self) -> HashMap<Pubkey, NodeData> {
        self.state.read().table.clone()
    }

    /// Owned copies of the records learned from peers that have reported a
    /// clock, plus the local record.
    #[must_use]
    pub fn remote_table_copy(&self) -> HashMap<Pubkey, NodeData> {
        let state = self.state.read();
        let mut result: HashMap<Pubkey, NodeData> = state
            .table
            .iter()
            .filter(|(identity, _)| state.peer_clocks.contains_key(identity))
            .map(|(identity, record)| (*identity, record.clone()))
            .collect();
        result.insert(self.me, state.table[&self.me].clone());
        result
    }

    /// A uniformly random non-self record.
    pub fn random_node(&self) -> Result<NodeData, SyncError> {
        let state = self.state.read();
        state.random_peer(&self.me).cloned()
    }

    /// Pick a random peer and build the pull request for it: "everything
    /// changed since the clock you last reported to me" (0 if it never has).
    /// Returns the peer's gossip endpoint alongside the request, or `None`
    /// while the table only knows the local node.
    #[must_use]
    pub fn request_sync(&self) -> Option<(SocketAddr, GetUpdates)> {
        let state = self.state.read();
        let peer = state.random_peer(&self.me).ok()?;
        let since_clock = state.peer_clocks.get(&peer.identity).copied().unwrap_or(0);
        let request = GetUpdates {
            since_clock,
            requester: state.table[&self.me].clone(),
        };
        Some((peer.addresses.gossip, request))
    }

    /// Own identity, own clock, and owned copies of every record whose
    /// changed-at-clock exceeds `clock`.
    #[must_use]
    pub fn updates_since(&self, clock: u64) -> (Pubkey, u64, Vec<NodeData>) {
        let state = self.state.read();
        let records = state
            .table
            .values()
            .filter(|record| {
                state
                    .changed_at
                    .get(&record.identity)
                    .is_some_and(|&changed| changed > clock)
            })
            .cloned()
            .collect();
        (self.me, state.clock, records)
    }

    /// Merge a peer's update batch and remember the clock it reported.
    pub fn update(&self, updates: Updates) {
        let mut state = self.state.write();
        debug!(from = %updates.from, count = updates.records.len(), "merging update batch");
        for record in updates.records {
            state.insert(record);
        }
        state.peer_clocks.insert(updates.from, updates.clock);
    }

    /// min(number of peers that reported a clock, smallest reported clock).
    ///
    /// Convergence checks gate on this value reaching the cluster size,
    /// which holds because a synced peer's clock is at least the number of
    /// records it merged.
    #[must_use]
    pub fn connected_nodes(&self) -> u64 {
        let state = self.state.read();
        let mut result = state.peer_clocks.len() as u64;
        for &clock in state.peer_clocks.values() {
            if result > clock {
                result = clock;
            }
        }
        result
    }

    /// Owned copies of every record except `who`'s.
    #[must_use]
    pub fn nodes_except(&self, who: &Pubkey) -> Vec<NodeData> {
        self.state
            .read()
            .table
            .values()
            .filter(|record| record.identity != *who)
            .cloned()
            .collect()
    }

    /// Peers eligible for broadcast traffic: everyone except the local node
    /// and the current producer, skipping peers with no replication
    /// endpoint.
    #[must_use]
    pub fn transit_nodes(&self) -> Vec<NodeData> {
        let state = self.state.read();
        let producer = state.table[&self.me].producer;
        state
            .table
            .values()
            .filter(|record| {
                record.identity != self.me
                    && record.identity != producer
                    && record.has_replication_endpoint()
            })
            .cloned()
            .collect()
    }

    /// Owned copy of the current producer's record, if known.
    #[must_use]
    pub fn producer_node(&self) -> Option<NodeData> {
        let state = self.state.read();
        let producer = state.table[&self.me].producer;
        state.table.get(&producer).cloned()
    }

    /// Point the local record at a new producer, bumping its version so the
    /// change gossips out.
    pub fn change_producer(&self, key: Pubkey) {
        let mut state = self.state.write();
        let mut mine = state.table[&self.me].clone();
        debug!(old = %mine.producer, new = %key, "updating producer");
        mine.producer = key;
        mine.version += 1;
        state.insert(mine);
    }
}

impl TableState {
    fn insert(&mut self, record: NodeData) {
        let accept = self
            .table
            .get(&record.identity)
            .is_none_or(|existing| record.version > existing.version);
        if accept {
            debug!(identity = %record.identity, version = record.version, "merged record");
            self.clock += 1;
            self.changed_at.insert(record.identity, self.clock);
            self.table.insert(record.identity, record);
        } else {
            debug!(identity = %record.identity, version = record.version, "stale record dropped");
        }
    }

    fn random_peer(&self, me: &Pubkey) -> Result<&NodeData, SyncError> {
        if self.table.len() < 2 {
            return Err(SyncError::TableTooSmall);
        }
        let peers: Vec<&NodeData> = self
            .table
            .values()
            .filter(|record| record.identity != *me)
            .collect();
        peers
            .choose(&mut rand::thread_rng())
            .copied()
            .ok_or(SyncError::TableTooSmall)
    }
}
