//! Membership records exchanged by the gossip protocol.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};
use shared_types::{vdf, Pubkey, VdfValue};

/// An endpoint that has not been learned yet. Peers advertising it for
/// replication are skipped by broadcast fan-out.
pub const UNSET_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// Seed for the producer reference and chain value of a fresh record, before
/// a real producer is learned. A hash of a fixed string can never collide
/// with a peer's Ed25519 identity, so fan-out never skips a real node.
const PLACEHOLDER_SEED: &[u8] = b"genesis";

/// The five UDP endpoints a node advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addresses {
    /// Membership sync traffic.
    pub gossip: SocketAddr,
    /// Broadcast block stream.
    pub replication: SocketAddr,
    /// Ledger query/messaging service.
    pub query: SocketAddr,
    /// Transaction ingress.
    pub transaction: SocketAddr,
    /// Missing-blob repair requests.
    pub repair: SocketAddr,
}

/// One node's advertised state, replicated to every other node.
///
/// Created once at node start and mutated only by its owner, which bumps
/// `version` on every change; everyone else holds read-only version-merged
/// copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Globally unique verification key.
    pub identity: Pubkey,
    /// Monotonic counter, bumped only by the owner.
    pub version: u64,
    pub addresses: Addresses,
    /// Identity of the block producer this node follows.
    pub producer: Pubkey,
    /// Last chain value this node considers valid.
    pub valid_chain_value: VdfValue,
    /// Display role, e.g. "producer" or "signer".
    pub node_type: String,
    /// Display name for logs.
    pub node_name: String,
}

impl NodeData {
    #[must_use]
    pub fn new(identity: Pubkey, node_type: &str, node_name: &str, addresses: Addresses) -> Self {
        let seed: VdfValue = vdf(PLACEHOLDER_SEED);
        Self {
            identity,
            version: 0,
            addresses,
            producer: Pubkey::new(seed),
            valid_chain_value: seed,
            node_type: node_type.to_owned(),
            node_name: node_name.to_owned(),
        }
    }

    /// True when this node can receive broadcast traffic.
    #[must_use]
    pub fn has_replication_endpoint(&self) -> bool {
        self.addresses.replication != UNSET_ADDR
    }
}
