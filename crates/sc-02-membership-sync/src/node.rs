//! A node's socket bundle and advertised identity.

use std::sync::Arc;

use shared_types::KeyPair;
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::node_data::{Addresses, NodeData};

/// Errors that keep a node from starting. Nothing here is retried: a node
/// that cannot open its sockets has nothing to advertise.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to bind {role} socket: {source}")]
    Bind {
        role: &'static str,
        source: std::io::Error,
    },
    #[error("failed to read local address of {role} socket: {source}")]
    LocalAddr {
        role: &'static str,
        source: std::io::Error,
    },
}

/// The open sockets of a running node: the five advertised endpoints plus
/// dedicated send sockets, so each pump task owns exactly one socket role.
pub struct Sockets {
    /// Inbound gossip (advertised).
    pub gossip: Arc<UdpSocket>,
    /// Outbound gossip requests and replies.
    pub gossip_send: Arc<UdpSocket>,
    /// Inbound block stream (advertised).
    pub replication: Arc<UdpSocket>,
    /// Inbound repair requests (advertised).
    pub repair: Arc<UdpSocket>,
    /// Inbound transactions (advertised).
    pub transaction: Arc<UdpSocket>,
    /// Inbound ledger queries (advertised).
    pub query: Arc<UdpSocket>,
    /// Outbound relay traffic: broadcast, re-fan, repair requests and
    /// replies.
    pub relay_send: Arc<UdpSocket>,
}

/// A bound node: a fresh identity plus its advertised record and sockets.
pub struct Node {
    pub data: NodeData,
    pub sockets: Sockets,
}

impl Node {
    /// Bind all sockets on loopback ephemeral ports and build the record to
    /// gossip. Any bind failure is fatal; the node does not start.
    pub async fn bind(node_type: &str, node_name: &str) -> Result<Self, NodeError> {
        let gossip = bind_socket("gossip").await?;
        let gossip_send = bind_socket("gossip-send").await?;
        let replication = bind_socket("replication").await?;
        let repair = bind_socket("repair").await?;
        let transaction = bind_socket("transaction").await?;
        let query = bind_socket("query").await?;
        let relay_send = bind_socket("relay-send").await?;

        let addresses = Addresses {
            gossip: local_addr(&gossip, "gossip")?,
            replication: local_addr(&replication, "replication")?,
            query: local_addr(&query, "query")?,
            transaction: local_addr(&transaction, "transaction")?,
            repair: local_addr(&repair, "repair")?,
        };
        let identity = KeyPair::generate().public();
        let data = NodeData::new(identity, node_type, node_name, addresses);

        Ok(Self {
            data,
            sockets: Sockets {
                gossip,
                gossip_send,
                replication,
                repair,
                transaction,
                query,
                relay_send,
            },
        })
    }
}

async fn bind_socket(role: &'static str) -> Result<Arc<UdpSocket>, NodeError> {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .map(Arc::new)
        .map_err(|source| NodeError::Bind { role, source })
}

fn local_addr(socket: &UdpSocket, role: &'static str) -> Result<std::net::SocketAddr, NodeError> {
    socket
        .local_addr()
        .map_err(|source| NodeError::LocalAddr { role, source })
}
