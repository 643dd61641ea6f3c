//! Gossip wire messages.
//!
//! Every gossip payload is a one-byte type tag followed by a bincode body,
//! placed in the blob payload region. The tag dispatches; the body is a
//! plain record, so message handling is a match on a tagged union rather
//! than runtime type inspection.

use bincode::Error as BincodeError;
use serde::{Deserialize, Serialize};
use shared_types::Pubkey;
use thiserror::Error;

use sc_01_erasure_wire::{Blob, BLOB_PAYLOAD_SIZE};

use crate::node_data::NodeData;

const GET_UPDATES_TAG: u8 = 0;
const UPDATES_TAG: u8 = 1;

/// Pull request: "send me everything that changed after `since_clock`",
/// carrying the requester's own record so the peer learns it for free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetUpdates {
    pub since_clock: u64,
    pub requester: NodeData,
}

/// Pull response: the sender's identity and clock, plus the changed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Updates {
    pub from: Pubkey,
    pub clock: u64,
    pub records: Vec<NodeData>,
}

/// The gossip message set, keyed on the wire by the leading type byte.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    GetUpdates(GetUpdates),
    Updates(Updates),
}

/// Errors from gossip message encoding and decoding.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("empty gossip payload")]
    Empty,
    #[error("unknown gossip message tag {0}")]
    UnknownTag(u8),
    #[error("malformed gossip body: {0}")]
    Malformed(#[from] BincodeError),
    #[error("gossip message exceeds blob capacity: {0} bytes")]
    Oversized(usize),
}

impl SyncMessage {
    /// Frame this message into a blob payload. The caller addresses the
    /// blob.
    pub fn to_blob(&self) -> Result<Blob, MessageError> {
        let (tag, body) = match self {
            Self::GetUpdates(request) => (GET_UPDATES_TAG, bincode::serialize(request)?),
            Self::Updates(response) => (UPDATES_TAG, bincode::serialize(response)?),
        };
        if 1 + body.len() > BLOB_PAYLOAD_SIZE {
            return Err(MessageError::Oversized(1 + body.len()));
        }
        let mut payload = Vec::with_capacity(1 + body.len());
        payload.push(tag);
        payload.extend_from_slice(&body);
        let mut blob = Blob::new();
        blob.write_payload(&payload);
        Ok(blob)
    }

    /// Parse a blob payload back into a message.
    pub fn from_blob(blob: &Blob) -> Result<Self, MessageError> {
        let (&tag, body) = blob.payload().split_first().ok_or(MessageError::Empty)?;
        match tag {
            GET_UPDATES_TAG => Ok(Self::GetUpdates(bincode::deserialize(body)?)),
            UPDATES_TAG => Ok(Self::Updates(bincode::deserialize(body)?)),
            other => Err(MessageError::UnknownTag(other)),
        }
    }
}
