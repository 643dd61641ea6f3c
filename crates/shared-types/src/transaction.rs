//! Token-transfer transactions and their bit-exact wire form.

use thiserror::Error;

use crate::keys::{verify_signature, KeyPair, Pubkey, Signature};
use crate::vdf::{VdfValue, VDF_SIZE};

/// Serialized transaction size: signature, sender, recipient, token amount,
/// fee, and the chain value the sender considered valid at submission.
pub const TRANSACTION_SIZE: usize = 64 + Pubkey::LEN * 2 + 8 + 8 + VDF_SIZE;

/// Errors from the fixed-layout wire codecs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
}

/// A token transfer from one account to another.
///
/// The `valid_chain_value` pins the transfer to a chain value the sender
/// observed, which bounds how long a signed transaction stays replayable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub from: Pubkey,
    pub to: Pubkey,
    pub token: i64,
    pub fee: i64,
    pub valid_chain_value: VdfValue,
    pub signature: Signature,
}

impl Transaction {
    /// Create and sign a transfer.
    #[must_use]
    pub fn new(
        from: &KeyPair,
        to: Pubkey,
        token: i64,
        fee: i64,
        valid_chain_value: VdfValue,
    ) -> Self {
        let mut transaction = Self {
            from: from.public(),
            to,
            token,
            fee,
            valid_chain_value,
            signature: [0u8; 64],
        };
        transaction.signature = from.sign(&transaction.sign_data());
        transaction
    }

    /// The byte string covered by the signature: sender, recipient, token
    /// amount, fee, chain value.
    fn sign_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(TRANSACTION_SIZE - 64);
        data.extend_from_slice(self.from.as_bytes());
        data.extend_from_slice(self.to.as_bytes());
        data.extend_from_slice(&self.token.to_be_bytes());
        data.extend_from_slice(&self.fee.to_be_bytes());
        data.extend_from_slice(&self.valid_chain_value);
        data
    }

    /// Check the Ed25519 signature against the sender key.
    #[must_use]
    pub fn verify_signature(&self) -> bool {
        verify_signature(&self.from, &self.sign_data(), &self.signature)
    }

    /// Wire form: signature, sender, recipient, token (big-endian), fee
    /// (big-endian), chain value.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; TRANSACTION_SIZE] {
        let mut buf = [0u8; TRANSACTION_SIZE];
        buf[..64].copy_from_slice(&self.signature);
        buf[64..96].copy_from_slice(self.from.as_bytes());
        buf[96..128].copy_from_slice(self.to.as_bytes());
        buf[128..136].copy_from_slice(&self.token.to_be_bytes());
        buf[136..144].copy_from_slice(&self.fee.to_be_bytes());
        buf[144..176].copy_from_slice(&self.valid_chain_value);
        buf
    }

    /// Inverse of [`Transaction::to_bytes`]; reads exactly
    /// [`TRANSACTION_SIZE`] bytes from the front of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < TRANSACTION_SIZE {
            return Err(WireError::Truncated {
                need: TRANSACTION_SIZE,
                have: buf.len(),
            });
        }
        let mut signature = [0u8; 64];
        signature.copy_from_slice(&buf[..64]);
        let mut from = [0u8; 32];
        from.copy_from_slice(&buf[64..96]);
        let mut to = [0u8; 32];
        to.copy_from_slice(&buf[96..128]);
        let mut token = [0u8; 8];
        token.copy_from_slice(&buf[128..136]);
        let mut fee = [0u8; 8];
        fee.copy_from_slice(&buf[136..144]);
        let mut valid_chain_value = [0u8; VDF_SIZE];
        valid_chain_value.copy_from_slice(&buf[144..176]);
        Ok(Self {
            from: Pubkey::new(from),
            to: Pubkey::new(to),
            token: i64::from_be_bytes(token),
            fee: i64::from_be_bytes(fee),
            valid_chain_value,
            signature,
        })
    }
}
