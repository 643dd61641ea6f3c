//! # Shared Types Crate
//!
//! Ledger domain entities shared by every Signet-Chain subsystem: node
//! identities and keypairs, the iterated-SHA-256 delay chain used for
//! computational timestamping, token-transfer transactions with their
//! bit-exact wire form, and blocks.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-subsystem ledger type is
//!   defined here, never redeclared per subsystem.
//! - **Bit-exact wire forms**: transactions and blocks serialize by hand to
//!   fixed layouts (big-endian integers, fixed offsets); generic
//!   serialization is reserved for control-plane records.

pub mod block;
pub mod keys;
pub mod transaction;
pub mod vdf;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use block::Block;
pub use keys::{verify_signature, KeyPair, Pubkey, Signature};
pub use transaction::{Transaction, WireError, TRANSACTION_SIZE};
pub use vdf::{extended_vdf, vdf, VdfValue, VDF_SIZE};
