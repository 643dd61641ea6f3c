//! # Signet-Chain Test Suite
//!
//! Multi-node integration tests for the block propagation layer: gossip
//! convergence over real localhost UDP sockets, and producer-to-signer
//! block delivery through the erasure-coded relay.
//!
//! Subsystem-level behavior is tested inside each crate; this suite only
//! covers what needs several nodes talking over real sockets.

pub mod integration;

/// Install the test log subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
