//! Iterated SHA-256 delay chain.
//!
//! The ledger timestamps blocks computationally: every block carries the
//! value of a hash chain advanced some number of iterations past its
//! predecessor. A long-running chain over the genuine history is evidence of
//! age, which lets nodes spot long-range forks without an external clock.
//! Transactions are folded into the chain with one extra iteration, which
//! timestamps them as well.

use sha2::{Digest, Sha256};

/// Size of a chain value in bytes.
pub const VDF_SIZE: usize = 32;

/// A single value of the delay chain.
pub type VdfValue = [u8; VDF_SIZE];

/// One iteration of the delay function.
#[must_use]
pub fn vdf(data: &[u8]) -> VdfValue {
    Sha256::digest(data).into()
}

/// One iteration that folds extra data into the chain.
#[must_use]
pub fn extended_vdf(data: &[u8], value: &VdfValue) -> VdfValue {
    let mut hasher = Sha256::new();
    hasher.update(value);
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vdf_is_deterministic() {
        assert_eq!(vdf(b"genesis"), vdf(b"genesis"));
        assert_ne!(vdf(b"genesis"), vdf(b"genesis1"));
    }

    #[test]
    fn test_extended_vdf_differs_from_plain() {
        let value = vdf(b"genesis");
        assert_ne!(extended_vdf(b"", &value), vdf(&value));
        assert_ne!(extended_vdf(b"tx", &value), extended_vdf(b"xt", &value));
    }

    #[test]
    fn test_chain_advances() {
        let mut value = vdf(b"genesis");
        let first = value;
        for _ in 0..10 {
            value = vdf(&value);
        }
        assert_ne!(first, value);
    }
}
