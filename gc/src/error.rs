//! The five error kinds distinguished by the protocol.
//!
//! `anyhow::Error` carries context up through `?` everywhere in this crate;
//! callers that need to branch on the kind of failure (rather than just log
//! and exit) can match on [`GcError`] via `anyhow::Error::downcast_ref`.

use thiserror::Error;

/// Distinguished failure kinds, mirroring `MpcError`-style layering seen
/// elsewhere in the pack: a `thiserror` enum under `anyhow::Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GcError {
    /// Illegal flag combination, bit/identifier count mismatch, missing circuit file.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Malformed circuit file.
    #[error("parse error: {0}")]
    Parse(String),
    /// An evaluator or garbler supplies an identifier not in the circuit.
    #[error("input error: {0}")]
    Input(String),
    /// Mismatched or corrupt message, unexpected ACK, connection drop.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Authenticated decryption failed outside of classical ungarble's expected retry loop.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_prefix() {
        let err = GcError::Protocol("unexpected ACK".to_string());
        assert_eq!(err.to_string(), "protocol error: unexpected ACK");
    }
}
