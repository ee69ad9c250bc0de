//! # constel-crypto
//!
//! Cryptographic primitives for the Constellation accounting core.
//!
//! The suite is fixed: Ed25519 signatures over domain-separated BLAKE3
//! digests. Every signed payload in the protocol is reduced to one canonical
//! digest, so any divergence in a bound field (target contract, chain,
//! nonce, amount) surfaces as a signature that fails to verify.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing and payload digests
//! - [`ed25519`] — Ed25519 signing, verification and signer endorsements

pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
