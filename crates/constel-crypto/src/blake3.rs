//! Domain-separated BLAKE3 hashing for Constellation.
//!
//! ## Modes
//!
//! - [`hash`] — Pure hashing: identities derived from public keys
//! - [`derive_key`] — Context-bound derivation: payload digests, account labels
//!
//! ## Context Strings
//!
//! Every digest is computed under one of the registered context strings in
//! [`contexts`]. A reward-claim signature can therefore never be replayed as
//! an onboarding signature or a yield attestation, even if the field bytes
//! happen to coincide.

/// Registered BLAKE3 context strings.
pub mod contexts {
    pub const YIELD_ATTESTATION: &str = "Constellation v1 yield-attestation";
    pub const REWARD_CLAIM: &str = "Constellation v1 reward-claim";
    pub const OPERATOR_ONBOARDING: &str = "Constellation v1 operator-onboarding";
    pub const ACCOUNT_LABEL: &str = "Constellation v1 account-label";
    pub const CONTRACT_IDENTITY: &str = "Constellation v1 contract-identity";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[
        YIELD_ATTESTATION,
        REWARD_CLAIM,
        OPERATOR_ONBOARDING,
        ACCOUNT_LABEL,
        CONTRACT_IDENTITY,
    ];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Constellation v1 ")
/// * `key_material` - The input bytes
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

/// Encode multiple fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
///
/// The length prefixes make the encoding injective: shifting bytes from one
/// field into its neighbour changes the output.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}

/// Canonical digest of a signed payload.
///
/// `derive_key(context, encode_multi_field(fields))`
pub fn payload_digest(context: &str, fields: &[&[u8]]) -> [u8; 32] {
    derive_key(context, &encode_multi_field(fields))
}
