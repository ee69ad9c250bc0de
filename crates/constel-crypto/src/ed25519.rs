//! Ed25519 signing and verification (RFC 8032).
//!
//! Ed25519 signs every authorization in the protocol:
//! - yield attestations from the oracle admin
//! - reward-claim grants from the admin server
//! - operator onboarding grants from the admin server
//!
//! Ed25519 has no public-key recovery, so a signature travels together with
//! the signer's verifying key as an [`Endorsement`]. Verifying the endorsement
//! yields the signer identity (`BLAKE3(public_key)`), which the caller then
//! checks against the role registry.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{CryptoError, Result};

/// An Ed25519 signing key (private key).
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&self.inner.to_bytes()),
        }
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

/// An Ed25519 verification key (public key).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// An Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

/// An Ed25519 keypair.
pub struct KeyPair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a signing key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }

    /// Get the corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(message),
        }
    }
}

impl VerifyingKey {
    /// Parse a verifying key, rejecting points that are not on the curve.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Get the raw bytes of this verifying key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify(message, &signature.inner)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Get the raw bytes of this signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

impl KeyPair {
    /// Generate a new random Ed25519 keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate();
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create a keypair from a signing key's raw bytes.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// The identity controlled by this keypair.
    pub fn identity(&self) -> [u8; 32] {
        derive_identity(&self.verifying_key)
    }

    /// Sign a payload digest and bundle the signature with our public key.
    pub fn endorse(&self, digest: &[u8; 32]) -> Endorsement {
        Endorsement {
            signer: self.verifying_key.clone(),
            signature: self.signing_key.sign(digest),
        }
    }
}

/// Derive an account identity from a public key.
///
/// `identity = BLAKE3::hash(public_key)`
pub fn derive_identity(public_key: &VerifyingKey) -> [u8; 32] {
    crate::blake3::hash(public_key.as_bytes())
}

/// A signature over a payload digest, together with the claimed signer key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endorsement {
    pub signer: VerifyingKey,
    pub signature: Signature,
}

impl Endorsement {
    /// Verify the endorsement over `digest` and return the signer identity.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::SignatureVerification`] if the signature does not
    ///   match `digest` under the carried key
    pub fn signer_identity(&self, digest: &[u8; 32]) -> Result<[u8; 32]> {
        self.signer.verify(digest, &self.signature)?;
        Ok(derive_identity(&self.signer))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public", &self.verifying_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = KeyPair::generate();
        let msg = b"Constellation test";
        let sig = kp.signing_key.sign(msg);
        assert!(kp.verifying_key.verify(msg, &sig).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = KeyPair::generate();
        let sig = kp.signing_key.sign(b"correct message");
        assert!(kp.verifying_key.verify(b"wrong message", &sig).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let sig = kp1.signing_key.sign(b"test");
        assert!(kp2.verifying_key.verify(b"test", &sig).is_err());
    }

    #[test]
    fn test_rfc8032_test1() {
        let secret =
            hex_literal::hex!("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60");
        let kp = KeyPair::from_bytes(&secret);
        assert_eq!(
            kp.verifying_key.to_bytes(),
            hex_literal::hex!("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
        );

        let sig = kp.signing_key.sign(b"");
        assert_eq!(
            sig.to_bytes(),
            hex_literal::hex!(
                "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b"
            )
        );
    }

    #[test]
    fn test_identity_is_hash_of_public_key() {
        let kp = KeyPair::from_bytes(&[42u8; 32]);
        assert_eq!(kp.identity(), crate::blake3::hash(kp.verifying_key.as_bytes()));
        assert_ne!(kp.identity(), KeyPair::from_bytes(&[43u8; 32]).identity());
    }

    #[test]
    fn test_endorsement_yields_signer() {
        let kp = KeyPair::generate();
        let digest = crate::blake3::hash(b"payload");
        let endorsement = kp.endorse(&digest);
        let signer = endorsement.signer_identity(&digest).expect("valid endorsement");
        assert_eq!(signer, kp.identity());
    }

    #[test]
    fn test_endorsement_rejects_other_digest() {
        let kp = KeyPair::generate();
        let endorsement = kp.endorse(&crate::blake3::hash(b"payload"));
        let other = crate::blake3::hash(b"other payload");
        assert!(matches!(
            endorsement.signer_identity(&other),
            Err(CryptoError::SignatureVerification)
        ));
    }

    #[test]
    fn test_endorsement_with_swapped_signer_fails() {
        let honest = KeyPair::generate();
        let impostor = KeyPair::generate();
        let digest = crate::blake3::hash(b"payload");
        let mut endorsement = honest.endorse(&digest);
        endorsement.signer = impostor.verifying_key.clone();
        assert!(endorsement.signer_identity(&digest).is_err());
    }

    #[test]
    fn test_verifying_key_bytes_roundtrip() {
        let kp = KeyPair::from_bytes(&[9u8; 32]);
        let parsed = VerifyingKey::from_bytes(kp.verifying_key.as_bytes()).expect("valid point");
        assert_eq!(parsed, kp.verifying_key);
    }

    #[test]
    fn test_endorsement_json_roundtrip() {
        let kp = KeyPair::from_bytes(&[7u8; 32]);
        let endorsement = kp.endorse(&[1u8; 32]);
        let json = serde_json::to_string(&endorsement).expect("serialize");
        let restored: Endorsement = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, endorsement);
    }
}
