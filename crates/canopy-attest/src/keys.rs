use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{AttestationError, Result};

pub const ED25519: &str = "ed25519";

/// Source of attestation signatures.
pub trait KeyProvider: Send + Sync {
    fn key_id(&self) -> &str;

    fn algorithm(&self) -> &str {
        ED25519
    }

    fn public_key_hex(&self) -> String;

    /// Sign `message`, returning the hex-encoded signature.
    fn sign(&self, message: &[u8]) -> Result<String>;
}

/// In-process Ed25519 signer.
pub struct Ed25519KeyProvider {
    key_id: String,
    signing_key: SigningKey,
}

impl Ed25519KeyProvider {
    /// Deterministic key from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self::from_seed(rand::random::<[u8; 32]>())
    }

    /// Provider around an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self {
            key_id: key_id_for(&signing_key.verifying_key()),
            signing_key,
        }
    }

    /// Override the derived key id.
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    /// Public half of the key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl KeyProvider for Ed25519KeyProvider {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    fn sign(&self, message: &[u8]) -> Result<String> {
        let signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| AttestationError::Signing(e.to_string()))?;
        Ok(hex::encode(signature.to_bytes()))
    }
}

impl fmt::Debug for Ed25519KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519KeyProvider")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Default key id: `ed25519:` plus the first 16 hex chars of the public
/// key's SHA-256.
pub fn key_id_for(key: &VerifyingKey) -> String {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    format!("{}:{}", ED25519, &digest[..16])
}

/// Parse a hex-encoded Ed25519 public key.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey> {
    let bytes = hex::decode(hex_key).map_err(|e| AttestationError::InvalidPublicKey(e.to_string()))?;
    let bytes: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AttestationError::InvalidPublicKey(format!("expected 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| AttestationError::InvalidPublicKey(e.to_string()))
}

/// Check a hex signature over `message`. The error string says what failed.
pub(crate) fn verify_hex_signature(
    key: &VerifyingKey,
    message: &[u8],
    signature_hex: &str,
) -> std::result::Result<(), String> {
    let bytes = hex::decode(signature_hex).map_err(|e| format!("signature is not hex: {}", e))?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected 64 signature bytes, got {}", bytes.len()))?;
    key.verify(message, &Signature::from_bytes(&bytes))
        .map_err(|_| "signature does not match manifest summary".to_string())
}
