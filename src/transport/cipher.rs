//! Asymmetric encryption capability.
//!
//! The pipeline treats the cipher as an opaque `encrypt(bytes) -> bytes`
//! primitive behind the [`Encryptor`] trait. [`RsaEncryptor`] is the stock
//! implementation: RSA with PKCS#1 v1.5 padding under the collector's public
//! key.

// ============================================================================
// Imports
// ============================================================================

use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Bytes of PKCS#1 v1.5 encryption padding overhead.
pub const PKCS1_PADDING_OVERHEAD: usize = 11;

// ============================================================================
// Encryptor Trait
// ============================================================================

/// One-shot asymmetric encryption of a flushed batch.
pub trait Encryptor: Send + Sync {
    /// Encrypts `plaintext` into a single ciphertext block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encryption`] if the plaintext is too long or the
    /// cipher fails.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Returns the largest plaintext accepted by [`encrypt`](Self::encrypt).
    ///
    /// The batch flush threshold must not exceed this.
    fn max_plaintext_len(&self) -> usize;
}

// ============================================================================
// RsaEncryptor
// ============================================================================

/// RSA PKCS#1 v1.5 encryptor for a fixed public key.
#[derive(Debug, Clone)]
pub struct RsaEncryptor {
    key: RsaPublicKey,
}

impl RsaEncryptor {
    /// Wraps an existing public key.
    #[inline]
    #[must_use]
    pub fn new(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Builds the key from hex-encoded modulus and public exponent.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let encryptor = RsaEncryptor::from_hex_components(MODULUS_HEX, "10001")?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either component is not hex or the key
    /// is rejected.
    pub fn from_hex_components(modulus: &str, exponent: &str) -> Result<Self> {
        let n = parse_hex(modulus, "modulus")?;
        let e = parse_hex(exponent, "exponent")?;

        let key = RsaPublicKey::new(n, e)
            .map_err(|err| Error::config(format!("Invalid RSA public key: {err}")))?;

        Ok(Self { key })
    }

    /// Returns the key size in bytes.
    #[inline]
    #[must_use]
    pub fn key_size(&self) -> usize {
        self.key.size()
    }
}

impl Encryptor for RsaEncryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        if plaintext.len() > self.max_plaintext_len() {
            return Err(Error::encryption(format!(
                "Plaintext of {} bytes exceeds limit {}",
                plaintext.len(),
                self.max_plaintext_len()
            )));
        }

        let mut rng = rand::thread_rng();
        let ciphertext = self
            .key
            .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| Error::encryption(e.to_string()))?;

        trace!(
            plaintext = plaintext.len(),
            ciphertext = ciphertext.len(),
            "Batch encrypted"
        );
        Ok(ciphertext)
    }

    fn max_plaintext_len(&self) -> usize {
        self.key_size().saturating_sub(PKCS1_PADDING_OVERHEAD)
    }
}

fn parse_hex(value: &str, what: &str) -> Result<BigUint> {
    let digits = value.trim();
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| Error::config(format!("RSA {what} is not valid hex")))
}

// ============================================================================
// Tests
// ============================================================================
