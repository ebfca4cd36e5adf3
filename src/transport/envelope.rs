//! Transport envelope for an encrypted batch.
//!
//! Ciphertext is base64 encoded with the standard alphabet, then made
//! URL-safe (`+` → `-`, `/` → `_`, padding stripped) so it can travel inside
//! an `application/x-www-form-urlencoded` body untouched.
//!
//! # Body Format
//!
//! ```text
//! id=<sha256 hex of installation id>&batch=<url-safe base64>[&version=<v>]
//! ```

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;

// ============================================================================
// Constants
// ============================================================================

/// Content type of the collector POST body.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// Base64 Helpers
// ============================================================================

/// Rewrites a standard base64 string into its URL-safe, unpadded form.
///
/// Idempotent: already safe input comes back unchanged.
#[must_use]
pub fn make_url_safe(encoded: &str) -> String {
    encoded
        .chars()
        .filter(|&c| c != '=')
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

/// Encodes ciphertext as URL-safe unpadded base64.
#[must_use]
pub fn encode_ciphertext(ciphertext: &[u8]) -> String {
    make_url_safe(&Base64Standard.encode(ciphertext))
}

// ============================================================================
// FormBody
// ============================================================================

/// Fields of one collector submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormBody {
    /// Hex SHA-256 pseudonym of the installation id.
    pub id: String,
    /// URL-safe base64 ciphertext.
    pub batch: String,
    /// Optional client version.
    pub version: Option<String>,
}

impl FormBody {
    /// Creates a body without a version field.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, batch: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            batch: batch.into(),
            version: None,
        }
    }

    /// Adds the version field.
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Serializes the body as `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut body = format!(
            "id={}&batch={}",
            urlencoding::encode(&self.id),
            urlencoding::encode(&self.batch)
        );

        if let Some(version) = &self.version {
            body.push_str("&version=");
            body.push_str(&urlencoding::encode(version));
        }

        body
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_make_url_safe() {
        assert_eq!(make_url_safe("a+b/c=="), "a-b_c");
        assert_eq!(make_url_safe("a-b_c"), "a-b_c");
    }

    #[test]
    fn test_encode_ciphertext_known() {
        // standard: "+/+/" and "+/8=" ; url-safe: "-_-_" and "-_8"
        assert_eq!(encode_ciphertext(&[0xFB, 0xFF, 0xBF]), "-_-_");
        assert_eq!(encode_ciphertext(&[0xFB, 0xFF]), "-_8");
    }

    #[test]
    fn test_form_body_encode() {
        let body = FormBody::new("abc123", "-_x").with_version("0.1.0");
        assert_eq!(body.encode(), "id=abc123&batch=-_x&version=0.1.0");
    }

    #[test]
    fn test_form_body_without_version() {
        let body = FormBody::new("abc", "def");
        assert_eq!(body.encode(), "id=abc&batch=def");
    }

    #[test]
    fn test_form_body_escapes_version() {
        let body = FormBody::new("abc", "def").with_version("1.0 beta&x");
        assert_eq!(body.encode(), "id=abc&batch=def&version=1.0%20beta%26x");
    }

    proptest! {
        #[test]
        fn prop_ciphertext_alphabet_is_url_safe(bytes in prop::collection::vec(any::<u8>(), 0..300)) {
            let encoded = encode_ciphertext(&bytes);
            prop_assert!(!encoded.contains(['+', '/', '=']));
            prop_assert_eq!(make_url_safe(&encoded), encoded.clone());
            prop_assert_eq!(urlencoding::encode(&encoded).into_owned(), encoded);
        }
    }
}
