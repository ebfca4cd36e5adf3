//! Encryption and delivery of flushed batches.
//!
//! # Transmission Flow
//!
//! ```text
//! ┌──────────────┐   encrypt    ┌────────────┐  base64url  ┌──────────┐  POST  ┌───────────┐
//! │ batch slice  │─────────────►│ ciphertext │────────────►│ FormBody │───────►│ Collector │
//! │ (≤ 240 B)    │  Encryptor   │            │  envelope   │ id,batch │  HTTPS │  (200 OK) │
//! └──────────────┘              └────────────┘             └──────────┘        └───────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cipher` | [`Encryptor`] capability and RSA implementation |
//! | `collector` | [`Collector`] capability and HTTPS implementation |
//! | `envelope` | URL-safe base64 and form body encoding |

// ============================================================================
// Submodules
// ============================================================================

/// Asymmetric encryption capability.
pub mod cipher;

/// Collector network client.
pub mod collector;

/// Ciphertext envelope and form body.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use cipher::{Encryptor, RsaEncryptor};
pub use collector::{Collector, HttpCollector};
pub use envelope::{FormBody, encode_ciphertext, make_url_safe};
