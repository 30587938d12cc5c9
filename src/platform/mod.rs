//! Remote access to the audio platform.
//!
//! - [`client`] - JSON-over-HTTP calls with timeout and body size limit
//! - [`models`] - serde shapes of the platform's responses
//! - [`crypto`] - paid play URL decryption and session tokens

mod client;
mod crypto;
pub mod models;

pub use client::{build_http_client, Endpoints, PlatformClient, PlatformError};
pub use crypto::{decrypt_play_url, session_token, DecryptError};
