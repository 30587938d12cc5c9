//! Play URL de-obfuscation and per-batch session tokens.
//!
//! Paid play URLs arrive as URL-safe base64 of AES-128-ECB ciphertext
//! (PKCS#7 padded) under a key baked into the platform's web player.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyInit};
use aes::Aes128;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;
use uuid::Uuid;

/// `aaad3e4fd540b0f79dca95606e72bf93`
const PLAY_URL_KEY: [u8; 16] = [
    0xaa, 0xad, 0x3e, 0x4f, 0xd5, 0x40, 0xb0, 0xf7, 0x9d, 0xca, 0x95, 0x60, 0x6e, 0x72, 0xbf, 0x93,
];

const BLOCK_SIZE: usize = 16;

type PlayUrlDecryptor = ecb::Decryptor<Aes128>;

/// Standard alphabet, padding optional; the URL-safe characters are mapped back before decoding.
const CIPHER_TEXT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("Play URL is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Ciphertext length {0} is not a whole number of AES blocks")]
    BlockLength(usize),
    #[error("Invalid PKCS#7 padding")]
    Padding,
    #[error("Decrypted play URL is not valid UTF-8")]
    InvalidUtf8,
}

/// Recovers the playable URL from an obfuscated `playUrlList` entry.
pub fn decrypt_play_url(cipher_text: &str) -> Result<String, DecryptError> {
    let normalized = cipher_text.trim().replace('_', "/").replace('-', "+");
    let mut data = CIPHER_TEXT_ENGINE.decode(normalized.as_bytes())?;

    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(DecryptError::BlockLength(data.len()));
    }

    let plain_len = PlayUrlDecryptor::new(&PLAY_URL_KEY.into())
        .decrypt_padded_mut::<Pkcs7>(&mut data)
        .map_err(|_| DecryptError::Padding)?
        .len();
    data.truncate(plain_len);

    String::from_utf8(data).map_err(|_| DecryptError::InvalidUtf8)
}

/// Fresh UUID-shaped session identifier, one per paid-resolution batch.
pub fn session_token() -> String {
    Uuid::new_v4().to_string()
}
