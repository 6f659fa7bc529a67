//! Cryptographic primitive bindings.
//!
//! This module contains:
//! - `aes`: AES-128/256-CBC with explicit key, IV and padding control
//! - `arcfour`: RC4 and its key-schedule cache
//! - `digest`: MD5 and SHA-2 helpers

pub mod aes;
pub mod arcfour;
pub mod digest;

// Re-export main functions for convenience
pub use aes::{
    AES_BLOCK_SIZE, AesCbcDecryptor, aes_cbc_decrypt, aes_cbc_decrypt_padded, aes_cbc_encrypt,
    aes_cbc_encrypt_padded, unpad_aes,
};
pub use arcfour::{Arcfour, Rc4ScheduleCache};
pub use digest::HashKind;
