//! Password normalisation for the standard security handler.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::saslprep::saslprep;
use crate::error::Result;

/// Password padding constant (ISO 32000-1, algorithm 2).
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Longest prepared AES-256 password, in UTF-8 bytes.
pub const MAX_PREPARED_LEN: usize = 127;

/// Pad or truncate a legacy password to exactly 32 bytes.
///
/// Bytes past the 32nd are dropped; shorter passwords are completed with
/// the leading bytes of [`PASSWORD_PADDING`].
pub fn pad_password(password: &[u8]) -> Zeroizing<[u8; 32]> {
    let mut out = Zeroizing::new([0u8; 32]);
    let len = password.len().min(32);
    out[..len].copy_from_slice(&password[..len]);
    out[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    out
}

/// Byte encoding of a password for revisions 2 to 4.
///
/// Those revisions predate Unicode passwords: a password whose characters
/// all fit in Latin-1 is encoded one byte per character, anything else
/// falls back to its UTF-8 bytes.
pub fn legacy_password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    let latin1: Option<Vec<u8>> = password
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect();
    Zeroizing::new(latin1.unwrap_or_else(|| password.as_bytes().to_vec()))
}

/// SASLprep a password for revisions 5 and 6 and truncate it to
/// [`MAX_PREPARED_LEN`] bytes.
pub fn preprocess_password(password: &str) -> Result<Zeroizing<Vec<u8>>> {
    let prepared = Zeroizing::new(saslprep(password, true)?);
    let bytes = prepared.as_bytes();
    let len = bytes.len().min(MAX_PREPARED_LEN);
    Ok(Zeroizing::new(bytes[..len].to_vec()))
}

/// A user and an owner password, wiped from memory on drop.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    user: String,
    owner: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            owner: owner.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Replace the user password, wiping the previous one.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user.zeroize();
        self.user = user.into();
    }

    /// Replace the owner password, wiping the previous one.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner.zeroize();
        self.owner = owner.into();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &"<redacted>")
            .field("owner", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_empty_is_padding() {
        assert_eq!(*pad_password(b""), PASSWORD_PADDING);
    }

    #[test]
    fn pad_short_password() {
        let padded = pad_password(b"foo");
        assert_eq!(&padded[..3], b"foo");
        assert_eq!(&padded[3..], &PASSWORD_PADDING[..29]);
    }

    #[test]
    fn pad_truncates_long_password() {
        let long = [b'x'; 40];
        assert_eq!(*pad_password(&long), [b'x'; 32]);
    }

    #[test]
    fn legacy_bytes_prefer_latin1() {
        assert_eq!(*legacy_password_bytes("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(
            *legacy_password_bytes("\u{20AC}"),
            "\u{20AC}".as_bytes().to_vec()
        );
    }

    #[test]
    fn preprocess_truncates_to_127_bytes() {
        let long = "a".repeat(200);
        assert_eq!(preprocess_password(&long).unwrap().len(), MAX_PREPARED_LEN);
        assert!(preprocess_password("").unwrap().is_empty());
    }

    #[test]
    fn preprocess_rejects_prohibited() {
        assert!(matches!(
            preprocess_password("bad\u{0007}"),
            Err(crate::PdfError::InvalidPassword(_))
        ));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new("secret", "other");
        let shown = format!("{creds:?}");
        assert!(!shown.contains("secret"));
    }
}
