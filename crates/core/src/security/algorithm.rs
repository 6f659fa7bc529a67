//! Encryption algorithms and the options for encrypting a new document.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use super::permissions::Permissions;
use crate::error::{PdfError, Result};

/// Encryption algorithm of a standard security handler.
///
/// Fixed for the lifetime of a handler; it determines the key length,
/// the revision and the key derivation in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// RC4 with a 40-bit key (`V 1`).
    Rc4V1,
    /// RC4 with a 40 to 128-bit key (`V 2`).
    Rc4V2,
    /// AES-128 (`V 4`, crypt filter `AESV2`).
    AesV2,
    /// AES-256, revision 5 (Adobe extension level 3).
    AesV3R5,
    /// AES-256, revision 6 (ISO 32000-2).
    AesV3R6,
}

impl EncryptionAlgorithm {
    pub const ALL: [Self; 5] = [
        Self::Rc4V1,
        Self::Rc4V2,
        Self::AesV2,
        Self::AesV3R5,
        Self::AesV3R6,
    ];

    /// Revision (`/R`) written for a new document.
    ///
    /// Legacy algorithms that leave metadata unencrypted need crypt filters
    /// and are written as revision 4 instead.
    pub const fn revision(self, encrypt_metadata: bool) -> u8 {
        match self {
            Self::Rc4V1 => 2,
            Self::Rc4V2 if encrypt_metadata => 3,
            Self::Rc4V2 | Self::AesV2 => 4,
            Self::AesV3R5 => 5,
            Self::AesV3R6 => 6,
        }
    }

    /// Key length in bits used when none is requested.
    pub const fn default_key_bits(self) -> u32 {
        match self {
            Self::Rc4V1 => 40,
            Self::Rc4V2 | Self::AesV2 => 128,
            Self::AesV3R5 | Self::AesV3R6 => 256,
        }
    }

    /// Check a requested key length for a new document.
    pub fn validate_key_bits(self, bits: u32) -> Result<u32> {
        let ok = match self {
            Self::Rc4V1 => bits == 40,
            Self::Rc4V2 => (40..=128).contains(&bits) && bits % 8 == 0,
            Self::AesV2 => bits == 128,
            Self::AesV3R5 | Self::AesV3R6 => bits == 256,
        };
        if ok {
            Ok(bits)
        } else {
            Err(PdfError::InvalidEncryptionDict(format!(
                "invalid key length {bits} bits for {self}"
            )))
        }
    }

    pub const fn is_rc4(self) -> bool {
        matches!(self, Self::Rc4V1 | Self::Rc4V2)
    }

    pub const fn is_aes(self) -> bool {
        !self.is_rc4()
    }

    /// Algorithms whose keys derive from MD5 (revisions 2 to 4).
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Rc4V1 | Self::Rc4V2 | Self::AesV2)
    }

    pub const fn flag(self) -> AlgorithmSet {
        match self {
            Self::Rc4V1 => AlgorithmSet::RC4V1,
            Self::Rc4V2 => AlgorithmSet::RC4V2,
            Self::AesV2 => AlgorithmSet::AESV2,
            Self::AesV3R5 => AlgorithmSet::AESV3R5,
            Self::AesV3R6 => AlgorithmSet::AESV3R6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rc4V1 => "RC4V1",
            Self::Rc4V2 => "RC4V2",
            Self::AesV2 => "AESV2",
            Self::AesV3R5 => "AESV3R5",
            Self::AesV3R6 => "AESV3R6",
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PdfError::UnsupportedFilter(format!("unknown algorithm: {wanted}")))
    }
}

bitflags! {
    /// A set of [`EncryptionAlgorithm`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AlgorithmSet: u8 {
        const RC4V1 = 1 << 0;
        const RC4V2 = 1 << 1;
        const AESV2 = 1 << 2;
        const AESV3R5 = 1 << 3;
        const AESV3R6 = 1 << 4;

        const RC4 = Self::RC4V1.bits() | Self::RC4V2.bits();
        const AES = Self::AESV2.bits() | Self::AESV3R5.bits() | Self::AESV3R6.bits();
    }
}

impl AlgorithmSet {
    pub const fn supports(self, algorithm: EncryptionAlgorithm) -> bool {
        self.contains(algorithm.flag())
    }

    /// Members of the set, in [`EncryptionAlgorithm::ALL`] order.
    pub fn algorithms(self) -> impl Iterator<Item = EncryptionAlgorithm> {
        EncryptionAlgorithm::ALL
            .into_iter()
            .filter(move |alg| self.supports(*alg))
    }
}

/// Settings for encrypting a new document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptOptions {
    pub algorithm: EncryptionAlgorithm,
    /// Key length in bits; `None` picks the algorithm's default.
    pub key_length: Option<u32>,
    pub permissions: Permissions,
    pub encrypt_metadata: bool,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            algorithm: EncryptionAlgorithm::AesV3R6,
            key_length: None,
            permissions: Permissions::all(),
            encrypt_metadata: true,
        }
    }
}

impl EncryptOptions {
    pub fn new(algorithm: EncryptionAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_key_length(mut self, bits: u32) -> Self {
        self.key_length = Some(bits);
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn with_encrypt_metadata(mut self, encrypt_metadata: bool) -> Self {
        self.encrypt_metadata = encrypt_metadata;
        self
    }

    /// The validated key length in bytes.
    pub fn key_bytes(&self) -> Result<usize> {
        let bits = self
            .algorithm
            .validate_key_bits(self.key_length.unwrap_or(self.algorithm.default_key_bits()))?;
        Ok((bits / 8) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_length_rules() {
        use EncryptionAlgorithm::*;
        assert!(Rc4V1.validate_key_bits(40).is_ok());
        assert!(Rc4V1.validate_key_bits(48).is_err());
        assert!(Rc4V2.validate_key_bits(40).is_ok());
        assert!(Rc4V2.validate_key_bits(96).is_ok());
        assert!(Rc4V2.validate_key_bits(100).is_err());
        assert!(Rc4V2.validate_key_bits(136).is_err());
        assert!(AesV2.validate_key_bits(256).is_err());
        assert!(AesV3R6.validate_key_bits(128).is_err());
    }

    #[test]
    fn revisions() {
        use EncryptionAlgorithm::*;
        assert_eq!(Rc4V1.revision(true), 2);
        assert_eq!(Rc4V2.revision(true), 3);
        assert_eq!(Rc4V2.revision(false), 4);
        assert_eq!(AesV2.revision(true), 4);
        assert_eq!(AesV3R5.revision(true), 5);
        assert_eq!(AesV3R6.revision(false), 6);
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "aesv3r6".parse::<EncryptionAlgorithm>().unwrap(),
            EncryptionAlgorithm::AesV3R6
        );
        assert!("des".parse::<EncryptionAlgorithm>().is_err());
    }

    #[test]
    fn options_default_key_bytes() {
        assert_eq!(EncryptOptions::default().key_bytes().unwrap(), 32);
        assert_eq!(
            EncryptOptions::new(EncryptionAlgorithm::Rc4V2)
                .with_key_length(56)
                .key_bytes()
                .unwrap(),
            7
        );
    }

    #[test]
    fn set_iteration() {
        let algs: Vec<_> = AlgorithmSet::AES.algorithms().collect();
        assert_eq!(
            algs,
            vec![
                EncryptionAlgorithm::AesV2,
                EncryptionAlgorithm::AesV3R5,
                EncryptionAlgorithm::AesV3R6
            ]
        );
    }
}
