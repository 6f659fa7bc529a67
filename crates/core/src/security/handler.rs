//! The standard security handler.
//!
//! [`PdfEncrypt`] is closed over the three algorithm families. Each variant
//! derives keys, authenticates, and encrypts or decrypts object data, one
//! shot or streamed; dispatch is a plain `match`.

use std::io::{Read, Write};

use rand::{CryptoRng, RngCore};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::aesv3::AesV3Parameters;
use super::algorithm::{EncryptOptions, EncryptionAlgorithm};
use super::context::{AuthResult, EncryptionContext};
use super::legacy::LegacyParameters;
use super::password::Credentials;
use super::permissions::Permissions;
use super::provider::CryptoProvider;
use super::stream::{AesDecryptReader, DecryptReader, Rc4DecryptReader, Rc4EncryptWriter};
use crate::codec::aes::{AES_BLOCK_SIZE, aes_cbc_decrypt_padded, aes_cbc_encrypt_padded};
use crate::codec::arcfour::Arcfour;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFObjRef;

/// A standard security handler for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfEncrypt {
    /// RC4, 40 to 128-bit (revisions 2 to 4).
    Rc4(LegacyParameters),
    /// AES-128 (revision 4).
    AesV2(LegacyParameters),
    /// AES-256 (revisions 5 and 6).
    AesV3(AesV3Parameters),
}

impl PdfEncrypt {
    /// Create parameters for a new document and a context holding its key.
    ///
    /// The context is authenticated as [`AuthResult::Owner`].
    pub fn create(
        credentials: &Credentials,
        options: &EncryptOptions,
        document_id: &[u8],
        provider: &CryptoProvider,
    ) -> Result<(Self, EncryptionContext)> {
        let mut ctx = EncryptionContext::new(document_id);
        let (handler, key) =
            Self::create_with_rng(credentials, options, document_id, provider, ctx.rng())?;
        ctx.set_key(key, AuthResult::Owner);
        Ok((handler, ctx))
    }

    /// Like [`create`](Self::create), drawing AES-256 keys and salts from
    /// `rng` and returning the file key instead of a context.
    pub fn create_with_rng<R: RngCore + CryptoRng>(
        credentials: &Credentials,
        options: &EncryptOptions,
        document_id: &[u8],
        provider: &CryptoProvider,
        rng: &mut R,
    ) -> Result<(Self, Zeroizing<Vec<u8>>)> {
        let algorithm = options.algorithm;
        provider.require(algorithm)?;
        let key_length = options.key_bytes()?;
        if algorithm == EncryptionAlgorithm::Rc4V1 && !options.encrypt_metadata {
            return Err(PdfError::InvalidEncryptionDict(
                "RC4V1 cannot leave metadata unencrypted".into(),
            ));
        }
        let p = options.permissions.p_value();

        let (handler, key) = match algorithm {
            EncryptionAlgorithm::Rc4V1
            | EncryptionAlgorithm::Rc4V2
            | EncryptionAlgorithm::AesV2 => {
                let (params, key) = LegacyParameters::generate(
                    algorithm,
                    credentials.user(),
                    credentials.owner(),
                    key_length,
                    p,
                    options.encrypt_metadata,
                    document_id,
                );
                let handler = if algorithm == EncryptionAlgorithm::AesV2 {
                    Self::AesV2(params)
                } else {
                    Self::Rc4(params)
                };
                (handler, key)
            }
            EncryptionAlgorithm::AesV3R5 | EncryptionAlgorithm::AesV3R6 => {
                let (params, key) = AesV3Parameters::generate(
                    algorithm.revision(options.encrypt_metadata),
                    credentials.user(),
                    credentials.owner(),
                    p,
                    options.encrypt_metadata,
                    rng,
                )?;
                (Self::AesV3(params), key)
            }
        };
        info!(
            algorithm = %algorithm,
            key_bits = key_length * 8,
            "created encryption parameters"
        );
        Ok((handler, key))
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => p.algorithm,
            Self::AesV3(p) if p.revision == 5 => EncryptionAlgorithm::AesV3R5,
            Self::AesV3(_) => EncryptionAlgorithm::AesV3R6,
        }
    }

    /// `/R`.
    pub fn revision(&self) -> u8 {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => p.revision,
            Self::AesV3(p) => p.revision,
        }
    }

    /// File key length in bits.
    pub fn key_length(&self) -> u32 {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => (p.key_length * 8) as u32,
            Self::AesV3(_) => 256,
        }
    }

    /// Raw `/P` bits.
    pub fn p_value(&self) -> u32 {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => p.p,
            Self::AesV3(p) => p.p,
        }
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_p_value(self.p_value())
    }

    pub fn is_allowed(&self, permission: Permissions) -> bool {
        self.permissions().contains(permission)
    }

    pub fn is_print_allowed(&self) -> bool {
        self.is_allowed(Permissions::PRINT)
    }

    pub fn is_edit_allowed(&self) -> bool {
        self.is_allowed(Permissions::EDIT)
    }

    pub fn is_copy_allowed(&self) -> bool {
        self.is_allowed(Permissions::COPY)
    }

    pub fn is_edit_notes_allowed(&self) -> bool {
        self.is_allowed(Permissions::EDIT_NOTES)
    }

    pub fn is_fill_and_sign_allowed(&self) -> bool {
        self.is_allowed(Permissions::FILL_AND_SIGN)
    }

    pub fn is_accessibility_allowed(&self) -> bool {
        self.is_allowed(Permissions::ACCESSIBLE)
    }

    pub fn is_doc_assembly_allowed(&self) -> bool {
        self.is_allowed(Permissions::DOC_ASSEMBLY)
    }

    pub fn is_high_print_allowed(&self) -> bool {
        self.is_allowed(Permissions::HIGH_PRINT)
    }

    pub fn encrypt_metadata(&self) -> bool {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => p.encrypt_metadata,
            Self::AesV3(p) => p.encrypt_metadata,
        }
    }

    /// Authenticate `password` and record the outcome in `ctx`.
    ///
    /// A wrong password is `Ok(AuthResult::Failed)`; the context is left
    /// unauthenticated. Errors are reserved for passwords SASLprep rejects
    /// and cipher failures.
    pub fn authenticate(&self, password: &str, ctx: &mut EncryptionContext) -> Result<AuthResult> {
        let (result, key) = match self {
            Self::Rc4(p) | Self::AesV2(p) => p.authenticate(password, ctx.document_id()),
            Self::AesV3(p) => p.authenticate(password)?,
        };
        match key {
            Some(key) => ctx.set_key(key, result),
            None => ctx.set_failed(),
        }
        debug!(algorithm = %self.algorithm(), result = result.as_str(), "authentication");
        Ok(result)
    }

    /// Key protecting the strings and streams of `obj`.
    fn object_key(&self, file_key: &[u8], obj: PDFObjRef) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Rc4(p) | Self::AesV2(p) => p.object_key(file_key, obj),
            Self::AesV3(_) => Zeroizing::new(file_key.to_vec()),
        }
    }

    /// Encrypt a string or stream payload belonging to `obj`.
    ///
    /// AES output is a random IV followed by the PKCS#7-padded ciphertext.
    pub fn encrypt(
        &self,
        ctx: &mut EncryptionContext,
        obj: PDFObjRef,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            Self::Rc4(_) => {
                let key = self.object_key(ctx.key()?, obj);
                Ok(Arcfour::new(&key).process(data))
            }
            Self::AesV2(_) | Self::AesV3(_) => {
                let (file_key, rng) = ctx.key_and_rng()?;
                let key = self.object_key(file_key, obj);
                let mut out = vec![0u8; AES_BLOCK_SIZE];
                rng.fill_bytes(&mut out);
                let sealed = aes_cbc_encrypt_padded(&key, &out, data)?;
                out.extend_from_slice(&sealed);
                Ok(out)
            }
        }
    }

    /// Decrypt a string or stream payload belonging to `obj`.
    ///
    /// AES input that is empty or only an IV decrypts to nothing; anything
    /// else shorter than the IV is [`PdfError::UnexpectedEof`], as from
    /// [`decrypt_reader`](Self::decrypt_reader).
    pub fn decrypt(&self, ctx: &EncryptionContext, obj: PDFObjRef, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.object_key(ctx.key()?, obj);
        match self {
            Self::Rc4(_) => Ok(Arcfour::new(&key).process(data)),
            Self::AesV2(_) | Self::AesV3(_) => {
                if data.len() < AES_BLOCK_SIZE && !data.is_empty() {
                    return Err(PdfError::UnexpectedEof("AES ciphertext shorter than its IV"));
                }
                if data.len() <= AES_BLOCK_SIZE {
                    return Ok(Vec::new());
                }
                let (iv, body) = data.split_at(AES_BLOCK_SIZE);
                aes_cbc_decrypt_padded(&key, iv, body)
            }
        }
    }

    /// Exact ciphertext size for `len` bytes of plaintext.
    pub fn calculate_stream_length(&self, len: usize) -> usize {
        match self {
            Self::Rc4(_) => len,
            Self::AesV2(_) | Self::AesV3(_) => {
                let mut out = ((len + 15) & !15) + AES_BLOCK_SIZE;
                if len % AES_BLOCK_SIZE == 0 {
                    out += AES_BLOCK_SIZE;
                }
                out
            }
        }
    }

    /// Bytes preceding the ciphertext proper (the AES IV).
    pub fn calculate_stream_offset(&self) -> usize {
        match self {
            Self::Rc4(_) => 0,
            Self::AesV2(_) | Self::AesV3(_) => AES_BLOCK_SIZE,
        }
    }

    /// Wrap `inner` so that reading yields the plaintext of `len` bytes of
    /// ciphertext belonging to `obj`.
    pub fn decrypt_reader<R: Read>(
        &self,
        ctx: &mut EncryptionContext,
        obj: PDFObjRef,
        inner: R,
        len: u64,
    ) -> Result<DecryptReader<R>> {
        match self {
            Self::Rc4(_) => {
                let (file_key, cache) = ctx.key_and_rc4_cache()?;
                let key = self.object_key(file_key, obj);
                let cipher = Arcfour::with_cache(&key, cache);
                Ok(DecryptReader::Rc4(Rc4DecryptReader::new(inner, len, cipher)))
            }
            Self::AesV2(_) | Self::AesV3(_) => {
                let key = self.object_key(ctx.key()?, obj);
                Ok(DecryptReader::Aes(AesDecryptReader::new(inner, len, &key)))
            }
        }
    }

    /// Wrap `inner` so that everything written to it is encrypted for `obj`.
    ///
    /// Only RC4 streams can be encrypted incrementally; AES payloads go
    /// through [`encrypt`](Self::encrypt) once complete.
    pub fn encrypt_writer<W: Write>(
        &self,
        ctx: &mut EncryptionContext,
        obj: PDFObjRef,
        inner: W,
    ) -> Result<Rc4EncryptWriter<W>> {
        match self {
            Self::Rc4(_) => {
                let (file_key, cache) = ctx.key_and_rc4_cache()?;
                let key = self.object_key(file_key, obj);
                let cipher = Arcfour::with_cache(&key, cache);
                Ok(Rc4EncryptWriter::new(inner, cipher))
            }
            Self::AesV2(_) | Self::AesV3(_) => Err(PdfError::Unsupported(
                "streaming AES encryption; encrypt the complete payload instead",
            )),
        }
    }
}
