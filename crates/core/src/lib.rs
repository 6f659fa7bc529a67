//! pdfcrypt - the PDF standard security handler.
//!
//! Derives and verifies RC4 and AES keys from user and owner passwords,
//! encrypts and decrypts object strings and streams, and reads and writes
//! `/Encrypt` dictionaries.

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod security;

// Re-export the main entry points for convenience
pub use document::DocumentSecurity;
pub use model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
pub use security::{
    AuthResult, CryptoProvider, Credentials, EncryptOptions, EncryptionAlgorithm,
    EncryptionContext, PdfEncrypt, Permissions,
};

pub use error::{PdfError, Result};
