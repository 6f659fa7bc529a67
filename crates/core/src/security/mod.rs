//! Standard security handler: key derivation, authentication and the
//! object cipher for RC4 and AES encrypted documents.

pub mod aesv3;
pub mod algorithm;
pub mod context;
mod dict;
pub mod handler;
pub mod legacy;
pub mod password;
pub mod permissions;
pub mod provider;
pub mod saslprep;
pub mod stream;

pub use algorithm::{AlgorithmSet, EncryptOptions, EncryptionAlgorithm};
pub use context::{AuthResult, EncryptionContext};
pub use handler::PdfEncrypt;
pub use password::{Credentials, PASSWORD_PADDING};
pub use permissions::Permissions;
pub use provider::CryptoProvider;
pub use stream::{AesDecryptReader, DecryptReader, Rc4DecryptReader, Rc4EncryptWriter};
