//! Document-level encryption.
//!
//! [`DocumentSecurity`] pairs the parsed or freshly created handler with the
//! context holding the file key, and applies the object cipher to whole
//! indirect objects the way a reader or writer encounters them.

use std::io::{Read, Write};

use tracing::{debug, info};

use crate::error::Result;
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
use crate::security::{
    AuthResult, CryptoProvider, Credentials, DecryptReader, EncryptOptions, EncryptionContext,
    PdfEncrypt, Permissions, Rc4EncryptWriter,
};

/// The security state of one encrypted document.
pub struct DocumentSecurity {
    handler: PdfEncrypt,
    context: EncryptionContext,
}

impl DocumentSecurity {
    /// Parse `/Encrypt` and authenticate `password` against it.
    ///
    /// A wrong password is not an error: the result reports
    /// [`AuthResult::Failed`] and [`try_password`](Self::try_password) can be
    /// called again.
    pub fn open(
        encrypt: &PDFDict,
        document_id: &[u8],
        password: &str,
        provider: &CryptoProvider,
    ) -> Result<Self> {
        let handler = PdfEncrypt::from_dict(encrypt, provider)?;
        let mut security = Self {
            handler,
            context: EncryptionContext::new(document_id),
        };
        security.try_password(password)?;
        Ok(security)
    }

    /// Authenticate another password.
    pub fn try_password(&mut self, password: &str) -> Result<AuthResult> {
        let result = self.handler.authenticate(password, &mut self.context)?;
        info!(result = result.as_str(), "document authentication");
        Ok(result)
    }

    /// Fresh encryption parameters for a document about to be written.
    pub fn create(
        credentials: &Credentials,
        options: &EncryptOptions,
        document_id: &[u8],
        provider: &CryptoProvider,
    ) -> Result<Self> {
        let (handler, context) = PdfEncrypt::create(credentials, options, document_id, provider)?;
        Ok(Self { handler, context })
    }

    pub fn handler(&self) -> &PdfEncrypt {
        &self.handler
    }

    pub fn auth_result(&self) -> AuthResult {
        self.context.auth_result()
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.is_authenticated()
    }

    pub fn permissions(&self) -> Permissions {
        self.handler.permissions()
    }

    pub fn is_allowed(&self, permission: Permissions) -> bool {
        self.handler.is_allowed(permission)
    }

    /// The `/Encrypt` dictionary to write into the trailer.
    pub fn encryption_dict(&self) -> Result<PDFDict> {
        self.handler.to_dict()
    }

    /// Whether a stream's payload goes through the cipher.
    ///
    /// Cross-reference streams never do; metadata streams don't when
    /// `/EncryptMetadata` is false.
    pub fn is_stream_encrypted(&self, stream: &PDFStream) -> bool {
        if stream.is_type("XRef") {
            return false;
        }
        self.handler.encrypt_metadata() || !stream.is_type("Metadata")
    }

    /// Decrypt every string and stream payload of the indirect object `r`.
    pub fn decrypt_object(&mut self, obj: PDFObject, r: PDFObjRef) -> Result<PDFObject> {
        self.transform(obj, r, Direction::Decrypt)
    }

    /// Encrypt every string and stream payload of the indirect object `r`.
    pub fn encrypt_object(&mut self, obj: PDFObject, r: PDFObjRef) -> Result<PDFObject> {
        self.transform(obj, r, Direction::Encrypt)
    }

    /// Decrypt one string or complete stream payload of object `r`.
    pub fn decrypt_data(&self, r: PDFObjRef, data: &[u8]) -> Result<Vec<u8>> {
        self.handler.decrypt(&self.context, r, data)
    }

    /// Encrypt one string or complete stream payload of object `r`.
    pub fn encrypt_data(&mut self, r: PDFObjRef, data: &[u8]) -> Result<Vec<u8>> {
        self.handler.encrypt(&mut self.context, r, data)
    }

    fn apply(&mut self, data: &[u8], r: PDFObjRef, direction: Direction) -> Result<Vec<u8>> {
        match direction {
            Direction::Decrypt => self.decrypt_data(r, data),
            Direction::Encrypt => self.encrypt_data(r, data),
        }
    }

    fn transform(
        &mut self,
        obj: PDFObject,
        r: PDFObjRef,
        direction: Direction,
    ) -> Result<PDFObject> {
        Ok(match obj {
            PDFObject::String(data) => PDFObject::String(self.apply(&data, r, direction)?),
            PDFObject::Array(items) => PDFObject::Array(
                items
                    .into_iter()
                    .map(|item| self.transform(item, r, direction))
                    .collect::<Result<_>>()?,
            ),
            PDFObject::Dict(dict) => PDFObject::Dict(self.transform_dict(dict, r, direction)?),
            PDFObject::Stream(mut stream) => {
                if stream.is_type("XRef") {
                    debug!(objid = r.objid, "cross-reference stream left as is");
                    return Ok(PDFObject::Stream(stream));
                }
                let attrs = std::mem::take(&mut stream.attrs);
                stream.attrs = self.transform_dict(attrs, r, direction)?;
                if self.is_stream_encrypted(&stream) {
                    let data = self.apply(stream.data(), r, direction)?;
                    stream.set_data(data);
                } else {
                    debug!(objid = r.objid, "metadata stream left unencrypted");
                }
                PDFObject::Stream(stream)
            }
            other => other,
        })
    }

    fn transform_dict(
        &mut self,
        dict: PDFDict,
        r: PDFObjRef,
        direction: Direction,
    ) -> Result<PDFDict> {
        let mut out = PDFDict::with_capacity(dict.len());
        for (k, v) in dict {
            let v = self.transform(v, r, direction)?;
            out.insert(k, v);
        }
        Ok(out)
    }

    /// Read the plaintext of a stream whose `len` bytes of ciphertext come
    /// from `inner`.
    pub fn decrypt_stream_reader<R: Read>(
        &mut self,
        r: PDFObjRef,
        inner: R,
        len: u64,
    ) -> Result<DecryptReader<R>> {
        self.handler.decrypt_reader(&mut self.context, r, inner, len)
    }

    /// Encrypt a stream incrementally as it is written to `inner`.
    pub fn encrypt_stream_writer<W: Write>(
        &mut self,
        r: PDFObjRef,
        inner: W,
    ) -> Result<Rc4EncryptWriter<W>> {
        self.handler.encrypt_writer(&mut self.context, r, inner)
    }

    /// Ciphertext size of a stream with `len` bytes of plaintext.
    pub fn encrypted_length(&self, len: usize) -> usize {
        self.handler.calculate_stream_length(len)
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Decrypt,
    Encrypt,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::EncryptionAlgorithm;

    fn security(algorithm: EncryptionAlgorithm, encrypt_metadata: bool) -> DocumentSecurity {
        let options = EncryptOptions::new(algorithm).with_encrypt_metadata(encrypt_metadata);
        DocumentSecurity::create(
            &Credentials::new("user", "owner"),
            &options,
            b"0123456789abcdef",
            &CryptoProvider::detect(),
        )
        .unwrap()
    }

    #[test]
    fn xref_stream_untouched() {
        let mut sec = security(EncryptionAlgorithm::AesV2, true);
        let mut attrs = PDFDict::new();
        attrs.insert("Type".into(), PDFObject::name("XRef"));
        let obj = PDFObject::Stream(Box::new(PDFStream::new(attrs, b"raw".to_vec())));
        let out = sec.encrypt_object(obj.clone(), PDFObjRef::new(9, 0)).unwrap();
        assert_eq!(out, obj);
    }

    #[test]
    fn metadata_stream_follows_flag() {
        let mut attrs = PDFDict::new();
        attrs.insert("Type".into(), PDFObject::name("Metadata"));
        let stream = PDFStream::new(attrs, b"<x:xmpmeta/>".to_vec());

        let sec = security(EncryptionAlgorithm::AesV2, false);
        assert!(!sec.is_stream_encrypted(&stream));
        let sec = security(EncryptionAlgorithm::AesV2, true);
        assert!(sec.is_stream_encrypted(&stream));
    }
}
