//! Key derivation for revisions 2 to 4 (RC4 and AES-128).
//!
//! Everything here is deterministic: identical passwords, document ID and
//! permissions always produce identical `O`, `U` and file keys.

use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use super::algorithm::EncryptionAlgorithm;
use super::context::AuthResult;
use super::password::{PASSWORD_PADDING, legacy_password_bytes, pad_password};
use crate::codec::arcfour::Arcfour;
use crate::codec::digest::{md5_concat, md5_rehash};
use crate::model::objects::PDFObjRef;

/// Salt appended to AES-128 object keys.
const AES_SALT: &[u8; 4] = b"sAlT";

/// Verification material of an RC4 or AES-128 handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyParameters {
    pub algorithm: EncryptionAlgorithm,
    /// `/R`: 2, 3 or 4.
    pub revision: u8,
    /// File key length in bytes (5 to 16).
    pub key_length: usize,
    pub o: [u8; 32],
    pub u: [u8; 32],
    /// Raw `/P` bits.
    pub p: u32,
    pub encrypt_metadata: bool,
}

/// RC4 under `key` applied to `data` in place.
fn rc4(key: &[u8], data: &mut [u8]) {
    Arcfour::new(key).apply_keystream(data);
}

/// `key` with every byte XORed with `round`.
fn round_key(key: &[u8], round: u8) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(key.iter().map(|b| b ^ round).collect())
}

/// Compute the owner key (`O`), or recover a user password pad from it.
///
/// `input` is RC4-encrypted under a key derived from `owner_pad`. For
/// generation `input` is the user password pad and the result is `O`; for
/// authentication `input` is the stored `O` and the rounds run backwards
/// (`for_authenticate`), yielding the user password pad.
pub fn compute_owner_key(
    input: &[u8; 32],
    owner_pad: &[u8; 32],
    key_length: usize,
    revision: u8,
    for_authenticate: bool,
) -> Zeroizing<[u8; 32]> {
    let mut digest = Zeroizing::new(md5_concat(&[&owner_pad[..]]));
    let mut out = Zeroizing::new(*input);

    if revision >= 3 {
        md5_rehash(&mut digest, key_length);
        let key = &digest[..key_length.min(16)];
        for i in 0..20u8 {
            let round = if for_authenticate { 19 - i } else { i };
            rc4(&round_key(key, round), &mut out[..]);
        }
    } else {
        rc4(&digest[..5], &mut out[..]);
    }
    out
}

/// Compute the file encryption key and the matching user key (`U`).
///
/// Returns `(key, u)`; `key` is `key_length` bytes. For revision 2 `u` is
/// the padding constant RC4-encrypted under the key. For revision 3 and up
/// it is 16 meaningful bytes followed by 16 zero bytes.
pub fn compute_encryption_key(
    document_id: &[u8],
    user_pad: &[u8; 32],
    o: &[u8; 32],
    p: u32,
    key_length: usize,
    revision: u8,
    encrypt_metadata: bool,
) -> (Zeroizing<Vec<u8>>, [u8; 32]) {
    let key_length = key_length.min(16);
    let p_bytes = p.to_le_bytes();
    let mut parts: Vec<&[u8]> = vec![&user_pad[..], &o[..], &p_bytes, document_id];
    if !encrypt_metadata {
        parts.push(&[0xFF; 4]);
    }
    let mut digest = Zeroizing::new(md5_concat(&parts));
    if revision >= 3 {
        md5_rehash(&mut digest, key_length);
    }
    let key = Zeroizing::new(digest[..key_length].to_vec());

    let mut u = [0u8; 32];
    if revision >= 3 {
        u[..16].copy_from_slice(&md5_concat(&[&PASSWORD_PADDING[..], document_id]));
        for round in 0..20u8 {
            rc4(&round_key(&key, round), &mut u[..16]);
        }
    } else {
        u = PASSWORD_PADDING;
        rc4(&key, &mut u);
    }
    (key, u)
}

/// Compare a computed key with a stored one over the first `len` bytes.
///
/// Tail bytes past `len` are not checked; producers disagree on their
/// contents.
pub fn check_key(computed: &[u8], stored: &[u8], len: usize) -> bool {
    let len = len.min(computed.len()).min(stored.len());
    len > 0 && bool::from(computed[..len].ct_eq(&stored[..len]))
}

/// Per-object key: `MD5(key || num[0..3] || gen[0..2] [|| "sAlT"])`,
/// truncated to `min(key.len() + 5, 16)` bytes.
pub fn object_key(file_key: &[u8], obj: PDFObjRef, aes: bool) -> Zeroizing<Vec<u8>> {
    let num = obj.objid.to_le_bytes();
    let generation = obj.genno.to_le_bytes();
    let mut parts: Vec<&[u8]> = vec![file_key, &num[..3], &generation[..2]];
    if aes {
        parts.push(&AES_SALT[..]);
    }
    let digest = Zeroizing::new(md5_concat(&parts));
    let len = (file_key.len() + 5).min(16);
    Zeroizing::new(digest[..len].to_vec())
}

impl LegacyParameters {
    /// Derive `O`, `U` and the file key for a new document.
    pub fn generate(
        algorithm: EncryptionAlgorithm,
        user_password: &str,
        owner_password: &str,
        key_length: usize,
        p: u32,
        encrypt_metadata: bool,
        document_id: &[u8],
    ) -> (Self, Zeroizing<Vec<u8>>) {
        let revision = algorithm.revision(encrypt_metadata);
        let user_pad = pad_password(&legacy_password_bytes(user_password));
        let owner_pad = pad_password(&legacy_password_bytes(owner_password));

        let o = *compute_owner_key(&user_pad, &owner_pad, key_length, revision, false);
        let (key, u) = compute_encryption_key(
            document_id,
            &user_pad,
            &o,
            p,
            key_length,
            revision,
            encrypt_metadata,
        );

        let params = Self {
            algorithm,
            revision,
            key_length,
            o,
            u,
            p,
            encrypt_metadata,
        };
        (params, key)
    }

    /// Try `password` as the user password, then as the owner password.
    ///
    /// On success returns the file key alongside the outcome.
    pub fn authenticate(
        &self,
        password: &str,
        document_id: &[u8],
    ) -> (AuthResult, Option<Zeroizing<Vec<u8>>>) {
        let pad = pad_password(&legacy_password_bytes(password));

        let (key, u) = self.derive(document_id, &pad);
        if check_key(&u, &self.u, self.key_length) {
            debug!(algorithm = %self.algorithm, "authenticated as user");
            return (AuthResult::User, Some(key));
        }

        let user_pad = compute_owner_key(&self.o, &pad, self.key_length, self.revision, true);
        let (key, u) = self.derive(document_id, &user_pad);
        if check_key(&u, &self.u, self.key_length) {
            debug!(algorithm = %self.algorithm, "authenticated as owner");
            return (AuthResult::Owner, Some(key));
        }

        debug!(algorithm = %self.algorithm, "password rejected");
        (AuthResult::Failed, None)
    }

    fn derive(&self, document_id: &[u8], user_pad: &[u8; 32]) -> (Zeroizing<Vec<u8>>, [u8; 32]) {
        compute_encryption_key(
            document_id,
            user_pad,
            &self.o,
            self.p,
            self.key_length,
            self.revision,
            self.encrypt_metadata,
        )
    }

    /// Per-object key for this handler.
    pub fn object_key(&self, file_key: &[u8], obj: PDFObjRef) -> Zeroizing<Vec<u8>> {
        object_key(file_key, obj, self.algorithm == EncryptionAlgorithm::AesV2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn r2_empty_passwords_known_answer() {
        let doc_id: Vec<u8> = (0u8..16).collect();
        let pad = pad_password(b"");
        let o = compute_owner_key(&pad, &pad, 5, 2, false);
        assert_eq!(
            o.to_vec(),
            unhex("2055c756c72e1ad702608e8196acad447ad32d17cff583235f6dd15fed7dab67")
        );
        let (key, u) = compute_encryption_key(&doc_id, &pad, &o, 0xFFFF_FFFC, 5, 2, true);
        assert_eq!(key.as_slice(), unhex("4e2709f6b8").as_slice());
        assert_eq!(
            u.to_vec(),
            unhex("b6271bb74f4fd4bf931172dcde8682912edc27b84ad0dc7cb83dc19fb91734d5")
        );
    }

    #[test]
    fn owner_key_round_trips_user_pad() {
        let user_pad = pad_password(b"user");
        let owner_pad = pad_password(b"owner");
        for revision in [2u8, 3, 4] {
            let key_len = if revision == 2 { 5 } else { 16 };
            let o = compute_owner_key(&user_pad, &owner_pad, key_len, revision, false);
            let back = compute_owner_key(&o, &owner_pad, key_len, revision, true);
            assert_eq!(*back, *user_pad, "revision {revision}");
        }
    }

    #[test]
    fn object_key_lengths() {
        let obj = PDFObjRef::new(7, 0);
        assert_eq!(object_key(&[0u8; 5], obj, false).len(), 10);
        assert_eq!(object_key(&[0u8; 16], obj, false).len(), 16);
        assert_eq!(object_key(&[0u8; 16], obj, true).len(), 16);
        assert_ne!(
            object_key(&[0u8; 16], obj, true),
            object_key(&[0u8; 16], obj, false)
        );
    }

    #[test]
    fn rc4_128_object_key_known_answer() {
        let key = unhex("4b5e80ca8d676a5207c5f3dd6d03a189");
        let obj_key = object_key(&key, PDFObjRef::new(7, 0), false);
        assert_eq!(
            obj_key.as_slice(),
            unhex("3a2bd925f1be4bd27b8b2844c16bd5ba").as_slice()
        );
    }

    #[test]
    fn check_key_ignores_tail() {
        let a = [1u8; 32];
        let mut b = [1u8; 32];
        b[20] = 0;
        assert!(check_key(&a, &b, 16));
        assert!(!check_key(&a, &b, 32));
        assert!(!check_key(&a, &b, 0));
    }
}
