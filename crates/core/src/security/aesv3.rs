//! Key derivation for AES-256 handlers (revisions 5 and 6).
//!
//! `U` and `O` are 48 bytes each: a 32-byte hash, an 8-byte validation
//! salt and an 8-byte key salt. The file key itself is random and stored
//! wrapped in `UE` and `OE`; `/Perms` carries an encrypted copy of `P`.

use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::context::AuthResult;
use super::password::preprocess_password;
use crate::codec::aes::{
    aes_cbc_decrypt, aes_cbc_encrypt, aes256_decrypt_block, aes256_encrypt_block,
};
use crate::codec::digest::{HashKind, sha256_concat};
use crate::error::Result;

/// File key length of AES-256 handlers, in bytes.
pub const KEY_LENGTH: usize = 32;

const SALT_LEN: usize = 8;
const ZERO_IV: [u8; 16] = [0; 16];

/// Verification material of an AES-256 handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesV3Parameters {
    /// `/R`: 5 or 6.
    pub revision: u8,
    pub o: [u8; 48],
    pub u: [u8; 48],
    pub oe: [u8; 32],
    pub ue: [u8; 32],
    pub perms: [u8; 16],
    /// Raw `/P` bits.
    pub p: u32,
    pub encrypt_metadata: bool,
}

/// Hash a prepared password with `salt` and, for the owner password, the
/// 48-byte `U` value as `extra`.
///
/// Revision 5 is a single SHA-256. Revision 6 feeds that digest through the
/// ISO 32000-2 hardening loop: each round AES-128-CBC-encrypts 64 copies of
/// `password || digest || extra` under the digest's first 32 bytes, then
/// hashes the ciphertext with SHA-256, -384 or -512 depending on its first
/// 16 bytes. The loop runs at least 64 rounds and stops once the last
/// ciphertext byte is no greater than the round count minus 32.
pub fn compute_hash(
    password: &[u8],
    revision: u8,
    salt: &[u8],
    extra: Option<&[u8]>,
) -> Result<Zeroizing<[u8; 32]>> {
    let extra = extra.unwrap_or_default();
    let initial = Zeroizing::new(sha256_concat(&[password, salt, extra]));
    if revision < 6 {
        return Ok(initial);
    }

    let mut digest = Zeroizing::new(initial.to_vec());
    let mut rounds = 0usize;
    loop {
        let unit = password.len() + digest.len() + extra.len();
        let mut data = Zeroizing::new(Vec::with_capacity(unit * 64));
        for _ in 0..64 {
            data.extend_from_slice(password);
            data.extend_from_slice(&digest);
            data.extend_from_slice(extra);
        }

        let encrypted = Zeroizing::new(aes_cbc_encrypt(&digest[..16], &digest[16..32], &data)?);
        digest = HashKind::select(&encrypted).digest(&encrypted);
        rounds += 1;

        let last = usize::from(encrypted[encrypted.len() - 1]);
        if rounds >= 64 && last + 32 <= rounds {
            break;
        }
    }

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&digest[..32]);
    Ok(out)
}

fn random_salts<R: RngCore + CryptoRng>(rng: &mut R) -> ([u8; SALT_LEN], [u8; SALT_LEN]) {
    let mut validation = [0u8; SALT_LEN];
    let mut key = [0u8; SALT_LEN];
    rng.fill_bytes(&mut validation);
    rng.fill_bytes(&mut key);
    (validation, key)
}

/// Build a 48-byte verification value and the matching 32-byte wrapped key.
fn seal_key<R: RngCore + CryptoRng>(
    password: &[u8],
    revision: u8,
    file_key: &[u8],
    extra: Option<&[u8]>,
    rng: &mut R,
) -> Result<([u8; 48], [u8; 32])> {
    let (validation_salt, key_salt) = random_salts(rng);

    let mut value = [0u8; 48];
    value[..32].copy_from_slice(&*compute_hash(password, revision, &validation_salt, extra)?);
    value[32..40].copy_from_slice(&validation_salt);
    value[40..].copy_from_slice(&key_salt);

    let intermediate = compute_hash(password, revision, &key_salt, extra)?;
    let wrapped = aes_cbc_encrypt(&*intermediate, &ZERO_IV, file_key)?;
    let mut sealed = [0u8; 32];
    sealed.copy_from_slice(&wrapped);
    Ok((value, sealed))
}

/// Compute `U` and `UE` for a prepared user password.
pub fn compute_user_key<R: RngCore + CryptoRng>(
    password: &[u8],
    revision: u8,
    file_key: &[u8],
    rng: &mut R,
) -> Result<([u8; 48], [u8; 32])> {
    seal_key(password, revision, file_key, None, rng)
}

/// Compute `O` and `OE` for a prepared owner password. Both hashes also
/// cover the finished 48-byte `U`.
pub fn compute_owner_key<R: RngCore + CryptoRng>(
    password: &[u8],
    revision: u8,
    file_key: &[u8],
    u: &[u8; 48],
    rng: &mut R,
) -> Result<([u8; 48], [u8; 32])> {
    seal_key(password, revision, file_key, Some(&u[..]), rng)
}

/// The plain 16-byte `/Perms` block.
pub fn perms_block(p: u32, encrypt_metadata: bool) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&p.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9..12].copy_from_slice(b"adb");
    block
}

/// Encrypt the `/Perms` block under the file key.
pub fn compute_perms(file_key: &[u8], p: u32, encrypt_metadata: bool) -> Result<[u8; 16]> {
    aes256_encrypt_block(file_key, &perms_block(p, encrypt_metadata))
}

impl AesV3Parameters {
    /// Generate a random file key and all verification values for a new
    /// document.
    pub fn generate<R: RngCore + CryptoRng>(
        revision: u8,
        user_password: &str,
        owner_password: &str,
        p: u32,
        encrypt_metadata: bool,
        rng: &mut R,
    ) -> Result<(Self, Zeroizing<Vec<u8>>)> {
        let user = preprocess_password(user_password)?;
        let owner = preprocess_password(owner_password)?;

        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        rng.fill_bytes(&mut key);

        let (u, ue) = compute_user_key(&user, revision, &key, rng)?;
        let (o, oe) = compute_owner_key(&owner, revision, &key, &u, rng)?;
        let perms = compute_perms(&key, p, encrypt_metadata)?;

        let params = Self {
            revision,
            o,
            u,
            oe,
            ue,
            perms,
            p,
            encrypt_metadata,
        };
        Ok((params, key))
    }

    /// Try `password` as the user password, then as the owner password.
    ///
    /// Fails only when SASLprep rejects the password; a wrong password is
    /// [`AuthResult::Failed`].
    pub fn authenticate(
        &self,
        password: &str,
    ) -> Result<(AuthResult, Option<Zeroizing<Vec<u8>>>)> {
        let prepared = preprocess_password(password)?;

        let (u_hash, u_rest) = self.u.split_at(32);
        let hash = compute_hash(&prepared, self.revision, &u_rest[..SALT_LEN], None)?;
        if bool::from(hash[..].ct_eq(u_hash)) {
            let key = self.unwrap_key(&prepared, &u_rest[SALT_LEN..], None, &self.ue)?;
            debug!(revision = self.revision, "authenticated as user");
            self.check_perms(&key);
            return Ok((AuthResult::User, Some(key)));
        }

        let (o_hash, o_rest) = self.o.split_at(32);
        let owner_salt = &o_rest[..SALT_LEN];
        let hash = compute_hash(&prepared, self.revision, owner_salt, Some(&self.u[..]))?;
        if bool::from(hash[..].ct_eq(o_hash)) {
            let key_salt = &o_rest[SALT_LEN..];
            let key = self.unwrap_key(&prepared, key_salt, Some(&self.u[..]), &self.oe)?;
            debug!(revision = self.revision, "authenticated as owner");
            self.check_perms(&key);
            return Ok((AuthResult::Owner, Some(key)));
        }

        debug!(revision = self.revision, "password rejected");
        Ok((AuthResult::Failed, None))
    }

    fn unwrap_key(
        &self,
        password: &[u8],
        key_salt: &[u8],
        extra: Option<&[u8]>,
        wrapped: &[u8; 32],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let intermediate = compute_hash(password, self.revision, key_salt, extra)?;
        Ok(Zeroizing::new(aes_cbc_decrypt(&*intermediate, &ZERO_IV, wrapped)?))
    }

    /// Compare the decrypted `/Perms` block with `P` and `EncryptMetadata`.
    ///
    /// A mismatch is logged and otherwise ignored; files with inconsistent
    /// permission entries still open.
    fn check_perms(&self, key: &[u8]) {
        let plain = match aes256_decrypt_block(key, &self.perms) {
            Ok(block) => Zeroizing::new(block),
            Err(err) => {
                warn!(%err, "cannot decrypt /Perms");
                return;
            }
        };
        if &plain[9..12] != b"adb" {
            warn!("/Perms does not decrypt to a valid block");
            return;
        }
        let p = u32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]);
        if p != self.p {
            warn!(perms = p, p = self.p, "/Perms disagrees with /P");
        }
        let metadata = plain[8] == b'T';
        if metadata != self.encrypt_metadata {
            warn!(
                perms = metadata,
                encrypt_metadata = self.encrypt_metadata,
                "/Perms disagrees with /EncryptMetadata"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn unhex(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    const SALT: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn r5_hash_is_plain_sha256() {
        let hash = compute_hash(b"user", 5, &SALT, None).unwrap();
        assert_eq!(
            hash.to_vec(),
            unhex("ad7c98e251cb1c7b3e2830b6f0becbd8352a6ab712232d6e82f2fca45f304dcc")
        );
    }

    #[test]
    fn r6_hash_known_answers() {
        let hash = compute_hash(b"user", 6, &SALT, None).unwrap();
        assert_eq!(
            hash.to_vec(),
            unhex("17424b40ead366f7ddef0ff073608aa68ba701714b5cef3409b94c4ffa763726")
        );

        let extra: Vec<u8> = (0u8..48).collect();
        let hash = compute_hash(b"owner", 6, &SALT, Some(&extra)).unwrap();
        assert_eq!(
            hash.to_vec(),
            unhex("f6fa23bde6d6d6595be33cecfef713f9da09cdc05cc696c10b1c63c439d6924e")
        );

        let hash = compute_hash(b"", 6, &[0u8; 8], None).unwrap();
        assert_eq!(
            hash.to_vec(),
            unhex("439feba099a63d0d035a1e5fb67ff307329189584956425aff2d3bd3d15edc60")
        );
    }

    #[test]
    fn perms_known_answer() {
        let key: Vec<u8> = (0u8..32).collect();
        let perms = compute_perms(&key, 0xFFFF_F0C4, true).unwrap();
        assert_eq!(perms.to_vec(), unhex("741f6a8dc73f86fd37faa588a77f77c1"));
    }

    #[test]
    fn perms_block_layout() {
        let block = perms_block(0xFFFF_FFFC, false);
        assert_eq!(&block[..4], &[0xFC, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&block[4..8], &[0xFF; 4]);
        assert_eq!(block[8], b'F');
        assert_eq!(&block[9..12], b"adb");
        assert_eq!(&block[12..], &[0; 4]);
    }

    #[test]
    fn generated_parameters_authenticate() {
        let mut rng = StdRng::seed_from_u64(7);
        for revision in [5u8, 6] {
            let (params, key) =
                AesV3Parameters::generate(revision, "user", "owner", 0xFFFF_FFFC, true, &mut rng)
                    .unwrap();

            let (auth, found) = params.authenticate("user").unwrap();
            assert_eq!(auth, AuthResult::User);
            assert_eq!(found.unwrap(), key);

            let (auth, found) = params.authenticate("owner").unwrap();
            assert_eq!(auth, AuthResult::Owner);
            assert_eq!(found.unwrap(), key);

            let (auth, found) = params.authenticate("nobody").unwrap();
            assert_eq!(auth, AuthResult::Failed);
            assert!(found.is_none());
        }
    }
}
