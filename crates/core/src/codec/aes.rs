//! AES-CBC bindings for the standard security handler.
//!
//! Every helper validates key and IV lengths and reports failures as
//! [`PdfError::InternalLogic`] instead of panicking, since key material may
//! come straight from a damaged `/Encrypt` dictionary.

use aes::cipher::block_padding::{NoPadding, Padding, Pkcs7};
use aes::cipher::consts::U16;
use aes::cipher::{BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use cbc::{Decryptor, Encryptor};

use crate::error::{PdfError, Result};

/// AES block size in bytes; also the size of the IV prefix on encrypted data.
pub const AES_BLOCK_SIZE: usize = 16;

type Aes128CbcDec = Decryptor<aes::Aes128>;
type Aes256CbcDec = Decryptor<aes::Aes256>;
type Aes128CbcEnc = Encryptor<aes::Aes128>;
type Aes256CbcEnc = Encryptor<aes::Aes256>;

fn key_error(len: usize) -> PdfError {
    PdfError::InternalLogic(format!("AES key must be 16 or 32 bytes, got {len}"))
}

fn iv_error(len: usize) -> PdfError {
    PdfError::InternalLogic(format!("AES IV must be 16 bytes, got {len}"))
}

enum CbcEncryptor {
    Aes128(Aes128CbcEnc),
    Aes256(Aes256CbcEnc),
}

impl CbcEncryptor {
    fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != AES_BLOCK_SIZE {
            return Err(iv_error(iv.len()));
        }
        match key.len() {
            16 => Aes128CbcEnc::new_from_slices(key, iv)
                .map(Self::Aes128)
                .map_err(|_| key_error(key.len())),
            32 => Aes256CbcEnc::new_from_slices(key, iv)
                .map(Self::Aes256)
                .map_err(|_| key_error(key.len())),
            n => Err(key_error(n)),
        }
    }

    /// Encrypt `buf[..msg_len]` in place, returning the ciphertext length.
    fn encrypt<P: Padding<U16>>(self, buf: &mut [u8], msg_len: usize) -> Result<usize> {
        let out = match self {
            Self::Aes128(c) => c.encrypt_padded_mut::<P>(buf, msg_len),
            Self::Aes256(c) => c.encrypt_padded_mut::<P>(buf, msg_len),
        };
        out.map(<[u8]>::len)
            .map_err(|_| PdfError::InternalLogic("AES output buffer too small".into()))
    }
}

enum CbcDecryptor {
    Aes128(Aes128CbcDec),
    Aes256(Aes256CbcDec),
}

impl CbcDecryptor {
    fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        if iv.len() != AES_BLOCK_SIZE {
            return Err(iv_error(iv.len()));
        }
        match key.len() {
            16 => Aes128CbcDec::new_from_slices(key, iv)
                .map(Self::Aes128)
                .map_err(|_| key_error(key.len())),
            32 => Aes256CbcDec::new_from_slices(key, iv)
                .map(Self::Aes256)
                .map_err(|_| key_error(key.len())),
            n => Err(key_error(n)),
        }
    }

    /// Decrypt `buf` in place, returning the plaintext length after unpadding.
    fn decrypt<P: Padding<U16>>(self, buf: &mut [u8]) -> Result<usize> {
        let out = match self {
            Self::Aes128(c) => c.decrypt_padded_mut::<P>(buf),
            Self::Aes256(c) => c.decrypt_padded_mut::<P>(buf),
        };
        out.map(<[u8]>::len)
            .map_err(|_| PdfError::InternalLogic("invalid AES padding".into()))
    }

    fn decrypt_block(&mut self, block: &mut [u8]) {
        let block = aes::Block::from_mut_slice(block);
        match self {
            Self::Aes128(c) => c.decrypt_block_mut(block),
            Self::Aes256(c) => c.decrypt_block_mut(block),
        }
    }
}

fn require_whole_blocks(data: &[u8]) -> Result<()> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(PdfError::InternalLogic(format!(
            "AES data length {} is not a multiple of {AES_BLOCK_SIZE}",
            data.len()
        )));
    }
    Ok(())
}

/// Decrypt data using AES-CBC with a 128 or 256 bit key and no padding.
///
/// Data length must be a multiple of 16 bytes.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    require_whole_blocks(data)?;
    let mut buf = data.to_vec();
    CbcDecryptor::new(key, iv)?.decrypt::<NoPadding>(&mut buf)?;
    Ok(buf)
}

/// Encrypt data using AES-CBC with a 128 or 256 bit key and no padding.
///
/// Data length must be a multiple of 16 bytes.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    require_whole_blocks(data)?;
    let mut buf = data.to_vec();
    CbcEncryptor::new(key, iv)?.encrypt::<NoPadding>(&mut buf, data.len())?;
    Ok(buf)
}

/// Encrypt data using AES-CBC and PKCS#7 padding.
///
/// The output always gains between 1 and 16 bytes of padding.
pub fn aes_cbc_encrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; padded_len(data.len())];
    buf[..data.len()].copy_from_slice(data);
    let len = CbcEncryptor::new(key, iv)?.encrypt::<Pkcs7>(&mut buf, data.len())?;
    buf.truncate(len);
    Ok(buf)
}

/// Decrypt AES-CBC data and strip its PKCS#7 padding.
///
/// Malformed padding is an error rather than being passed through.
pub fn aes_cbc_decrypt_padded(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    require_whole_blocks(data)?;
    let mut buf = data.to_vec();
    let len = CbcDecryptor::new(key, iv)?.decrypt::<Pkcs7>(&mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

/// Encrypt a single block with AES-256 (the `/Perms` layout).
pub fn aes256_encrypt_block(
    key: &[u8],
    block: &[u8; AES_BLOCK_SIZE],
) -> Result<[u8; AES_BLOCK_SIZE]> {
    let cipher = aes::Aes256::new_from_slice(key).map_err(|_| key_error(key.len()))?;
    let mut buf = aes::Block::clone_from_slice(block);
    cipher.encrypt_block(&mut buf);
    let mut out = [0u8; AES_BLOCK_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}

/// Decrypt a single AES-256 block.
pub fn aes256_decrypt_block(
    key: &[u8],
    block: &[u8; AES_BLOCK_SIZE],
) -> Result<[u8; AES_BLOCK_SIZE]> {
    use aes::cipher::BlockDecrypt;

    let cipher = aes::Aes256::new_from_slice(key).map_err(|_| key_error(key.len()))?;
    let mut buf = aes::Block::clone_from_slice(block);
    cipher.decrypt_block(&mut buf);
    let mut out = [0u8; AES_BLOCK_SIZE];
    out.copy_from_slice(&buf);
    Ok(out)
}

/// Length of `len` plaintext bytes once PKCS#7-padded.
pub const fn padded_len(len: usize) -> usize {
    (len / AES_BLOCK_SIZE + 1) * AES_BLOCK_SIZE
}

/// Remove PKCS#7 padding from AES-decrypted data.
///
/// Fails when:
/// - the input is empty or not whole blocks
/// - the padding byte value is 0 or > 16
/// - the padding bytes are not all equal to the padding length
pub fn unpad_aes(data: &[u8]) -> Result<&[u8]> {
    let bad = || PdfError::InternalLogic("invalid AES padding".into());
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(bad());
    }

    let pad_len = data[data.len() - 1] as usize;
    if pad_len == 0 || pad_len > AES_BLOCK_SIZE {
        return Err(bad());
    }

    let start = data.len() - pad_len;
    if data[start..].iter().any(|&b| b as usize != pad_len) {
        return Err(bad());
    }
    Ok(&data[..start])
}

/// Incremental AES-CBC decryption, one whole block at a time.
///
/// Padding is left in place; callers strip it from the final block with
/// [`unpad_aes`] once the end of the ciphertext is known.
pub struct AesCbcDecryptor {
    inner: CbcDecryptor,
}

impl AesCbcDecryptor {
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CbcDecryptor::new(key, iv)?,
        })
    }

    /// Decrypt `buf` in place. Its length must be a multiple of 16.
    pub fn decrypt_blocks(&mut self, buf: &mut [u8]) -> Result<()> {
        require_whole_blocks(buf)?;
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.inner.decrypt_block(block);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_len_always_adds_a_block_on_boundaries() {
        assert_eq!(padded_len(0), 16);
        assert_eq!(padded_len(15), 16);
        assert_eq!(padded_len(16), 32);
        assert_eq!(padded_len(17), 32);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let key = [7u8; 32];
        let iv = [9u8; 16];
        let plain: Vec<u8> = (0..64u8).collect();
        let ct = aes_cbc_encrypt(&key, &iv, &plain).unwrap();

        let mut dec = AesCbcDecryptor::new(&key, &iv).unwrap();
        let mut buf = ct.clone();
        let (a, b) = buf.split_at_mut(16);
        dec.decrypt_blocks(a).unwrap();
        dec.decrypt_blocks(b).unwrap();
        assert_eq!(buf, plain);
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(aes_cbc_encrypt(&[0u8; 15], &[0u8; 16], &[0u8; 16]).is_err());
        assert!(aes_cbc_encrypt(&[0u8; 16], &[0u8; 8], &[0u8; 16]).is_err());
        assert!(aes_cbc_decrypt(&[0u8; 16], &[0u8; 16], &[0u8; 17]).is_err());
        assert!(aes256_encrypt_block(&[0u8; 16], &[0u8; 16]).is_err());
    }
}
