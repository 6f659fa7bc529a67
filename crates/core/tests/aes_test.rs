//! AES-CBC helpers and PKCS#7 handling.

use pdfcrypt_core::PdfError;
use pdfcrypt_core::codec::aes::{
    aes_cbc_decrypt, aes_cbc_decrypt_padded, aes_cbc_encrypt, aes_cbc_encrypt_padded, padded_len,
    unpad_aes,
};

#[test]
fn test_unpad_aes_full_padding() {
    // Full block of padding (16 bytes of 0x10) -> empty
    assert_eq!(unpad_aes(&[0x10; 16]).unwrap(), b"");
}

#[test]
fn test_unpad_aes_block_plus_padding() {
    // One data block + full padding block
    let mut input = b"0123456789abcdef".to_vec();
    input.extend([0x10; 16]);
    assert_eq!(unpad_aes(&input).unwrap(), b"0123456789abcdef");
}

#[test]
fn test_unpad_aes_partial() {
    assert_eq!(unpad_aes(b"0123456789abc\x03\x03\x03").unwrap(), b"0123456789abc");
}

#[test]
fn test_unpad_aes_two_blocks() {
    assert_eq!(
        unpad_aes(b"0123456789abcdef0123456789abc\x03\x03\x03").unwrap(),
        b"0123456789abcdef0123456789abc"
    );
}

#[test]
fn test_unpad_aes_embedded_padding_bytes() {
    // Data containing 0x01 bytes that look like padding, followed by real 0x01 padding
    assert_eq!(
        unpad_aes(b"foo\x01bar\x01bazquux\x01").unwrap(),
        b"foo\x01bar\x01bazquux"
    );
}

#[test]
fn test_unpad_aes_inconsistent_padding_is_rejected() {
    assert!(unpad_aes(b"0123456789abc\x02\x03\x04").is_err());
}

#[test]
fn test_unpad_aes_short_padding_run_is_rejected() {
    // 5 bytes of padding announced, only 3 present
    assert!(unpad_aes(b"0123456789abc\x05\x05\x05").is_err());
}

#[test]
fn test_unpad_aes_zero_or_oversized_pad_is_rejected() {
    assert!(unpad_aes(&[0u8; 16]).is_err());
    assert!(unpad_aes(&[0x11; 16]).is_err());
    assert!(unpad_aes(&[]).is_err());
}

#[test]
fn test_aes128_cbc_decrypt() {
    let key = [0u8; 16];
    let iv = [0u8; 16];
    let ciphertext = hex::decode("66e94bd4ef8a2c3b884cfa59ca342b2e").unwrap();
    let plaintext = aes_cbc_decrypt(&key, &iv, &ciphertext).unwrap();
    assert_eq!(plaintext, vec![0u8; 16]);
}

#[test]
fn test_aes256_cbc_decrypt() {
    let key = [0u8; 32];
    let iv = [0u8; 16];
    let ciphertext = hex::decode("dc95c078a2408989ad48a21492842087").unwrap();
    let plaintext = aes_cbc_decrypt(&key, &iv, &ciphertext).unwrap();
    assert_eq!(plaintext, vec![0u8; 16]);
}

#[test]
fn test_aes_cbc_encrypt_zero_vectors() {
    let ct = aes_cbc_encrypt(&[0u8; 16], &[0u8; 16], &[0u8; 16]).unwrap();
    assert_eq!(hex::encode(ct), "66e94bd4ef8a2c3b884cfa59ca342b2e");
    let ct = aes_cbc_encrypt(&[0u8; 32], &[0u8; 16], &[0u8; 16]).unwrap();
    assert_eq!(hex::encode(ct), "dc95c078a2408989ad48a21492842087");
}

#[test]
fn test_unpadded_requires_whole_blocks() {
    assert!(aes_cbc_encrypt(&[0u8; 16], &[0u8; 16], &[0u8; 15]).is_err());
    assert!(aes_cbc_decrypt(&[0u8; 16], &[0u8; 16], &[0u8; 17]).is_err());
}

#[test]
fn test_invalid_key_length() {
    let result = aes_cbc_encrypt(&[0u8; 20], &[0u8; 16], &[0u8; 16]);
    assert!(matches!(result, Err(PdfError::InternalLogic(_))));
}

#[test]
fn test_padded_roundtrip_lengths() {
    let key = [7u8; 32];
    let iv = [9u8; 16];
    for len in [0usize, 1, 15, 16, 17, 100] {
        let data = vec![0xA5u8; len];
        let ct = aes_cbc_encrypt_padded(&key, &iv, &data).unwrap();
        assert_eq!(ct.len(), padded_len(len), "len {len}");
        assert_eq!(aes_cbc_decrypt_padded(&key, &iv, &ct).unwrap(), data);
    }
}
