use std::io::Read;

use pdfcrypt_core::{
    AuthResult, CryptoProvider, Credentials, DocumentSecurity, EncryptOptions,
    EncryptionAlgorithm, PDFDict, PDFObjRef, PDFObject, PDFStream, Permissions,
};

const DOC_ID: &[u8] = b"\x01\x23\x45\x67\x89\xab\xcd\xefdocsec!";

fn writer(algorithm: EncryptionAlgorithm) -> DocumentSecurity {
    writer_with(EncryptOptions::new(algorithm))
}

fn writer_with(options: EncryptOptions) -> DocumentSecurity {
    DocumentSecurity::create(
        &Credentials::new("open sesame", "master"),
        &options,
        DOC_ID,
        CryptoProvider::system(),
    )
    .unwrap()
}

fn reader(writer: &DocumentSecurity, password: &str) -> DocumentSecurity {
    let dict = writer.encryption_dict().unwrap();
    DocumentSecurity::open(&dict, DOC_ID, password, CryptoProvider::system()).unwrap()
}

fn dict(entries: Vec<(&str, PDFObject)>) -> PDFDict {
    entries.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()
}

/// An annotation-like object with strings at several depths and a content
/// stream.
fn sample_page() -> PDFObject {
    let annot = dict(vec![
        ("Type", PDFObject::name("Annot")),
        ("Contents", PDFObject::string(&b"Reviewed (draft)"[..])),
        ("Rect", PDFObject::Array(vec![PDFObject::Int(0), PDFObject::Real(1.5)])),
        ("P", PDFObject::Ref(PDFObjRef::new(3, 0))),
    ]);
    let stream = PDFStream::new(
        dict(vec![
            ("Length", PDFObject::Int(44)),
            ("Title", PDFObject::string(&b"content"[..])),
        ]),
        b"BT /F1 24 Tf 100 700 Td (Hello World) Tj ET".to_vec(),
    );
    PDFObject::Array(vec![
        PDFObject::string(&b"top-level"[..]),
        PDFObject::Dict(annot),
        PDFObject::Stream(Box::new(stream)),
        PDFObject::Array(vec![PDFObject::string(Vec::new()), PDFObject::Null]),
        PDFObject::name("Untouched"),
    ])
}

#[test]
fn open_reports_password_kind() {
    for algorithm in EncryptionAlgorithm::ALL {
        let w = writer(algorithm);
        assert_eq!(w.auth_result(), AuthResult::Owner);
        assert_eq!(reader(&w, "open sesame").auth_result(), AuthResult::User);
        assert_eq!(reader(&w, "master").auth_result(), AuthResult::Owner);

        let failed = reader(&w, "guess");
        assert_eq!(failed.auth_result(), AuthResult::Failed);
        assert!(!failed.is_authenticated());
    }
}

#[test]
fn retry_after_wrong_password() {
    let w = writer(EncryptionAlgorithm::AesV3R6);
    let mut r = reader(&w, "nope");
    assert!(r.decrypt_data(PDFObjRef::new(1, 0), &[0u8; 32]).is_err());

    assert_eq!(r.try_password("master").unwrap(), AuthResult::Owner);
    assert!(r.is_authenticated());

    assert_eq!(r.try_password("still wrong").unwrap(), AuthResult::Failed);
    assert!(!r.is_authenticated());
}

#[test]
fn object_round_trip() {
    for algorithm in EncryptionAlgorithm::ALL {
        let mut w = writer(algorithm);
        let r = PDFObjRef::new(17, 2);
        let plain = sample_page();

        let encrypted = w.encrypt_object(plain.clone(), r).unwrap();
        assert_ne!(encrypted, plain, "{algorithm}");
        let PDFObject::Array(items) = &encrypted else {
            panic!("shape changed");
        };
        assert_eq!(items[4], PDFObject::name("Untouched"));
        assert_ne!(items[0], PDFObject::string(&b"top-level"[..]));

        let mut user = reader(&w, "open sesame");
        assert_eq!(user.decrypt_object(encrypted.clone(), r).unwrap(), plain, "{algorithm}");

        // Legacy keys are per object; AES-256 uses the file key throughout.
        let mut owner = reader(&w, "master");
        let other = owner.decrypt_object(encrypted, PDFObjRef::new(18, 2));
        if algorithm.is_legacy() {
            assert!(other.map_or(true, |obj| obj != plain), "{algorithm}");
        } else {
            assert_eq!(other.unwrap(), plain);
        }
    }
}

#[test]
fn data_round_trip_lengths() {
    for algorithm in EncryptionAlgorithm::ALL {
        let mut w = writer(algorithm);
        let r = reader(&w, "open sesame");
        for len in [0usize, 1, 15, 16, 17, 1000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
            let obj = PDFObjRef::new(len as u32 + 1, 0);
            let ciphertext = w.encrypt_data(obj, &data).unwrap();
            assert_eq!(ciphertext.len(), w.encrypted_length(len), "{algorithm} len {len}");
            assert_eq!(r.decrypt_data(obj, &ciphertext).unwrap(), data, "{algorithm} len {len}");
        }
    }
}

#[test]
fn aes_encryption_uses_fresh_ivs() {
    let mut w = writer(EncryptionAlgorithm::AesV2);
    let r = PDFObjRef::new(5, 0);
    let a = w.encrypt_data(r, b"same plaintext").unwrap();
    let b = w.encrypt_data(r, b"same plaintext").unwrap();
    assert_ne!(a[..16], b[..16]);
    assert_eq!(w.decrypt_data(r, &a).unwrap(), w.decrypt_data(r, &b).unwrap());
}

#[test]
fn stream_reader_matches_decrypt_data() {
    for algorithm in EncryptionAlgorithm::ALL {
        let mut w = writer(algorithm);
        let obj = PDFObjRef::new(9, 0);
        let plain = b"0 0 612 792 re W n /Im1 Do".repeat(30);
        let ciphertext = w.encrypt_data(obj, &plain).unwrap();

        let mut r = reader(&w, "open sesame");
        let mut out = Vec::new();
        r.decrypt_stream_reader(obj, &ciphertext[..], ciphertext.len() as u64)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, plain, "{algorithm}");
    }
}

#[test]
fn unencrypted_metadata_passes_through() {
    let options = EncryptOptions::new(EncryptionAlgorithm::AesV3R6).with_encrypt_metadata(false);
    let mut w = writer_with(options);
    let xmp = b"<?xpacket begin=''?><x:xmpmeta/>".to_vec();
    let metadata = PDFObject::Stream(Box::new(PDFStream::new(
        dict(vec![
            ("Type", PDFObject::name("Metadata")),
            ("Subtype", PDFObject::name("XML")),
        ]),
        xmp.clone(),
    )));

    let encrypted = w.encrypt_object(metadata.clone(), PDFObjRef::new(30, 0)).unwrap();
    assert_eq!(encrypted, metadata);

    let mut r = reader(&w, "open sesame");
    assert!(!r.handler().encrypt_metadata());
    let decrypted = r.decrypt_object(encrypted, PDFObjRef::new(30, 0)).unwrap();
    assert_eq!(decrypted.as_stream().unwrap().data(), &xmp[..]);
}

#[test]
fn permissions_survive_reopen() {
    let granted = Permissions::PRINT | Permissions::ACCESSIBLE | Permissions::FILL_AND_SIGN;
    let options = EncryptOptions::new(EncryptionAlgorithm::AesV3R6).with_permissions(granted);
    let w = writer_with(options);
    let r = reader(&w, "open sesame");

    assert_eq!(r.permissions(), granted);
    assert!(r.is_allowed(Permissions::PRINT));
    assert!(r.is_allowed(Permissions::PRINT | Permissions::ACCESSIBLE));
    assert!(!r.is_allowed(Permissions::COPY));
    assert!(!r.is_allowed(Permissions::PRINT | Permissions::EDIT));
    assert!(r.handler().is_fill_and_sign_allowed());
    assert!(!r.handler().is_doc_assembly_allowed());
}

#[test]
fn empty_user_password_opens_without_prompt() {
    let options = EncryptOptions::new(EncryptionAlgorithm::Rc4V2);
    let w = DocumentSecurity::create(
        &Credentials::new("", "owner-only"),
        &options,
        DOC_ID,
        CryptoProvider::system(),
    )
    .unwrap();
    assert_eq!(reader(&w, "").auth_result(), AuthResult::User);
    assert_eq!(reader(&w, "owner-only").auth_result(), AuthResult::Owner);
}

#[test]
fn unicode_passwords() {
    let w = DocumentSecurity::create(
        &Credentials::new("pässwörd", "ｍａｓｔｅｒ"),
        &EncryptOptions::new(EncryptionAlgorithm::AesV3R6),
        DOC_ID,
        CryptoProvider::system(),
    )
    .unwrap();
    assert_eq!(reader(&w, "pässwörd").auth_result(), AuthResult::User);
    // SASLprep maps full-width forms to ASCII.
    assert_eq!(reader(&w, "master").auth_result(), AuthResult::Owner);
}
