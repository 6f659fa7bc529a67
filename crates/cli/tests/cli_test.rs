//! Tests for the pdfcrypt CLI tool:
//! - `create` writing a JSON record
//! - `auth` output and exit status
//! - `encrypt` / `decrypt` round trip through files

use std::fs;
use std::path::PathBuf;
use std::process::Command;

/// A fresh path in the temp directory.
fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "pdfcrypt_test_{}_{}_{name}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

/// Run pdfcrypt with given arguments and return (exit_code, stdout, stderr).
fn run_pdfcrypt(args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_pdfcrypt"))
        .args(args)
        .output()
        .expect("Failed to execute pdfcrypt");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Create a record for `algorithm` and return its path.
fn create_record(algorithm: &str) -> PathBuf {
    let record = temp_path(&format!("{algorithm}.json"));
    let (code, _, stderr) = run_pdfcrypt(&[
        "create",
        "-u",
        "reader",
        "-O",
        "publisher",
        "-a",
        algorithm,
        "-i",
        "00112233445566778899aabbccddeeff",
        "-o",
        record.to_str().unwrap(),
    ]);
    assert_eq!(code, 0, "create failed: {stderr}");
    record
}

#[test]
fn test_create_writes_encrypt_dict() {
    let record = create_record("AESV3R6");
    let text = fs::read_to_string(&record).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["document_id"], "00112233445566778899aabbccddeeff");
    assert_eq!(json["encrypt"]["Filter"], "/Standard");
    assert_eq!(json["encrypt"]["V"], 5);
    assert_eq!(json["encrypt"]["R"], 6);
    assert_eq!(json["encrypt"]["P"], -4);
    fs::remove_file(record).ok();
}

#[test]
fn test_auth_reports_password_kind() {
    let record = create_record("RC4V2");
    let path = record.to_str().unwrap();

    let (code, stdout, _) = run_pdfcrypt(&["auth", "-e", path, "-P", "reader"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "user");

    let (code, stdout, _) = run_pdfcrypt(&["auth", "-e", path, "-P", "publisher"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "owner");
    fs::remove_file(record).ok();
}

#[test]
fn test_auth_wrong_password_exits_with_failure() {
    let record = create_record("AESV2");
    let path = record.to_str().unwrap();

    let (code, stdout, stderr) = run_pdfcrypt(&["auth", "-e", path, "-P", "guess"]);
    assert_eq!(code, 1);
    assert_eq!(stdout.trim(), "failed");
    assert!(!stderr.contains("panicked"), "{stderr}");
    fs::remove_file(record).ok();
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    for algorithm in ["RC4V1", "RC4V2", "AESV2", "AESV3R5"] {
        let record = create_record(algorithm);
        let plain = temp_path("plain.bin");
        let sealed = temp_path("sealed.bin");
        let opened = temp_path("opened.bin");
        let payload = b"BT /F1 12 Tf (Quarterly numbers) Tj ET\n".repeat(50);
        fs::write(&plain, &payload).unwrap();

        let record_path = record.to_str().unwrap();
        let (code, _, stderr) = run_pdfcrypt(&[
            "encrypt",
            "-e",
            record_path,
            "-P",
            "publisher",
            "-n",
            "12",
            plain.to_str().unwrap(),
            "-o",
            sealed.to_str().unwrap(),
        ]);
        assert_eq!(code, 0, "{algorithm}: {stderr}");
        assert_ne!(fs::read(&sealed).unwrap(), payload);

        let (code, _, stderr) = run_pdfcrypt(&[
            "decrypt",
            "-e",
            record_path,
            "-P",
            "reader",
            "-n",
            "12",
            sealed.to_str().unwrap(),
            "-o",
            opened.to_str().unwrap(),
        ]);
        assert_eq!(code, 0, "{algorithm}: {stderr}");
        assert_eq!(fs::read(&opened).unwrap(), payload, "{algorithm}");

        for path in [record, plain, sealed, opened] {
            fs::remove_file(path).ok();
        }
    }
}

#[test]
fn test_decrypt_with_wrong_password_fails() {
    let record = create_record("AESV2");
    let input = temp_path("input.bin");
    fs::write(&input, [0u8; 32]).unwrap();

    let (code, _, stderr) = run_pdfcrypt(&[
        "decrypt",
        "-e",
        record.to_str().unwrap(),
        "-P",
        "guess",
        input.to_str().unwrap(),
    ]);
    assert_ne!(code, 0);
    assert!(stderr.contains("incorrect password"), "{stderr}");
    fs::remove_file(record).ok();
    fs::remove_file(input).ok();
}
