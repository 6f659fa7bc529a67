//! `/Encrypt` dictionary codec for the standard security handler.

use tracing::{debug, warn};

use super::aesv3::AesV3Parameters;
use super::algorithm::EncryptionAlgorithm;
use super::handler::PdfEncrypt;
use super::legacy::LegacyParameters;
use super::provider::CryptoProvider;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};

const STD_CF: &str = "StdCF";

fn missing(key: &str) -> PdfError {
    PdfError::InvalidEncryptionDict(format!("missing /{key} in /Encrypt"))
}

fn get_int(encrypt: &PDFDict, key: &str) -> Result<i64> {
    encrypt.get(key).ok_or_else(|| missing(key))?.as_int()
}

fn get_int_default(encrypt: &PDFDict, key: &str, default: i64) -> i64 {
    encrypt
        .get(key)
        .and_then(|v| v.as_int().ok())
        .unwrap_or(default)
}

fn get_bool_default(encrypt: &PDFDict, key: &str, default: bool) -> bool {
    encrypt
        .get(key)
        .and_then(|v| v.as_bool().ok())
        .unwrap_or(default)
}

fn get_bytes<'a>(encrypt: &'a PDFDict, key: &str) -> Result<&'a [u8]> {
    encrypt.get(key).ok_or_else(|| missing(key))?.as_string()
}

/// Read a string entry of exactly `N` bytes.
///
/// Shorter values are rejected. Longer ones are cut to `N` bytes with a
/// warning; some writers pad `/O` and `/U` with trailing garbage.
fn get_fixed<const N: usize>(encrypt: &PDFDict, key: &str) -> Result<[u8; N]> {
    let bytes = get_bytes(encrypt, key)?;
    if bytes.len() < N {
        return Err(PdfError::InvalidEncryptionDict(format!(
            "/{key} is {} bytes, expected {N}",
            bytes.len()
        )));
    }
    if bytes.len() > N {
        warn!(key, len = bytes.len(), expected = N, "truncating over-long /Encrypt value");
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    Ok(out)
}

/// `/P` is a signed 32-bit integer on disk; keep its low 32 bits.
fn get_p(encrypt: &PDFDict) -> Result<u32> {
    Ok((get_int(encrypt, "P")? & 0xFFFF_FFFF) as u32)
}

/// `/CFM` of the crypt filter named by `/StmF`, if any.
fn stream_filter_method(encrypt: &PDFDict) -> Option<&str> {
    let name = encrypt.get("StmF")?.as_name().ok()?;
    let filters = encrypt.get("CF")?.as_dict().ok()?;
    filters.get(name)?.as_dict().ok()?.get("CFM")?.as_name().ok()
}

/// Round an RC4 key length down to a whole byte and into 40..=128 bits.
fn normalize_rc4_bits(bits: i64) -> usize {
    let bits = bits.clamp(40, 128) as usize;
    bits - bits % 8
}

impl PdfEncrypt {
    /// Parse an `/Encrypt` dictionary.
    ///
    /// The handler still has to be authenticated before it can decrypt
    /// anything.
    pub fn from_dict(encrypt: &PDFDict, provider: &CryptoProvider) -> Result<Self> {
        let filter = encrypt
            .get("Filter")
            .and_then(|v| v.as_name().ok())
            .unwrap_or_default();
        if filter != "Standard" {
            return Err(PdfError::UnsupportedFilter(if filter.is_empty() {
                "missing /Filter".into()
            } else {
                filter.to_owned()
            }));
        }

        let v = get_int_default(encrypt, "V", 0);
        let r = get_int(encrypt, "R")?;
        let cfm = stream_filter_method(encrypt);

        let algorithm = match (v, r) {
            (1, 2 | 3) => EncryptionAlgorithm::Rc4V1,
            (2, 3) => EncryptionAlgorithm::Rc4V2,
            (5, 5) => EncryptionAlgorithm::AesV3R5,
            (5, 6) => EncryptionAlgorithm::AesV3R6,
            _ if cfm == Some("V2") => EncryptionAlgorithm::Rc4V2,
            (4, 4) => EncryptionAlgorithm::AesV2,
            _ => {
                return Err(PdfError::UnsupportedFilter(format!(
                    "standard security handler V={v} R={r}"
                )));
            }
        };
        provider.require(algorithm)?;
        debug!(%algorithm, v, r, cfm = cfm.unwrap_or("none"), "parsed /Encrypt");

        let revision = u8::try_from(r)
            .map_err(|_| PdfError::InvalidEncryptionDict(format!("/R {r} is out of range")))?;
        let p = get_p(encrypt)?;
        let encrypt_metadata = get_bool_default(encrypt, "EncryptMetadata", true);

        if algorithm.is_legacy() {
            let key_length = match algorithm {
                EncryptionAlgorithm::Rc4V1 => 5,
                EncryptionAlgorithm::Rc4V2 => {
                    normalize_rc4_bits(get_int_default(encrypt, "Length", 40)) / 8
                }
                _ => 16,
            };
            let params = LegacyParameters {
                algorithm,
                revision,
                key_length,
                o: get_fixed(encrypt, "O")?,
                u: get_fixed(encrypt, "U")?,
                p,
                encrypt_metadata,
            };
            return Ok(if algorithm == EncryptionAlgorithm::AesV2 {
                Self::AesV2(params)
            } else {
                Self::Rc4(params)
            });
        }

        Ok(Self::AesV3(AesV3Parameters {
            revision,
            o: get_fixed(encrypt, "O")?,
            u: get_fixed(encrypt, "U")?,
            oe: get_fixed(encrypt, "OE")?,
            ue: get_fixed(encrypt, "UE")?,
            perms: get_fixed(encrypt, "Perms")?,
            p,
            encrypt_metadata,
        }))
    }

    /// Serialise the `/Encrypt` dictionary.
    pub fn to_dict(&self) -> Result<PDFDict> {
        let mut dict = PDFDict::new();
        dict.insert("Filter".into(), PDFObject::name("Standard"));
        dict.insert("P".into(), PDFObject::Int(i64::from(self.p_value() as i32)));
        if !self.encrypt_metadata() {
            dict.insert("EncryptMetadata".into(), PDFObject::Bool(false));
        }

        match self {
            Self::Rc4(params) | Self::AesV2(params) => {
                let crypt_filter = match params.algorithm {
                    EncryptionAlgorithm::AesV2 => Some("AESV2"),
                    EncryptionAlgorithm::Rc4V1 if !params.encrypt_metadata => {
                        return Err(PdfError::InvalidEncryptionDict(
                            "RC4V1 cannot leave metadata unencrypted".into(),
                        ));
                    }
                    _ if !params.encrypt_metadata => Some("V2"),
                    _ => None,
                };
                match crypt_filter {
                    Some(cfm) => {
                        dict.insert("V".into(), PDFObject::Int(4));
                        dict.insert("R".into(), PDFObject::Int(4));
                        insert_crypt_filter(&mut dict, cfm, 16);
                    }
                    None if params.algorithm == EncryptionAlgorithm::Rc4V1 => {
                        dict.insert("V".into(), PDFObject::Int(1));
                        dict.insert("R".into(), PDFObject::Int(params.revision.into()));
                    }
                    None => {
                        dict.insert("V".into(), PDFObject::Int(2));
                        dict.insert("R".into(), PDFObject::Int(3));
                    }
                }
                if params.algorithm != EncryptionAlgorithm::Rc4V1 {
                    dict.insert("Length".into(), PDFObject::Int(self.key_length().into()));
                }
                dict.insert("O".into(), PDFObject::string(params.o));
                dict.insert("U".into(), PDFObject::string(params.u));
            }
            Self::AesV3(params) => {
                dict.insert("V".into(), PDFObject::Int(5));
                dict.insert("R".into(), PDFObject::Int(params.revision.into()));
                dict.insert("Length".into(), PDFObject::Int(256));
                insert_crypt_filter(&mut dict, "AESV3", 32);
                dict.insert("O".into(), PDFObject::string(params.o));
                dict.insert("U".into(), PDFObject::string(params.u));
                dict.insert("OE".into(), PDFObject::string(params.oe));
                dict.insert("UE".into(), PDFObject::string(params.ue));
                dict.insert("Perms".into(), PDFObject::string(params.perms));
            }
        }
        Ok(dict)
    }
}

/// `/CF << /StdCF << ... >> >>` with `/StmF` and `/StrF` pointing at it.
fn insert_crypt_filter(dict: &mut PDFDict, cfm: &str, length: i64) {
    let mut filter = PDFDict::new();
    filter.insert("CFM".into(), PDFObject::name(cfm));
    filter.insert("Length".into(), PDFObject::Int(length));
    filter.insert("AuthEvent".into(), PDFObject::name("DocOpen"));

    let mut filters = PDFDict::new();
    filters.insert(STD_CF.into(), PDFObject::Dict(filter));
    dict.insert("CF".into(), PDFObject::Dict(filters));
    dict.insert("StmF".into(), PDFObject::name(STD_CF));
    dict.insert("StrF".into(), PDFObject::name(STD_CF));
}
