//! pdfcrypt - inspect and exercise the PDF standard security handler.
//!
//! `/Encrypt` dictionaries are exchanged as JSON records:
//! `{"document_id": "<hex>", "encrypt": {...}}`, where names are written as
//! `"/Name"` and binary strings as `{"hex": "..."}`.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use pdfcrypt_core::{
    AuthResult, CryptoProvider, Credentials, DocumentSecurity, EncryptOptions,
    EncryptionAlgorithm, PDFDict, PDFObjRef, PDFObject, Permissions,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pdfcrypt")]
#[command(author, version, about = "PDF standard security handler tool", long_about = None)]
struct Cli {
    /// Use debug logging level
    #[arg(short = 'd', long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a fresh /Encrypt dictionary and print it as JSON
    Create(CreateArgs),
    /// Check a password against an /Encrypt dictionary
    Auth(AuthArgs),
    /// Encrypt a file's bytes as the payload of one object
    Encrypt(CipherArgs),
    /// Decrypt a file's bytes as the payload of one object
    Decrypt(CipherArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// User (open) password
    #[arg(short = 'u', long, default_value = "")]
    user: String,

    /// Owner (permissions) password
    #[arg(short = 'O', long, default_value = "")]
    owner: String,

    /// RC4V1, RC4V2, AESV2, AESV3R5 or AESV3R6
    #[arg(short = 'a', long, default_value = "AESV3R6")]
    algorithm: EncryptionAlgorithm,

    /// Key length in bits (RC4V2 only; others are fixed)
    #[arg(short = 'l', long)]
    key_length: Option<u32>,

    /// Comma-separated permissions to grant, e.g. `print,copy`
    #[arg(short = 'p', long, default_value = "all")]
    permissions: String,

    /// Leave metadata streams unencrypted
    #[arg(long, action = ArgAction::SetTrue)]
    no_encrypt_metadata: bool,

    /// First element of the trailer /ID, in hex
    #[arg(short = 'i', long)]
    document_id: String,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,
}

#[derive(Args, Debug)]
struct AuthArgs {
    /// JSON record written by `create`
    #[arg(short = 'e', long)]
    encrypt: PathBuf,

    /// Password to try
    #[arg(short = 'P', long, default_value = "")]
    password: String,
}

#[derive(Args, Debug)]
struct CipherArgs {
    /// JSON record written by `create`
    #[arg(short = 'e', long)]
    encrypt: PathBuf,

    /// Password to authenticate with
    #[arg(short = 'P', long, default_value = "")]
    password: String,

    /// Object number the data belongs to
    #[arg(short = 'n', long, default_value_t = 1)]
    objid: u32,

    /// Generation number the data belongs to
    #[arg(short = 'g', long, default_value_t = 0)]
    genno: u32,

    /// Input file
    input: PathBuf,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,
}

#[derive(Serialize, Deserialize)]
struct Record {
    document_id: String,
    encrypt: Value,
}

fn to_json(obj: &PDFObject) -> Result<Value> {
    Ok(match obj {
        PDFObject::Null => Value::Null,
        PDFObject::Bool(b) => json!(b),
        PDFObject::Int(n) => json!(n),
        PDFObject::Real(n) => json!(n),
        PDFObject::Name(name) => json!(format!("/{name}")),
        PDFObject::String(bytes) => json!({ "hex": hex::encode(bytes) }),
        PDFObject::Array(items) => Value::Array(items.iter().map(to_json).collect::<Result<_>>()?),
        PDFObject::Dict(dict) => Value::Object(dict_to_json(dict)?),
        other => bail!("{} cannot appear in /Encrypt", other.type_name()),
    })
}

fn dict_to_json(dict: &PDFDict) -> Result<Map<String, Value>> {
    let mut keys: Vec<&String> = dict.keys().collect();
    keys.sort();
    let mut map = Map::new();
    for key in keys {
        map.insert(key.clone(), to_json(&dict[key])?);
    }
    Ok(map)
}

fn from_json(value: &Value) -> Result<PDFObject> {
    Ok(match value {
        Value::Null => PDFObject::Null,
        Value::Bool(b) => PDFObject::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PDFObject::Int(i),
            None => PDFObject::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => match s.strip_prefix('/') {
            Some(name) => PDFObject::name(name),
            None => PDFObject::string(s.as_bytes()),
        },
        Value::Array(items) => {
            PDFObject::Array(items.iter().map(from_json).collect::<Result<_>>()?)
        }
        Value::Object(map) => match map.get("hex") {
            Some(Value::String(h)) if map.len() == 1 => {
                PDFObject::string(hex::decode(h).context("invalid hex string")?)
            }
            _ => PDFObject::Dict(dict_from_json(map)?),
        },
    })
}

fn dict_from_json(map: &Map<String, Value>) -> Result<PDFDict> {
    let mut dict = PDFDict::with_capacity(map.len());
    for (key, value) in map {
        dict.insert(key.clone(), from_json(value)?);
    }
    Ok(dict)
}

fn open_output(outfile: &str) -> Result<Box<dyn Write>> {
    Ok(if outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(outfile).with_context(|| format!("creating {outfile}"))?;
        Box::new(BufWriter::new(file))
    })
}

/// Load a record and authenticate against it.
fn open_record(path: &PathBuf, password: &str) -> Result<DocumentSecurity> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let record: Record = serde_json::from_str(&text).context("parsing encryption record")?;
    let document_id = hex::decode(&record.document_id).context("invalid document_id")?;
    let Value::Object(map) = &record.encrypt else {
        bail!("\"encrypt\" must be a JSON object");
    };
    let dict = dict_from_json(map)?;
    let security = DocumentSecurity::open(&dict, &document_id, password, CryptoProvider::system())?;
    debug!(
        algorithm = %security.handler().algorithm(),
        result = security.auth_result().as_str(),
        "opened record"
    );
    Ok(security)
}

fn create(args: &CreateArgs) -> Result<()> {
    let permissions = Permissions::parse_list(&args.permissions)
        .ok_or_else(|| anyhow!("unknown permission in {:?}", args.permissions))?;
    let mut options = EncryptOptions::new(args.algorithm)
        .with_permissions(permissions)
        .with_encrypt_metadata(!args.no_encrypt_metadata);
    if let Some(bits) = args.key_length {
        options = options.with_key_length(bits);
    }
    let document_id = hex::decode(&args.document_id).context("invalid --document-id")?;
    let credentials = Credentials::new(args.user.as_str(), args.owner.as_str());

    let security =
        DocumentSecurity::create(&credentials, &options, &document_id, CryptoProvider::system())?;
    let record = Record {
        document_id: args.document_id.to_ascii_lowercase(),
        encrypt: Value::Object(dict_to_json(&security.encryption_dict()?)?),
    };

    let mut out = open_output(&args.outfile)?;
    serde_json::to_writer_pretty(&mut out, &record)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Exits with status 1 when the password is rejected.
fn auth(args: &AuthArgs) -> Result<ExitCode> {
    let security = open_record(&args.encrypt, &args.password)?;
    let result = security.auth_result();
    println!("{}", result.as_str());
    Ok(if result == AuthResult::Failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn authenticated(args: &CipherArgs) -> Result<DocumentSecurity> {
    let security = open_record(&args.encrypt, &args.password)?;
    if !security.is_authenticated() {
        bail!("incorrect password");
    }
    Ok(security)
}

fn encrypt(args: &CipherArgs) -> Result<()> {
    let mut security = authenticated(args)?;
    let r = PDFObjRef::new(args.objid, args.genno);
    let mut out = open_output(&args.outfile)?;

    if security.handler().algorithm().is_rc4() {
        let mut input = BufReader::new(File::open(&args.input)?);
        let mut writer = security.encrypt_stream_writer(r, &mut out)?;
        io::copy(&mut input, &mut writer)?;
        writer.finish()?;
    } else {
        let data = fs::read(&args.input)?;
        out.write_all(&security.encrypt_data(r, &data)?)?;
    }
    out.flush()?;
    Ok(())
}

fn decrypt(args: &CipherArgs) -> Result<()> {
    let mut security = authenticated(args)?;
    let r = PDFObjRef::new(args.objid, args.genno);
    let file = File::open(&args.input)?;
    let len = file.metadata()?.len();

    let mut reader = security.decrypt_stream_reader(r, BufReader::new(file), len)?;
    let mut out = open_output(&args.outfile)?;
    io::copy(&mut reader, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Create(args) => create(args)?,
        Command::Auth(args) => return auth(args),
        Command::Encrypt(args) => encrypt(args)?,
        Command::Decrypt(args) => decrypt(args)?,
    }
    Ok(ExitCode::SUCCESS)
}
