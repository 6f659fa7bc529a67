//! Streaming encryption adapters.
//!
//! Readers decrypt a stream's declared length of ciphertext as it is pulled
//! through; the RC4 writer encrypts as it is pushed. Both wrap any
//! `Read`/`Write`, so they stack with filter codecs such as Flate: decrypt
//! first when reading, encrypt last when writing.

use std::io::{self, Read, Take, Write};

use zeroize::Zeroizing;

use crate::codec::aes::{AES_BLOCK_SIZE, AesCbcDecryptor, unpad_aes};
use crate::codec::arcfour::Arcfour;
use crate::error::PdfError;

const CHUNK_SIZE: usize = 4096;

/// Decrypts RC4 ciphertext read from `inner`.
pub struct Rc4DecryptReader<R> {
    inner: Take<R>,
    cipher: Arcfour,
}

impl<R: Read> Rc4DecryptReader<R> {
    /// Decrypt at most `len` bytes of `inner` with a prepared cipher.
    pub fn new(inner: R, len: u64, cipher: Arcfour) -> Self {
        Self {
            inner: inner.take(len),
            cipher,
        }
    }
}

impl<R: Read> Read for Rc4DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.cipher.apply_keystream(&mut buf[..n]);
        Ok(n)
    }
}

enum AesState {
    /// Nothing read yet; the next 16 bytes are the IV. An empty stream
    /// goes straight to `Finished`.
    AwaitingIv,
    /// Decrypting; `held` is the last whole block, kept back in case it
    /// carries the padding.
    Streaming {
        cipher: AesCbcDecryptor,
        held: Option<[u8; AES_BLOCK_SIZE]>,
    },
    /// Ciphertext exhausted; `out` holds the final bytes.
    Draining,
    Finished,
}

/// Decrypts AES-CBC ciphertext (IV prefix, PKCS#7 padding) read from
/// `inner`.
///
/// One block of plaintext is always held back until the end of the
/// ciphertext is seen, so the padding can be stripped before it reaches
/// the caller.
pub struct AesDecryptReader<R> {
    inner: Take<R>,
    key: Zeroizing<Vec<u8>>,
    state: AesState,
    /// Undecrypted bytes short of a whole block.
    pending: Vec<u8>,
    /// Decrypted bytes not yet handed out.
    out: Vec<u8>,
    out_pos: usize,
}

impl<R: Read> AesDecryptReader<R> {
    /// Decrypt at most `len` bytes of `inner`, IV included, under `key`.
    pub fn new(inner: R, len: u64, key: &[u8]) -> Self {
        Self {
            inner: inner.take(len),
            key: Zeroizing::new(key.to_vec()),
            state: AesState::AwaitingIv,
            pending: Vec::new(),
            out: Vec::new(),
            out_pos: 0,
        }
    }

    fn read_iv(&mut self) -> io::Result<()> {
        let mut iv = [0u8; AES_BLOCK_SIZE];
        let mut filled = 0;
        while filled < iv.len() {
            match self.inner.read(&mut iv[filled..]) {
                Ok(0) if filled == 0 => {
                    self.state = AesState::Finished;
                    return Ok(());
                }
                Ok(0) => {
                    return Err(PdfError::UnexpectedEof("AES stream shorter than its IV").into());
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        let cipher = AesCbcDecryptor::new(&self.key, &iv)?;
        self.state = AesState::Streaming { cipher, held: None };
        Ok(())
    }

    /// Pull more ciphertext and move whatever can be released into `out`.
    fn fill(&mut self) -> io::Result<()> {
        let AesState::Streaming { cipher, held } = &mut self.state else {
            return Ok(());
        };

        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        };

        self.out.clear();
        self.out_pos = 0;

        if n == 0 {
            if !self.pending.is_empty() {
                return Err(PdfError::UnexpectedEof("AES ciphertext is not whole blocks").into());
            }
            if let Some(last) = held.take() {
                self.out.extend_from_slice(unpad_aes(&last)?);
            }
            self.state = AesState::Draining;
            return Ok(());
        }

        self.pending.extend_from_slice(&chunk[..n]);
        let whole = self.pending.len() - self.pending.len() % AES_BLOCK_SIZE;
        if whole == 0 {
            return Ok(());
        }

        let mut blocks: Vec<u8> = self.pending.drain(..whole).collect();
        cipher.decrypt_blocks(&mut blocks)?;

        if let Some(prev) = held.take() {
            self.out.extend_from_slice(&prev);
        }
        let (release, last) = blocks.split_at(whole - AES_BLOCK_SIZE);
        self.out.extend_from_slice(release);
        let mut keep = [0u8; AES_BLOCK_SIZE];
        keep.copy_from_slice(last);
        *held = Some(keep);
        Ok(())
    }
}

impl<R: Read> Read for AesDecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.out_pos < self.out.len() {
                let n = buf.len().min(self.out.len() - self.out_pos);
                buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(n);
            }
            match self.state {
                AesState::AwaitingIv => self.read_iv()?,
                AesState::Streaming { .. } => self.fill()?,
                AesState::Draining => self.state = AesState::Finished,
                AesState::Finished => return Ok(0),
            }
        }
    }
}

/// A decrypting reader for either cipher family.
pub enum DecryptReader<R> {
    Rc4(Rc4DecryptReader<R>),
    Aes(AesDecryptReader<R>),
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Rc4(r) => r.read(buf),
            Self::Aes(r) => r.read(buf),
        }
    }
}

/// Encrypts everything written through it with RC4 before passing it on.
pub struct Rc4EncryptWriter<W: Write> {
    inner: W,
    cipher: Arcfour,
    scratch: Vec<u8>,
}

impl<W: Write> Rc4EncryptWriter<W> {
    pub fn new(inner: W, cipher: Arcfour) -> Self {
        Self {
            inner,
            cipher,
            scratch: Vec::new(),
        }
    }

    /// Flush and return the wrapped writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for Rc4EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.cipher.apply_keystream(&mut self.scratch);
        // The keystream has advanced over all of `buf`, so all of it must go out.
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
