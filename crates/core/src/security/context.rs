//! Per-document encryption state.

use rand::SeedableRng;
use rand::rngs::StdRng;
use zeroize::Zeroizing;

use crate::codec::arcfour::Rc4ScheduleCache;
use crate::error::{PdfError, Result};

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthResult {
    /// No attempt has been made yet.
    #[default]
    Unknown,
    /// The password matched the user password.
    User,
    /// The password matched the owner password.
    Owner,
    /// The password matched neither.
    Failed,
}

impl AuthResult {
    pub const fn is_success(self) -> bool {
        matches!(self, Self::User | Self::Owner)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::User => "user",
            Self::Owner => "owner",
            Self::Failed => "failed",
        }
    }
}

/// Mutable state shared by every object cipher call on one document.
///
/// Holds the file encryption key once authentication succeeded (or fresh
/// parameters were generated), the document ID the key was derived from,
/// the RC4 key-schedule cache used by the streaming adapters and the
/// random source for AES IVs. Key material is wiped on drop.
///
/// A context belongs to one thread of work. For parallel decryption,
/// [`fork`](Self::fork) it: forks share the key bytes but nothing mutable.
pub struct EncryptionContext {
    key: Zeroizing<Vec<u8>>,
    auth: AuthResult,
    document_id: Vec<u8>,
    rc4_cache: Rc4ScheduleCache,
    rng: StdRng,
}

impl EncryptionContext {
    /// A fresh, unauthenticated context seeded from the OS entropy source.
    pub fn new(document_id: &[u8]) -> Self {
        Self::with_rng(document_id, StdRng::from_entropy())
    }

    /// A fresh context drawing IVs from `rng`.
    pub fn with_rng(document_id: &[u8], rng: StdRng) -> Self {
        Self {
            key: Zeroizing::new(Vec::new()),
            auth: AuthResult::Unknown,
            document_id: document_id.to_vec(),
            rc4_cache: Rc4ScheduleCache::default(),
            rng,
        }
    }

    /// An independent context with the same key and authentication state.
    pub fn fork(&self) -> Self {
        let mut forked = Self::new(&self.document_id);
        forked.key = self.key.clone();
        forked.auth = self.auth;
        forked
    }

    pub const fn auth_result(&self) -> AuthResult {
        self.auth
    }

    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_success()
    }

    pub fn document_id(&self) -> &[u8] {
        &self.document_id
    }

    /// The file encryption key.
    ///
    /// Fails with [`PdfError::InternalLogic`] until authentication has
    /// succeeded; an unauthenticated context must never reach a cipher.
    pub fn key(&self) -> Result<&[u8]> {
        if !self.is_authenticated() {
            return Err(PdfError::InternalLogic(format!(
                "encryption context used before successful authentication ({})",
                self.auth.as_str()
            )));
        }
        Ok(&self.key)
    }

    pub(crate) fn set_key(&mut self, key: Zeroizing<Vec<u8>>, auth: AuthResult) {
        self.key = key;
        self.auth = auth;
    }

    /// Record a failed attempt, discarding any key from an earlier one.
    pub(crate) fn set_failed(&mut self) {
        self.key = Zeroizing::new(Vec::new());
        self.auth = AuthResult::Failed;
    }

    /// The key together with the RC4 schedule cache.
    pub(crate) fn key_and_rc4_cache(&mut self) -> Result<(&[u8], &mut Rc4ScheduleCache)> {
        self.key()?;
        Ok((&self.key, &mut self.rc4_cache))
    }

    /// The key together with the IV source.
    pub(crate) fn key_and_rng(&mut self) -> Result<(&[u8], &mut StdRng)> {
        self.key()?;
        Ok((&self.key, &mut self.rng))
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn rc4_cache(&self) -> &Rc4ScheduleCache {
        &self.rc4_cache
    }
}
