//! Arcfour (RC4) stream cipher.
//!
//! RC4 implementation supporting variable-length keys, plus a
//! one-slot key-schedule cache used by the streaming adapters: consecutive
//! streams encrypted under the same object key start from the cached
//! permutation instead of re-running the key schedule.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Longest key the schedule cache remembers (an MD5-derived object key).
const CACHED_KEY_MAX: usize = 16;

/// RC4 stream cipher.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Arcfour {
    state: [u8; 256],
    i: u8,
    j: u8,
}

impl Arcfour {
    /// Create new Arcfour cipher with key.
    pub fn new(key: &[u8]) -> Self {
        Self::from_table(key_schedule(key))
    }

    /// Create a cipher, reusing the permutation in `cache` when it was
    /// computed for the same key and refreshing the cache otherwise.
    pub fn with_cache(key: &[u8], cache: &mut Rc4ScheduleCache) -> Self {
        if let Some(table) = cache.lookup(key) {
            return Self::from_table(table);
        }
        let table = key_schedule(key);
        cache.store(key, &table);
        Self::from_table(table)
    }

    const fn from_table(state: [u8; 256]) -> Self {
        Self { state, i: 0, j: 0 }
    }

    /// Encrypt/decrypt data (RC4 is symmetric).
    pub fn process(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.apply_keystream(&mut out);
        out
    }

    /// XOR the next `buf.len()` keystream bytes into `buf` in place.
    pub fn apply_keystream(&mut self, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte ^= self.prga();
        }
    }

    /// Pseudo-random generation algorithm (PRGA).
    fn prga(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.state[self.i as usize]);
        self.state.swap(self.i as usize, self.j as usize);

        let idx = self.state[self.i as usize].wrapping_add(self.state[self.j as usize]);
        self.state[idx as usize]
    }
}

/// Key-scheduling algorithm (KSA).
///
/// Only the first 256 key bytes take part; an empty key schedules like a
/// single zero byte.
fn key_schedule(key: &[u8]) -> [u8; 256] {
    let key: &[u8] = if key.is_empty() { &[0] } else { key };

    let mut state: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }
    state
}

/// The last RC4 key and the permutation table its key schedule produced.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct Rc4ScheduleCache {
    key: [u8; CACHED_KEY_MAX],
    key_len: usize,
    table: Option<[u8; 256]>,
}

impl Rc4ScheduleCache {
    fn lookup(&self, key: &[u8]) -> Option<[u8; 256]> {
        match &self.table {
            Some(table) if self.key_len == key.len() && self.key[..self.key_len] == *key => {
                Some(*table)
            }
            _ => None,
        }
    }

    fn store(&mut self, key: &[u8], table: &[u8; 256]) {
        if key.len() > CACHED_KEY_MAX {
            return;
        }
        self.key.zeroize();
        self.key[..key.len()].copy_from_slice(key);
        self.key_len = key.len();
        self.table = Some(*table);
    }

    /// Whether the cache currently holds a schedule for `key`.
    pub fn holds(&self, key: &[u8]) -> bool {
        self.lookup(key).is_some()
    }
}
