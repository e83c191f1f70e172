//! Hashing primitives shared by the seed chain, the store and the auditor

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Default number of leading shard bytes covered by content hashes and
/// audit tokens (1 MiB).
pub const DEFAULT_HASH_PREFIX: u64 = 1024 * 1024;

/// SHA256 of a single input
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hex-encoded SHA256 of a single input
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// How much of a shard's content goes into a content hash or audit token.
///
/// Hashing a whole shard costs as much as reading it, which for shards of
/// hundreds of megabytes dominates audit latency. `Prefix` bounds that cost
/// at the price of only covering the first `n` bytes: corruption past the
/// prefix is not detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScope {
    /// Hash the entire content
    Full,
    /// Hash at most the first `n` bytes
    Prefix(u64),
}

impl HashScope {
    /// Upper bound on the bytes hashed from any one shard
    pub fn limit(&self) -> u64 {
        match *self {
            HashScope::Full => u64::MAX,
            HashScope::Prefix(n) => n,
        }
    }

    /// Number of bytes hashed out of a shard of `len` bytes
    pub fn covered(&self, len: u64) -> u64 {
        self.limit().min(len)
    }
}

impl Default for HashScope {
    fn default() -> Self {
        HashScope::Prefix(DEFAULT_HASH_PREFIX)
    }
}

/// A `Write` sink that feeds a SHA256 hasher, ignoring everything past
/// `limit` bytes.
pub struct HashingWriter {
    hasher: Sha256,
    remaining: u64,
}

impl HashingWriter {
    /// Hasher covering at most `limit` bytes
    pub fn new(limit: u64) -> Self {
        Self {
            hasher: Sha256::new(),
            remaining: limit,
        }
    }

    /// Hasher covering at most `limit` bytes, seeded with `prefix`.
    ///
    /// `prefix` does not count against the limit.
    pub fn with_prefix(prefix: &[u8], limit: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(prefix);
        Self {
            hasher,
            remaining: limit,
        }
    }

    /// Feed everything `reader` yields, up to the remaining limit
    pub fn consume<R: Read>(&mut self, reader: R) -> io::Result<u64> {
        let limit = self.remaining;
        io::copy(&mut reader.take(limit), self)
    }

    /// Hex-encoded digest of everything fed so far
    pub fn finish_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Write for HashingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let take = (buf.len() as u64).min(self.remaining) as usize;
        self.hasher.update(&buf[..take]);
        self.remaining -= take as u64;
        // Report the whole buffer as written so callers can keep streaming
        // past the limit.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A writer that forwards to `inner` and mirrors every byte into a
/// [`HashingWriter`].
pub struct TeeWriter<W> {
    inner: W,
    hash: HashingWriter,
}

impl<W: Write> TeeWriter<W> {
    pub fn new(inner: W, hash: HashingWriter) -> Self {
        Self { inner, hash }
    }

    /// Split back into the inner writer and the digest so far
    pub fn into_parts(self) -> (W, String) {
        (self.inner, self.hash.finish_hex())
    }
}

impl<W: Write> Write for TeeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hash.write_all(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
