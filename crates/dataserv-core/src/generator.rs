//! Deterministic shard content
//!
//! Content is the concatenation of blocks `SHA256(hex(seed) || k)` for
//! `k = 0, 1, 2, ...` (`k` as a big-endian u64), truncated to the requested
//! length. Output depends only on `(seed, length)`, and shorter outputs are
//! prefixes of longer ones for the same seed.

use std::io::{self, Write};

use sha2::{Digest, Sha256};

use crate::seed::Seed;

/// Size of one generated block (one SHA256 digest)
pub const BLOCK_SIZE: usize = 32;

/// Bytes buffered before each write to the destination
const CHUNK_SIZE: usize = 64 * 1024;

/// Stream exactly `length` bytes of content for `seed` into `writer`.
///
/// Memory use does not depend on `length`.
pub fn generate_into<W: Write>(seed: &Seed, length: u64, writer: &mut W) -> io::Result<()> {
    let mut base = Sha256::new();
    base.update(seed.to_hex().as_bytes());

    let mut chunk = Vec::with_capacity(CHUNK_SIZE);
    let mut remaining = length;
    let mut counter: u64 = 0;

    while remaining > 0 {
        let mut hasher = base.clone();
        hasher.update(counter.to_be_bytes());
        let block = hasher.finalize();
        counter += 1;

        let take = (remaining as usize).min(BLOCK_SIZE);
        chunk.extend_from_slice(&block[..take]);
        remaining -= take as u64;

        if chunk.len() >= CHUNK_SIZE {
            writer.write_all(&chunk)?;
            chunk.clear();
        }
    }

    if !chunk.is_empty() {
        writer.write_all(&chunk)?;
    }
    Ok(())
}

/// Generate `length` bytes of content for `seed` in memory.
///
/// Only meant for small lengths; shards should go through [`generate_into`].
pub fn generate(seed: &Seed, length: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(length);
    // Writing into a Vec cannot fail
    let _ = generate_into(seed, length as u64, &mut out);
    out
}
