//! Deterministic seed chain rooted at a client identity
//!
//! ```text
//! seed(0) = SHA256(identity)
//! seed(n) = SHA256(hex(seed(n - 1)))
//! ```
//!
//! Every seed names one shard file and drives its content, so anyone who
//! knows the identity can regenerate the whole shard set without ever
//! seeing the client's disk.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::sha256;
use crate::error::{Error, Result};

/// One link of the seed chain (SHA256 digest, 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Create a new Seed from bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, also used as the shard's file name
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Short display format (first 4 bytes as hex)
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// The next link of the chain
    pub fn next(&self) -> Seed {
        Seed(sha256(self.to_hex().as_bytes()))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Seed {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Seed::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Seed chain for one client identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedChain {
    identity: String,
    root: Seed,
}

impl SeedChain {
    /// Create the chain for `identity`
    pub fn new(identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let root = Seed(sha256(identity.as_bytes()));
        Self { identity, root }
    }

    /// The identity this chain is rooted at
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Seed at index `n`. Costs `n + 1` hashes.
    pub fn build_seed(&self, n: u64) -> Seed {
        let mut seed = self.root;
        for _ in 0..n {
            seed = seed.next();
        }
        seed
    }

    /// Seed at a signed index, rejecting negative values
    pub fn seed_at(&self, n: i64) -> Result<Seed> {
        let n = u64::try_from(n)
            .map_err(|_| Error::InvalidArgument(format!("negative seed index {}", n)))?;
        Ok(self.build_seed(n))
    }

    /// Infinite iterator over `seed(0), seed(1), ...`
    pub fn iter(&self) -> Seeds {
        Seeds {
            next: Some(self.root),
        }
    }
}

/// Iterator over the seed chain, see [`SeedChain::iter`]
#[derive(Debug, Clone)]
pub struct Seeds {
    next: Option<Seed>,
}

impl Iterator for Seeds {
    type Item = Seed;

    fn next(&mut self) -> Option<Seed> {
        let current = self.next?;
        self.next = Some(current.next());
        Some(current)
    }
}
