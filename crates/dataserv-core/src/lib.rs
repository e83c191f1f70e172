//! dataserv core - deterministic shard engine for storage capacity proofs
//!
//! A client commits to holding `height` shards of `shard_size` bytes. Shard
//! names and content derive from the client identity alone:
//!
//! - [`seed`]: the seed chain naming every shard
//! - [`generator`]: expansion of a seed into shard content
//! - [`store`]: idempotent build, checkup and teardown of the shard files
//! - [`audit`]: challenge-response integrity checks over stored shards

pub mod audit;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod seed;
pub mod spec;
pub mod store;

pub use audit::{AuditReport, Auditor, ShardAudit};
pub use crypto::{HashScope, DEFAULT_HASH_PREFIX};
pub use error::{Error, Result};
pub use generator::{generate, generate_into};
pub use seed::{Seed, SeedChain};
pub use spec::{parse_byte_count, ShardSpec, SHARD_SIZE};
pub use store::{
    BuildOptions, GeneratedMap, GeneratedShard, NullSink, ShardEvent, ShardSink, ShardStore,
};
