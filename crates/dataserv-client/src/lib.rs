//! dataserv client - farmer side of the dataserv storage proof
//!
//! Builds the deterministic shard set from `dataserv-core` on local disk
//! and keeps a dataserv coordinator informed of the achieved height.

pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;

pub use api::{ApiClient, RetryPolicy};
pub use client::Client;
pub use commands::{run, Cli, Commands};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
