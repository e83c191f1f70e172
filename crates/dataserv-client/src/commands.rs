//! CLI command implementations

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dataserv_core::{parse_byte_count, AuditReport, BuildOptions};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::Result;

/// dataserv client - prove storage capacity to a coordinator
#[derive(Debug, Parser)]
#[command(name = "dataserv-client")]
#[command(about = "Build, audit and report locally generated storage shards")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Client address (identity the shards derive from)
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// Coordinator URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Storage to commit, e.g. 1073741824 or 1G
    #[arg(long, global = true, value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Directory holding the shard files
    #[arg(long, global = true)]
    pub store_path: Option<PathBuf>,

    /// Configuration file (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the client version
    Version,

    /// Register the address with the coordinator
    Register,

    /// Send a single heartbeat
    Ping,

    /// Send heartbeats continuously
    Poll {
        /// Register the address before polling
        #[arg(long)]
        register_address: bool,

        /// Seconds between heartbeats
        #[arg(long)]
        delay: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Generate missing shards and report the height
    Build {
        /// Delete the shards once built
        #[arg(long)]
        cleanup: bool,

        /// Regenerate every shard
        #[arg(long)]
        rebuild: bool,

        /// Regenerate present shards whose content is wrong
        #[arg(long)]
        verify: bool,
    },

    /// Check that every committed shard is present
    Checkup,

    /// Delete every committed shard
    Clean,

    /// Print audit tokens for the first shards
    Audit {
        /// Challenge string
        #[arg(long)]
        challenge: String,

        /// Number of shards to sample (default: all)
        #[arg(long)]
        count: Option<u64>,
    },

    /// Audit every shard against regenerated content
    FullAudit {
        /// Challenge string
        #[arg(long)]
        challenge: String,

        /// Print raw tokens instead of verdicts
        #[arg(long)]
        tokens: bool,
    },
}

fn parse_size(input: &str) -> std::result::Result<u64, String> {
    parse_byte_count(input).map_err(|e| e.to_string())
}

impl Cli {
    /// Configuration file values with command-line overrides applied
    pub fn resolve_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::resolve(self.config.as_deref())?;
        if let Some(address) = &self.address {
            config.address = Some(address.clone());
        }
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(max_size) = self.max_size {
            config.max_size = max_size;
        }
        if let Some(store_path) = &self.store_path {
            config.store_path = store_path.clone();
        }
        Ok(config)
    }
}

/// Run the CLI
pub async fn run(cli: Cli) -> Result<()> {
    let connect = || -> Result<(ClientConfig, Client)> {
        let config = cli.resolve_config()?;
        let client = Client::new(&config)?;
        Ok((config, client))
    };

    match &cli.command {
        Commands::Version => {
            println!("{}", Client::version());
        }

        Commands::Register => {
            let (_, client) = connect()?;
            client.register().await?;
        }

        Commands::Ping => {
            let (_, client) = connect()?;
            client.ping().await?;
        }

        Commands::Poll {
            register_address,
            delay,
            limit,
        } => {
            let (config, client) = connect()?;
            let delay = delay
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_delay());
            client
                .poll(*register_address, delay, limit.map(Duration::from_secs))
                .await?;
        }

        Commands::Build {
            cleanup,
            rebuild,
            verify,
        } => {
            let (_, client) = connect()?;
            let generated = client
                .build(BuildOptions {
                    rebuild: *rebuild,
                    cleanup: *cleanup,
                    verify: *verify,
                })
                .await?;
            for shard in &generated {
                println!("{} {}", shard.seed, shard.content_hash);
            }
            println!("Height: {}", generated.len());
        }

        Commands::Checkup => {
            let (_, client) = connect()?;
            if client.checkup()? {
                println!("All {} shards present", client.height());
            } else {
                println!("Shards missing; run `dataserv-client build`");
            }
        }

        Commands::Clean => {
            let (_, client) = connect()?;
            let removed = client.clean()?;
            println!("Removed {} shards", removed);
        }

        Commands::Audit { challenge, count } => {
            let (_, client) = connect()?;
            let count = count.unwrap_or_else(|| client.height());
            for token in client.audit(challenge.as_bytes(), count)? {
                println!("{}", token);
            }
        }

        Commands::FullAudit { challenge, tokens } => {
            let (_, client) = connect()?;
            let report = client.full_audit(challenge.as_bytes(), !*tokens)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let AuditReport::Verdicts(verdicts) = &report {
                let intact = verdicts.iter().filter(|ok| **ok).count();
                println!("{}/{} shards intact", intact, verdicts.len());
            }
        }
    }

    Ok(())
}
