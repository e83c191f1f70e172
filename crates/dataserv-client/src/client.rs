//! Farmer client: ties the shard engine to the coordinator API

use std::time::{Duration, Instant};

use dataserv_core::{
    AuditReport, Auditor, BuildOptions, GeneratedMap, SeedChain, ShardEvent, ShardSpec,
    ShardStore,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Client for one farmer address and its local shard store
pub struct Client {
    api: ApiClient,
    chain: SeedChain,
    store: ShardStore,
    auditor: Auditor,
}

impl Client {
    /// Create a client from configuration, creating the store directory
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let address = config
            .address
            .as_deref()
            .filter(|address| !address.is_empty())
            .ok_or(ClientError::AddressRequired)?;

        let api = ApiClient::new(&config.url, address, config.retry_policy())?;

        config.ensure_directories()?;
        let store_path = std::fs::canonicalize(&config.store_path)?;

        let spec = ShardSpec::new(config.shard_size, config.max_size)?;
        let chain = SeedChain::new(address);
        let store = ShardStore::open(store_path, spec, config.hash_scope)?;
        let auditor = Auditor::new(chain.clone(), config.shard_size, config.hash_scope)?;

        Ok(Self {
            api,
            chain,
            store,
            auditor,
        })
    }

    /// Client version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Number of shards this client commits to
    pub fn height(&self) -> u64 {
        self.store.spec().height()
    }

    /// Register the configured address
    pub async fn register(&self) -> Result<bool> {
        let registered = self.api.register().await?;
        if registered {
            info!(
                "Address {} now registered on {}",
                self.api.address(),
                self.api.server_url()
            );
        }
        Ok(registered)
    }

    /// Send one heartbeat
    pub async fn ping(&self) -> Result<bool> {
        info!(
            "Pinging {} with address {}",
            self.api.server_url(),
            self.api.address()
        );
        self.api.ping().await
    }

    /// Ping every `delay` until `limit` has elapsed, or forever without one.
    ///
    /// With `register_address` the address is registered first; an address
    /// that is already registered is not an error here.
    pub async fn poll(
        &self,
        register_address: bool,
        delay: Duration,
        limit: Option<Duration>,
    ) -> Result<bool> {
        let stop_at = limit.map(|limit| Instant::now() + limit);

        if register_address {
            match self.register().await {
                Ok(_) => {}
                Err(ClientError::AddressAlreadyRegistered { .. }) => {
                    info!("Address {} already registered", self.api.address());
                }
                Err(e) => return Err(e),
            }
        }

        loop {
            self.ping().await?;

            if stop_at.is_some_and(|stop_at| Instant::now() >= stop_at) {
                return Ok(true);
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Build the shard set, reporting the height after every new shard and
    /// once more when the build completes.
    ///
    /// The build runs on a blocking thread; shard events are forwarded in
    /// order over a channel. If a height report fails the build still runs
    /// to completion, no further reports are sent, and the first report
    /// error is returned.
    pub async fn build(&self, options: BuildOptions) -> Result<GeneratedMap> {
        let (tx, mut rx) = mpsc::unbounded_channel::<ShardEvent>();
        let store = self.store.clone();
        let chain = self.chain.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut sink = move |event: ShardEvent| {
                let _ = tx.send(event);
            };
            store.build(&chain, options, &mut sink)
        });

        let mut report_error = None;
        while let Some(event) = rx.recv().await {
            if report_error.is_some() {
                continue;
            }
            if let Err(e) = self.api.height(event.height).await {
                warn!("Failed to report height {}: {}", event.height, e);
                report_error = Some(e);
            }
        }

        let generated = task
            .await
            .map_err(|e| ClientError::Task(e.to_string()))??;
        if let Some(e) = report_error {
            return Err(e);
        }

        self.api.height(generated.len() as u64).await?;
        Ok(generated)
    }

    /// Whether every committed shard is present on disk
    pub fn checkup(&self) -> Result<bool> {
        Ok(self.store.checkup(&self.chain, self.height())?)
    }

    /// Delete every committed shard, returning how many were removed
    pub fn clean(&self) -> Result<usize> {
        Ok(self.store.clean(&self.chain, self.height())?)
    }

    /// Audit tokens for the first `sample_count` shards
    pub fn audit(&self, challenge: &[u8], sample_count: u64) -> Result<Vec<String>> {
        Ok(self
            .auditor
            .quick_audit(challenge, &self.store, sample_count)?)
    }

    /// Audit every committed shard against regenerated content
    pub fn full_audit(&self, challenge: &[u8], as_boolean: bool) -> Result<AuditReport> {
        Ok(self
            .auditor
            .full_audit(challenge, &self.store, self.height(), as_boolean)?)
    }
}
