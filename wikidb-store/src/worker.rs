//! Worker pool - page store instances served on the bus
//!
//! Deployment builds the catalog and connection pool once, bootstraps N
//! independent `PageStore` instances, and registers each one that reaches
//! ready under the same address. The bus then spreads requests across them.
//!
//! Every instance runs its own loop and handles one request at a time, in
//! arrival order. Parallelism comes from running several instances.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::bus::{EventBus, MessageConsumer};
use crate::catalog::QueryCatalog;
use crate::config::WikiDbConfig;
use crate::error::{ServiceError, StartupError};
use crate::pool::ConnectionPool;
use crate::proxy::PageServiceClient;
use crate::store::PageStore;

/// Lifecycle of one page store instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Schema bootstrap running; only seen in deploy logs
    Initializing,
    /// Registered and serving
    Ready,
    /// Bootstrap failed; reported in `StartupError::Bootstrap`
    Failed,
    /// Loop has exited
    Stopped,
}

/// A registered instance and its serve loop.
#[derive(Debug)]
pub struct Worker {
    instance: usize,
    address: String,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Worker {
    pub fn instance(&self) -> usize {
        self.instance
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> InstanceState {
        if self.handle.is_finished() {
            InstanceState::Stopped
        } else {
            InstanceState::Ready
        }
    }

    /// Stop taking requests. A request already being handled finishes first.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.handle.await {
            error!(instance = self.instance, error = %e, "page store loop panicked");
        }
    }
}

/// Register a ready store on `address` and start serving it.
///
/// The instance is routable once this returns.
pub fn register(store: PageStore, bus: &EventBus, address: &str, instance: usize) -> Worker {
    let consumer = bus.consumer(address);
    let (stop, stopped) = watch::channel(false);
    let handle = tokio::spawn(serve(store, consumer, stopped, instance));
    info!(address, instance, "page store registered");

    Worker {
        instance,
        address: address.to_owned(),
        stop,
        handle,
    }
}

async fn serve(
    store: PageStore,
    mut consumer: MessageConsumer,
    mut stopped: watch::Receiver<bool>,
    instance: usize,
) {
    loop {
        tokio::select! {
            biased;
            _ = stopped.changed() => break,
            delivery = consumer.recv() => {
                let Some(delivery) = delivery else { break };
                let (request, reply_to) = delivery.into_parts();
                let op = request.op;
                let reply = store.handle(request).await;
                if !reply_to.send(reply) {
                    debug!(instance, ?op, "caller stopped waiting for reply");
                }
            }
        }
    }
    debug!(instance, address = consumer.address(), "page store loop stopped");
}

/// Run the bootstrap for one instance, logging its state transitions.
async fn bootstrap(
    instance: usize,
    pool: ConnectionPool,
    catalog: Arc<QueryCatalog>,
) -> Result<PageStore, ServiceError> {
    debug!(instance, state = ?InstanceState::Initializing, "bootstrapping page store");
    match PageStore::start(pool, catalog).await {
        Ok(store) => {
            debug!(instance, state = ?InstanceState::Ready, "page store ready");
            Ok(store)
        }
        Err(e) => {
            error!(instance, state = ?InstanceState::Failed, error = %e, "page store bootstrap failed");
            Err(e)
        }
    }
}

/// A deployed group of page store instances sharing one address.
#[derive(Debug)]
pub struct WorkerPool {
    address: String,
    bus: EventBus,
    pool: ConnectionPool,
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Build catalog and pool from `config`, then deploy `config.instances`.
    pub async fn deploy(config: &WikiDbConfig, bus: EventBus) -> Result<Self, StartupError> {
        config.validate()?;
        let catalog = Arc::new(QueryCatalog::load(&config.query_source())?);
        let pool = ConnectionPool::connect(config).await?;
        Self::deploy_with(pool, catalog, bus, &config.queue, config.instances).await
    }

    /// Deploy `instances` stores over an existing pool and catalog.
    ///
    /// All instances bootstrap concurrently. Nothing is registered unless
    /// every one of them becomes ready.
    pub async fn deploy_with(
        pool: ConnectionPool,
        catalog: Arc<QueryCatalog>,
        bus: EventBus,
        address: &str,
        instances: usize,
    ) -> Result<Self, StartupError> {
        let starts = (0..instances).map(|i| bootstrap(i, pool.clone(), Arc::clone(&catalog)));
        let results = join_all(starts).await;

        let states: Vec<InstanceState> = results
            .iter()
            .map(|r| match r {
                Ok(_) => InstanceState::Ready,
                Err(_) => InstanceState::Failed,
            })
            .collect();

        let mut stores = Vec::with_capacity(instances);
        let mut first_failure = None;
        for (instance, result) in results.into_iter().enumerate() {
            match result {
                Ok(store) => stores.push(store),
                Err(source) => {
                    first_failure.get_or_insert((instance, source));
                }
            }
        }
        if let Some((instance, source)) = first_failure {
            return Err(StartupError::Bootstrap {
                instance,
                source,
                states,
            });
        }

        let workers: Vec<Worker> = stores
            .into_iter()
            .enumerate()
            .map(|(instance, store)| register(store, &bus, address, instance))
            .collect();

        info!(address, instances = workers.len(), "page store deployed");
        Ok(Self {
            address: address.to_owned(),
            bus,
            pool,
            workers,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn states(&self) -> Vec<InstanceState> {
        self.workers.iter().map(Worker::state).collect()
    }

    /// Client stub bound to this pool's address.
    pub fn client(&self) -> PageServiceClient {
        PageServiceClient::new(self.bus.clone(), self.address.clone())
    }

    /// Stop every instance, then close the connection pool.
    pub async fn shutdown(self) {
        for worker in self.workers {
            worker.stop().await;
        }
        self.pool.close().await;
        info!(address = %self.address, "page store shut down");
    }
}
