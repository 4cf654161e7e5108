// Monitoring engine: owns the sampler, the snapshot store and the worker lifecycle.

use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::JoinHandle;

use crate::actions::ActionGateway;
use crate::apps::{AppRegistry, BundleRegistry};
use crate::config::{AppConfig, SamplingConfig};
use crate::error::ActionError;
use crate::models::Snapshot;
use crate::probe::{CommandRunner, HostSource, SystemSource, TokioCommandRunner};
use crate::store::SnapshotStore;
use crate::worker::{self, Sampler, WorkerConfig, WorkerDeps};

struct RunningWorker {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// One independent monitoring instance. Several can coexist; none share state.
pub struct MonitorEngine<S: HostSource = SystemSource, R: CommandRunner = TokioCommandRunner> {
    sampler: Arc<Mutex<Sampler<S>>>,
    store: SnapshotStore,
    actions: ActionGateway<R>,
    sampling: SamplingConfig,
    worker: std::sync::Mutex<Option<RunningWorker>>,
}

impl MonitorEngine {
    /// Engine over the real host.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_parts(
            SystemSource::new(&config.probes),
            Arc::new(BundleRegistry::new()),
            ActionGateway::default(),
            config.sampling.clone(),
        )
    }
}

impl<S: HostSource, R: CommandRunner> MonitorEngine<S, R> {
    pub fn with_parts(
        source: S,
        registry: Arc<dyn AppRegistry>,
        actions: ActionGateway<R>,
        sampling: SamplingConfig,
    ) -> Self {
        let sampler = Sampler::new(Arc::new(source), registry, &sampling);
        Self {
            sampler: Arc::new(Mutex::new(sampler)),
            store: SnapshotStore::new(),
            actions,
            sampling,
            worker: std::sync::Mutex::new(None),
        }
    }

    /// Start periodic sampling. The first tick runs immediately. Returns `false` if
    /// already running. Must be called inside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return false;
        }
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = worker::spawn(
            WorkerDeps {
                sampler: self.sampler.clone(),
                store: self.store.clone(),
                shutdown_rx,
            },
            WorkerConfig::from(&self.sampling),
        );
        *slot = Some(RunningWorker {
            shutdown_tx,
            handle,
        });
        tracing::info!(interval_ms = self.sampling.interval_ms, "sampling started");
        true
    }

    /// Stop scheduling ticks. A tick already in flight finishes and publishes before
    /// this returns. Returns `false` if not running.
    pub async fn stop(&self) -> bool {
        let running = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(RunningWorker {
            shutdown_tx,
            handle,
        }) = running
        else {
            return false;
        };
        let _ = shutdown_tx.send(());
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, operation = "stop", "worker task ended abnormally");
        }
        tracing::info!("sampling stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.store.subscribe()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.store.current()
    }

    /// Run one tick now, outside the schedule, and publish it.
    pub async fn refresh(&self) -> Arc<Snapshot> {
        worker::tick_and_publish(&self.sampler, &self.store).await
    }

    /// Eject a disk by identifier or mount path.
    pub async fn eject(&self, target: &str) -> Result<(), ActionError> {
        self.actions.eject(target).await
    }

    /// Forcefully terminate a process.
    pub fn kill_process(&self, pid: u32) -> Result<(), ActionError> {
        self.actions.kill_process(pid)
    }
}
