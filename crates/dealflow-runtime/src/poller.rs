use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::engine::RuleEngine;
use crate::scheduler::Scheduler;

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Owner whose tasks and permissions this session drains.
    pub owner_id: Uuid,
    /// Time between poll cycles.
    pub poll_interval: Duration,
}

/// Per-session background loop draining due tasks and due permission
/// grants.
///
/// Checks immediately on start, then every `poll_interval`. A failed
/// cycle never cancels the timer, and shutting down lets the in-flight
/// cycle finish; only the loop stops.
pub struct Poller {
    scheduler: Scheduler,
    engine: RuleEngine,
    config: PollerConfig,
}

impl Poller {
    /// Create a poller for one owner session.
    pub fn new(scheduler: Scheduler, engine: RuleEngine, config: PollerConfig) -> Self {
        Self {
            scheduler,
            engine,
            config,
        }
    }

    /// Run one poll cycle.
    ///
    /// Executes every due task concurrently, then runs the owner's
    /// permission sweep. One task's failure never blocks its siblings;
    /// failures land in the log and on the task rows.
    pub async fn run_cycle(&self) {
        let owner_id = self.config.owner_id;

        let due = self.scheduler.pending_tasks(owner_id).await;
        if !due.is_empty() {
            tracing::debug!(owner_id = %owner_id, tasks = due.len(), "Executing due tasks");
            let executions = due.iter().map(|task| async move {
                if let Err(e) = self.scheduler.execute_task(&self.engine, task.id).await {
                    tracing::error!(task_id = %task.id, error = %e, "Task execution errored");
                }
            });
            join_all(executions).await;
        }

        self.engine.apply_due_permissions(owner_id).await;
    }

    /// Spawn the polling loop. The first check runs immediately.
    pub fn start(self) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.poll_interval);
            tracing::info!(
                owner_id = %self.config.owner_id,
                interval_secs = self.config.poll_interval.as_secs(),
                "Poller started"
            );

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_cycle().await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!(
                                owner_id = %self.config.owner_id,
                                "Poller shutting down"
                            );
                            break;
                        }
                    }
                }
            }
        });

        PollerHandle {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running poller loop.
pub struct PollerHandle {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the loop and wait for it to exit. Work already started in the
    /// current cycle completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }

    /// Whether the loop is still alive.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
