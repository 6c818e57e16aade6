//! Periodic background workers.
//!
//! A [`PeriodicWorker`] drives one [`PeriodicJob`] on a fixed interval. The
//! first tick fires one full period after start. Stopping never interrupts a
//! tick that is already running; [`PeriodicWorker::stop`] waits for it.

pub mod autobet;
pub mod odds;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::engine::EngineError;

/// One unit of periodic work.
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    type Report: Debug + Send;

    /// Used in log lines.
    fn name(&self) -> &'static str;

    async fn tick(&self) -> Result<Self::Report, EngineError>;
}

/// Handle to a running periodic job.
pub struct PeriodicWorker {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicWorker {
    /// Spawn `job` onto the current runtime, ticking every `period`.
    pub fn start<J: PeriodicJob>(job: Arc<J>, period: Duration) -> Self {
        let name = job.name();
        let (shutdown, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Also fires when the handle is dropped.
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        run_tick(&*job).await;
                    }
                }
            }

            debug!(job = name, "Worker loop exited");
        });

        info!(job = name, period_secs = period.as_secs_f64(), "Worker started");

        Self {
            name,
            shutdown,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal shutdown and wait for the loop, and any in-flight tick, to end.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(job = self.name, error = %e, "Worker task panicked");
            return;
        }
        info!(job = self.name, "Worker stopped");
    }
}

async fn run_tick<J: PeriodicJob>(job: &J) {
    match job.tick().await {
        Ok(report) => info!(job = job.name(), report = ?report, "Tick complete"),
        Err(e) => error!(job = job.name(), error = %e, "Tick failed, continuing to next"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
