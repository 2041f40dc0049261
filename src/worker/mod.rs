mod task;


pub use task::{HeartbeatTask, ServiceTask};

use crate::config::{WorkerCadence, WorkerConfig};
use crate::service::StopSignal;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Summary returned by a worker loop once it observes the stop signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub iterations: u64,
}

/// Repeats a [`ServiceTask`] until the stop signal is set.
///
/// The only suspension point is the pause between iterations, so the loop
/// exits at most one interval after the signal fires.
pub struct WorkerLoop {
    name: String,
    task: Arc<dyn ServiceTask>,
    stop_signal: StopSignal,
    config: WorkerConfig,
}

impl WorkerLoop {
    pub fn new<S: Into<String>>(
        name: S,
        task: Arc<dyn ServiceTask>,
        stop_signal: StopSignal,
        config: WorkerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            task,
            stop_signal,
            config,
        }
    }

    /// Spawn onto the current runtime; the caller may drop the handle
    pub fn spawn(self) -> JoinHandle<WorkerExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> WorkerExit {
        let interval = self.config.interval();
        let mut iterations = 0u64;

        debug!(
            "Worker loop for '{}' started (interval {:?}, {:?})",
            self.name, interval, self.config.cadence
        );

        while !self.stop_signal.is_set() {
            let started = Instant::now();
            iterations += 1;

            info!("{} iteration {} started", self.name, iterations);
            if let Err(e) = self.task.run_once().await {
                error!("{} iteration {} failed: {}", self.name, iterations, e);
            }
            info!("{} iteration {} finished", self.name, iterations);

            if self.stop_signal.is_set() {
                break;
            }

            let pause = match self.config.cadence {
                WorkerCadence::FixedDelay => interval,
                WorkerCadence::FixedRate => interval.saturating_sub(started.elapsed()),
            };

            if self.config.wake_on_stop {
                self.stop_signal.wait_timeout(pause).await;
            } else {
                tokio::time::sleep(pause).await;
            }
        }

        info!(
            "Worker loop for '{}' exiting after {} iterations",
            self.name, iterations
        );
        WorkerExit { iterations }
    }
}
