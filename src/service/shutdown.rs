use super::{ServiceController, ServiceExit, StatusReport, StopSignal, WorkerOutcome};
use crate::error::Result;
use crate::worker::WorkerExit;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

impl ServiceController {
    /// Release the stop signal, optionally join the worker, report STOPPED
    pub(super) async fn shutdown(
        self,
        stop_signal: StopSignal,
        worker: JoinHandle<WorkerExit>,
    ) -> Result<ServiceExit> {
        info!("Beginning shutdown of '{}'", self.context.name());

        // Late control codes no longer reach the signal; the worker's clone
        // goes away when it is joined
        drop(self.context.release_stop_signal());
        drop(stop_signal);

        let worker = match self.config.shutdown.worker_join_timeout() {
            Some(limit) => Self::join_worker(worker, limit).await,
            None => {
                debug!("Worker join disabled; leaving worker loop detached");
                WorkerOutcome::NotJoined
            }
        };

        let report = StatusReport::stopped();
        self.context.transition(report);

        info!(
            "Service '{}' stopped with exit code {}",
            self.context.name(),
            report.exit_code
        );

        Ok(ServiceExit {
            exit_code: report.exit_code,
            worker,
        })
    }

    async fn join_worker(worker: JoinHandle<WorkerExit>, limit: Duration) -> WorkerOutcome {
        match timeout(limit, worker).await {
            Ok(Ok(exit)) => {
                info!("Worker loop exited after {} iterations", exit.iterations);
                WorkerOutcome::Exited
            }
            Ok(Err(e)) => {
                error!("Worker loop terminated abnormally: {}", e);
                WorkerOutcome::Failed(e.to_string())
            }
            Err(_) => {
                warn!(
                    "Worker loop did not exit within {:?}; detaching it",
                    limit
                );
                WorkerOutcome::Detached
            }
        }
    }
}
