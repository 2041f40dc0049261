use super::{ControlHandler, ServiceController, ServiceExit, StatusReport};
use crate::error::Result;
use crate::worker::WorkerLoop;
use std::sync::Arc;
use tracing::{error, info};

impl ServiceController {
    /// Run the service until the host manager asks it to stop.
    ///
    /// Fails only when registration or stop signal creation fails.
    pub async fn run(self) -> Result<ServiceExit> {
        let name = self.config.service.name.clone();
        info!("Registering service '{}' (run {})", name, self.run_id);

        let handler = ControlHandler::new(Arc::clone(&self.context));
        let reporter = self.host.register(&name, handler).map_err(|e| {
            error!("Failed to register service '{}': {}", name, e);
            e
        })?;
        self.context.attach_reporter(reporter);
        self.context.announce(StatusReport::start_pending());

        let stop_signal = match self.host.create_stop_signal() {
            Ok(signal) => signal,
            Err(e) => {
                error!("Failed to create stop signal for '{}': {}", name, e);
                self.context
                    .transition(StatusReport::start_failed(e.exit_code()));
                return Err(e);
            }
        };
        self.context.install_stop_signal(stop_signal.clone());
        self.context.transition(StatusReport::running());

        let worker = WorkerLoop::new(
            name.clone(),
            Arc::clone(&self.task),
            stop_signal.clone(),
            self.config.worker.clone(),
        )
        .spawn();

        info!("Service '{}' is running", name);

        stop_signal.wait().await;
        info!("Stop signal observed for '{}'", name);

        self.shutdown(stop_signal, worker).await
    }
}
