use super::{ServiceHost, StatusReporter};
use crate::error::{Result, ServiceError};
use crate::service::{ControlCode, ControlHandler, StatusReport};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Foreground host: Ctrl+C delivers STOP, SIGTERM (Unix) delivers SHUTDOWN,
/// and status reports go to the log.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl ConsoleHost {
    pub fn new() -> Self {
        Self
    }
}

impl ServiceHost for ConsoleHost {
    fn register(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>> {
        let runtime = Handle::try_current().map_err(|e| {
            ServiceError::registration(1, format!("console host needs a tokio runtime: {}", e))
        })?;

        // Handle SIGTERM - Unix only
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let _guard = runtime.enter();
            let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
                ServiceError::registration(
                    e.raw_os_error().map(|c| c as u32).unwrap_or(1),
                    format!("failed to register SIGTERM handler: {}", e),
                )
            })?;

            let handler_sigterm = handler.clone();
            runtime.spawn(async move {
                while sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    handler_sigterm.handle(ControlCode::Shutdown);
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        runtime.spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Ctrl+C listener failed: {}", e);
                    break;
                }
                info!("Received SIGINT signal (Ctrl+C)");
                handler.handle(ControlCode::Stop);
            }
        });

        info!("Service '{}' registered with console host", service_name);

        Ok(Arc::new(ConsoleStatusReporter {
            service_name: service_name.to_string(),
        }))
    }
}

struct ConsoleStatusReporter {
    service_name: String,
}

impl StatusReporter for ConsoleStatusReporter {
    fn report(&self, status: &StatusReport) -> Result<()> {
        info!(
            "Status report for '{}': state={} accepted={:#x} exit_code={} checkpoint={}",
            self.service_name,
            status.state,
            status.controls_accepted.bits(),
            status.exit_code,
            status.checkpoint
        );
        Ok(())
    }
}
