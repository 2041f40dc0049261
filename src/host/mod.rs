//! Host service manager seam.
//!
//! The lifecycle core talks to the operating system's service manager only
//! through these traits, so the same controller runs under the Windows SCM,
//! in a console session, or against an in-memory host in tests.

pub mod console;
pub mod eventlog;
pub mod mock;

#[cfg(windows)]
pub mod windows;

#[cfg(test)]
mod tests;

pub use console::ConsoleHost;
pub use mock::MockServiceHost;

use crate::error::Result;
use crate::service::{ControlHandler, StatusReport, StopSignal};
use std::sync::Arc;

/// Handle used to push status reports to the host manager
pub trait StatusReporter: Send + Sync {
    /// Blocking call into the host. Failures are logged by the caller and
    /// never stop the lifecycle.
    fn report(&self, status: &StatusReport) -> Result<()>;
}

/// Registration side of the host manager
pub trait ServiceHost: Send + Sync {
    /// Register `service_name` and install `handler` for control dispatch
    fn register(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>>;

    /// Allocate the stop event for one service run
    fn create_stop_signal(&self) -> Result<StopSignal> {
        Ok(StopSignal::new())
    }
}
