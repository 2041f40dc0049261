use super::{ControlCode, ControlOutcome, ServiceContext};
use std::sync::Arc;
use tracing::{debug, info};

/// Callback the host manager invokes for every delivered control code.
///
/// Cheap to clone; never waits on the controller or the worker loop.
#[derive(Clone)]
pub struct ControlHandler {
    context: Arc<ServiceContext>,
}

impl ControlHandler {
    pub(crate) fn new(context: Arc<ServiceContext>) -> Self {
        Self { context }
    }

    pub fn handle(&self, code: ControlCode) -> ControlOutcome {
        match code {
            ControlCode::Stop | ControlCode::Shutdown => {
                if self.context.begin_stop() {
                    info!(
                        "Stop requested for '{}' via {:?}",
                        self.context.name(),
                        code
                    );
                } else {
                    debug!(
                        "Ignoring {:?} for '{}' in state {}",
                        code,
                        self.context.name(),
                        self.context.state()
                    );
                }
                ControlOutcome::Handled
            }
            ControlCode::Interrogate => {
                debug!("Interrogate received for '{}'", self.context.name());
                ControlOutcome::Handled
            }
            ControlCode::Other(raw) => {
                debug!(
                    "Unsupported control code {:#x} for '{}'",
                    raw,
                    self.context.name()
                );
                ControlOutcome::NotImplemented
            }
        }
    }
}

impl std::fmt::Debug for ControlHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandler")
            .field("service", &self.context.name())
            .finish()
    }
}
