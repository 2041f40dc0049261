use super::{LifecycleState, ServiceContext};
use crate::config::MinServiceConfig;
use crate::host::ServiceHost;
use crate::worker::{HeartbeatTask, ServiceTask};
use std::sync::Arc;
use uuid::Uuid;

/// Drives one service run: registration, start-up, the running wait and
/// shutdown, reporting every step to the host manager.
pub struct ServiceController {
    pub(super) config: MinServiceConfig,
    pub(super) host: Arc<dyn ServiceHost>,
    pub(super) task: Arc<dyn ServiceTask>,
    pub(super) context: Arc<ServiceContext>,
    pub(super) run_id: Uuid,
}

impl ServiceController {
    /// Create a controller running `task` under `host`
    pub fn new(
        config: MinServiceConfig,
        host: Arc<dyn ServiceHost>,
        task: Arc<dyn ServiceTask>,
    ) -> Self {
        let context = Arc::new(ServiceContext::new(config.service.name.clone()));

        Self {
            config,
            host,
            task,
            context,
            run_id: Uuid::new_v4(),
        }
    }

    /// Create a controller running the heartbeat task
    pub fn with_heartbeat(config: MinServiceConfig, host: Arc<dyn ServiceHost>) -> Self {
        let task = Arc::new(HeartbeatTask::new(config.service.name.clone()));
        Self::new(config, host, task)
    }

    pub fn state(&self) -> LifecycleState {
        self.context.state()
    }
}
