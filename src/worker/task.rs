use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// One unit of service work, invoked once per worker iteration
#[async_trait]
pub trait ServiceTask: Send + Sync {
    async fn run_once(&self) -> Result<()>;
}

/// Default task: logs a heartbeat per iteration
pub struct HeartbeatTask {
    name: String,
    beats: AtomicU64,
}

impl HeartbeatTask {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            beats: AtomicU64::new(0),
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ServiceTask for HeartbeatTask {
    async fn run_once(&self) -> Result<()> {
        let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("{} heartbeat #{}", self.name, beat);
        Ok(())
    }
}
