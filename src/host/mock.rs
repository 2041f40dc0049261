use super::{ServiceHost, StatusReporter};
use crate::error::{Result, ServiceError};
use crate::service::{
    ControlCode, ControlHandler, ControlOutcome, LifecycleState, StatusReport, StopSignal,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// In-memory host manager for testing without a real service manager
#[derive(Default)]
pub struct MockServiceHost {
    registration_failure: Option<u32>,
    stop_signal_failure: Option<u32>,
    fail_reports: Arc<AtomicBool>,
    reports: Arc<Mutex<Vec<StatusReport>>>,
    handler: Mutex<Option<ControlHandler>>,
    registered_name: Mutex<Option<String>>,
    stop_signal: Mutex<Option<StopSignal>>,
}

impl MockServiceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject registration with the given OS error code
    pub fn failing_registration(code: u32) -> Self {
        Self {
            registration_failure: Some(code),
            ..Self::default()
        }
    }

    /// Fail stop signal allocation with the given OS error code
    pub fn failing_stop_signal(code: u32) -> Self {
        Self {
            stop_signal_failure: Some(code),
            ..Self::default()
        }
    }

    /// Make every subsequent status report call fail (reports are still recorded)
    pub fn set_fail_reports(&self, fail: bool) {
        self.fail_reports.store(fail, Ordering::SeqCst);
    }

    /// Every status report the service attempted, in order
    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().clone()
    }

    pub fn reported_states(&self) -> Vec<LifecycleState> {
        self.reports.lock().iter().map(|r| r.state).collect()
    }

    pub fn registered_name(&self) -> Option<String> {
        self.registered_name.lock().clone()
    }

    /// Host-side copy of the last stop signal handed out
    pub fn stop_signal(&self) -> Option<StopSignal> {
        self.stop_signal.lock().clone()
    }

    /// Deliver a control code the way a host dispatcher would.
    /// Returns `None` when no handler has been registered.
    pub fn deliver(&self, code: ControlCode) -> Option<ControlOutcome> {
        let handler = self.handler.lock().clone()?;
        debug!("Mock host delivering {:?}", code);
        Some(handler.handle(code))
    }

    /// Poll until `state` has been reported or `limit` elapses
    pub async fn wait_for_state(&self, state: LifecycleState, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if self.reported_states().contains(&state) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl ServiceHost for MockServiceHost {
    fn register(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>> {
        if let Some(code) = self.registration_failure {
            return Err(ServiceError::registration(
                code,
                format!("mock host rejected '{}'", service_name),
            ));
        }

        *self.registered_name.lock() = Some(service_name.to_string());
        *self.handler.lock() = Some(handler);

        Ok(Arc::new(MockStatusReporter {
            reports: Arc::clone(&self.reports),
            fail: Arc::clone(&self.fail_reports),
        }))
    }

    fn create_stop_signal(&self) -> Result<StopSignal> {
        match self.stop_signal_failure {
            Some(code) => Err(ServiceError::StopSignalCreation { code }),
            None => {
                let signal = StopSignal::new();
                *self.stop_signal.lock() = Some(signal.clone());
                Ok(signal)
            }
        }
    }
}

struct MockStatusReporter {
    reports: Arc<Mutex<Vec<StatusReport>>>,
    fail: Arc<AtomicBool>,
}

impl StatusReporter for MockStatusReporter {
    fn report(&self, status: &StatusReport) -> Result<()> {
        self.reports.lock().push(*status);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::report_delivery(
                status.state,
                "mock host refused the report",
            ));
        }
        Ok(())
    }
}
