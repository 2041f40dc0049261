use super::{LifecycleState, StatusReport, StopSignal};
use crate::host::StatusReporter;
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Lifecycle state shared between the controller and the control handler.
///
/// The state lock is held across the status report call so the host never
/// sees reports out of state order. A control handler arriving while the
/// controller is mid-report therefore waits for that one report call to
/// return, and for nothing else.
pub struct ServiceContext {
    name: String,
    inner: Mutex<ContextInner>,
    reporter: OnceLock<Arc<dyn StatusReporter>>,
}

struct ContextInner {
    state: LifecycleState,
    stop_signal: Option<StopSignal>,
}

impl ServiceContext {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(ContextInner {
                state: LifecycleState::StartPending,
                stop_signal: None,
            }),
            reporter: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.inner.lock().state
    }

    pub(crate) fn attach_reporter(&self, reporter: Arc<dyn StatusReporter>) {
        if self.reporter.set(reporter).is_err() {
            warn!("Status reporter for '{}' already attached", self.name);
        }
    }

    /// Report the current state without moving it
    pub(crate) fn announce(&self, report: StatusReport) {
        let inner = self.inner.lock();
        if inner.state != report.state {
            warn!(
                "Refusing to announce {} while service '{}' is {}",
                report.state, self.name, inner.state
            );
            return;
        }
        self.deliver(&report);
    }

    /// Move to `report.state` and report it. Returns `false` and leaves the
    /// state untouched when the step would not be forward.
    pub(crate) fn transition(&self, report: StatusReport) -> bool {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(report.state) {
            debug!(
                "Ignoring transition {} -> {} for service '{}'",
                inner.state, report.state, self.name
            );
            return false;
        }

        info!(
            "Service '{}' state changed: {} -> {}",
            self.name, inner.state, report.state
        );
        inner.state = report.state;
        self.deliver(&report);
        true
    }

    pub(crate) fn install_stop_signal(&self, signal: StopSignal) {
        self.inner.lock().stop_signal = Some(signal);
    }

    pub(crate) fn release_stop_signal(&self) -> Option<StopSignal> {
        self.inner.lock().stop_signal.take()
    }

    /// RUNNING -> STOP_PENDING, then fire the stop signal.
    /// Returns `false` when the service was not running.
    ///
    /// Blocks at most for an in-flight report plus the STOP_PENDING report.
    pub(crate) fn begin_stop(&self) -> bool {
        let signal = {
            let mut inner = self.inner.lock();
            if inner.state != LifecycleState::Running {
                return false;
            }
            inner.state = LifecycleState::StopPending;
            info!(
                "Service '{}' state changed: {} -> {}",
                self.name,
                LifecycleState::Running,
                LifecycleState::StopPending
            );
            self.deliver(&StatusReport::stop_pending());
            inner.stop_signal.clone()
        };

        match signal {
            Some(signal) => {
                signal.set();
            }
            None => warn!("Service '{}' is stopping without a stop signal", self.name),
        }
        true
    }

    fn deliver(&self, report: &StatusReport) {
        let Some(reporter) = self.reporter.get() else {
            warn!(
                "No status reporter attached for '{}'; dropping {} report",
                self.name, report.state
            );
            return;
        };

        if let Err(e) = reporter.report(report) {
            warn!("Status report failed for '{}': {}", self.name, e);
        }
    }
}
