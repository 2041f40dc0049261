use super::eventlog::{event_log_filter, EntryKind, EventLogLayer, EventSink};
use super::*;
use crate::config::{MinServiceConfig, WorkerConfig};
use crate::error::ServiceError;
use crate::service::{
    ControlCode, ControlOutcome, LifecycleState, ServiceContext, ServiceController,
    StatusReport, StopSignal, WorkerOutcome,
};
use crate::worker::{ServiceTask, WorkerLoop};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

fn test_handler(name: &str) -> (Arc<ServiceContext>, ControlHandler) {
    let context = Arc::new(ServiceContext::new(name));
    let handler = ControlHandler::new(Arc::clone(&context));
    (context, handler)
}

#[test]
fn test_mock_host_records_registration_and_reports() {
    let host = MockServiceHost::new();
    let (_context, handler) = test_handler("Recorder");

    let reporter = host.register("Recorder", handler).unwrap();
    reporter.report(&StatusReport::start_pending()).unwrap();
    reporter.report(&StatusReport::running()).unwrap();

    assert_eq!(host.registered_name().as_deref(), Some("Recorder"));
    assert_eq!(
        host.reported_states(),
        vec![LifecycleState::StartPending, LifecycleState::Running]
    );
}

#[test]
fn test_mock_host_failing_reports_are_recorded_and_rejected() {
    let host = MockServiceHost::new();
    let (_context, handler) = test_handler("Flaky");
    let reporter = host.register("Flaky", handler).unwrap();

    host.set_fail_reports(true);
    match reporter.report(&StatusReport::running()) {
        Err(ServiceError::ReportDelivery { state, .. }) => {
            assert_eq!(state, LifecycleState::Running)
        }
        other => panic!("Expected report delivery error, got {:?}", other),
    }

    host.set_fail_reports(false);
    assert!(reporter.report(&StatusReport::stop_pending()).is_ok());
    assert_eq!(host.reports().len(), 2);
}

#[test]
fn test_mock_host_registration_failure() {
    let host = MockServiceHost::failing_registration(1060);
    let (_context, handler) = test_handler("Missing");

    let err = host.register("Missing", handler).err().unwrap();
    assert_eq!(err.exit_code(), 1060);
    assert_eq!(host.registered_name(), None);
    assert_eq!(host.deliver(ControlCode::Stop), None);
}

#[test]
fn test_mock_host_stop_signal_allocation() {
    assert!(MockServiceHost::new().create_stop_signal().is_ok());

    match MockServiceHost::failing_stop_signal(1450).create_stop_signal() {
        Err(ServiceError::StopSignalCreation { code }) => assert_eq!(code, 1450),
        other => panic!("Expected stop signal creation error, got {:?}", other),
    }
}

#[test]
fn test_mock_host_delivers_to_registered_handler() {
    let host = MockServiceHost::new();
    let (context, handler) = test_handler("Dispatch");
    host.register("Dispatch", handler).unwrap();

    assert_eq!(
        host.deliver(ControlCode::Other(0x20)),
        Some(ControlOutcome::NotImplemented)
    );
    assert_eq!(host.deliver(ControlCode::Stop), Some(ControlOutcome::Handled));
    // Not running yet, so the stop is ignored
    assert_eq!(context.state(), LifecycleState::StartPending);
    assert!(host.reports().is_empty());
}

#[tokio::test]
async fn test_mock_host_wait_for_state_times_out() {
    let host = MockServiceHost::new();
    assert!(
        !host
            .wait_for_state(LifecycleState::Running, Duration::from_millis(20))
            .await
    );
}

#[test]
fn test_default_stop_signal_allocation() {
    let signal = ConsoleHost::new().create_stop_signal().unwrap();
    assert!(!signal.is_set());
}

#[test]
fn test_console_host_requires_runtime() {
    let (_context, handler) = test_handler("Console");

    match ConsoleHost::new().register("Console", handler) {
        Err(ServiceError::Registration { message, .. }) => {
            assert!(message.contains("tokio runtime"))
        }
        Err(e) => panic!("Unexpected error: {}", e),
        Ok(_) => panic!("Console host registered without a runtime"),
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<(EntryKind, String)>>>);

impl RecordingSink {
    fn entries(&self) -> Vec<(EntryKind, String)> {
        self.0.lock().clone()
    }
}

impl EventSink for RecordingSink {
    fn write(&self, kind: EntryKind, message: &str) {
        self.0.lock().push((kind, message.to_string()));
    }
}

#[test]
fn test_event_log_layer_records_info_and_above() {
    let sink = RecordingSink::default();
    let subscriber = tracing_subscriber::registry()
        .with(EventLogLayer::new(sink.clone()).with_filter(event_log_filter()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("heartbeat detail");
        tracing::info!("Start {}", "Recorder");
        tracing::warn!(code = 5, "status report failed");
        tracing::error!("registration failed");
    });

    assert_eq!(
        sink.entries(),
        vec![
            (EntryKind::Information, "Start Recorder".to_string()),
            (EntryKind::Warning, "status report failed code=5".to_string()),
            (EntryKind::Error, "registration failed".to_string()),
        ]
    );
}

#[test]
fn test_event_log_filter_ignores_other_crates() {
    let sink = RecordingSink::default();
    let subscriber = tracing_subscriber::registry()
        .with(EventLogLayer::new(sink.clone()).with_filter(event_log_filter()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "hyper::proto", "connection closed");
    });

    assert!(sink.entries().is_empty());
}

/// Task that asks the loop to stop from inside its first iteration
struct SingleIterationTask(StopSignal);

#[async_trait]
impl ServiceTask for SingleIterationTask {
    async fn run_once(&self) -> crate::error::Result<()> {
        self.0.set();
        Ok(())
    }
}

#[tokio::test]
async fn test_worker_iterations_reach_the_event_log() {
    let sink = RecordingSink::default();
    let subscriber = tracing_subscriber::registry()
        .with(EventLogLayer::new(sink.clone()).with_filter(event_log_filter()));
    let _guard = tracing::subscriber::set_default(subscriber);

    let signal = StopSignal::new();
    let task = Arc::new(SingleIterationTask(signal.clone()));
    let config = WorkerConfig {
        interval_ms: 10,
        ..MinServiceConfig::default().worker
    };

    let exit = WorkerLoop::new("Collector", task, signal, config).run().await;
    assert_eq!(exit.iterations, 1);

    let entries = sink.entries();
    for expected in ["Collector iteration 1 started", "Collector iteration 1 finished"] {
        assert!(
            entries.contains(&(EntryKind::Information, expected.to_string())),
            "missing '{}' in {:?}",
            expected,
            entries
        );
    }
}

/// Real console host whose status reports are also recorded
#[derive(Default)]
struct RecordingConsoleHost {
    inner: ConsoleHost,
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

struct RecordingReporter {
    inner: Arc<dyn StatusReporter>,
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

impl StatusReporter for RecordingReporter {
    fn report(&self, status: &StatusReport) -> crate::error::Result<()> {
        self.reports.lock().push(*status);
        self.inner.report(status)
    }
}

impl ServiceHost for RecordingConsoleHost {
    fn register(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> crate::error::Result<Arc<dyn StatusReporter>> {
        let inner = self.inner.register(service_name, handler)?;
        Ok(Arc::new(RecordingReporter {
            inner,
            reports: Arc::clone(&self.reports),
        }))
    }
}

impl RecordingConsoleHost {
    fn states(&self) -> Vec<LifecycleState> {
        self.reports.lock().iter().map(|r| r.state).collect()
    }

    async fn wait_for_state(&self, state: LifecycleState, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        while tokio::time::Instant::now() < deadline {
            if self.states().contains(&state) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_console_host_sigterm_shuts_service_down() {
    let mut config = MinServiceConfig::default();
    config.service.name = "ConsoleService".to_string();
    config.worker.interval_ms = 20;

    let host = Arc::new(RecordingConsoleHost::default());
    let controller = ServiceController::with_heartbeat(config, host.clone());
    let run = tokio::spawn(controller.run());

    // SIGTERM is only safe to raise once the console host owns it
    assert!(
        host.wait_for_state(LifecycleState::Running, Duration::from_secs(2))
            .await
    );

    let status = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    let exit = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("console service ignored SIGTERM")
        .unwrap()
        .unwrap();

    assert_eq!(exit.exit_code, 0);
    assert_eq!(exit.worker, WorkerOutcome::Exited);
    assert_eq!(
        host.states(),
        vec![
            LifecycleState::StartPending,
            LifecycleState::Running,
            LifecycleState::StopPending,
            LifecycleState::Stopped,
        ]
    );
}
