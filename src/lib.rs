pub mod config;
pub mod error;
pub mod host;
pub mod service;
pub mod worker;

pub use config::{MinServiceConfig, WorkerCadence};
pub use error::{Result, ServiceError};
pub use host::eventlog::{event_log_filter, EntryKind, EventLogLayer, EventSink};
pub use host::{ConsoleHost, MockServiceHost, ServiceHost, StatusReporter};
pub use service::{
    ControlCode, ControlHandler, ControlOutcome, ControlsAccepted, LifecycleState,
    ServiceController, ServiceExit, StatusReport, StopSignal, WorkerOutcome,
};
pub use worker::{HeartbeatTask, ServiceTask, WorkerExit, WorkerLoop};

#[cfg(windows)]
pub use host::eventlog::EventSource;
#[cfg(windows)]
pub use host::windows::{run_dispatcher, WindowsServiceHost};
