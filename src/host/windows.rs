//! Windows Service Control Manager backend.

use super::{ServiceHost, StatusReporter};
use crate::config::MinServiceConfig;
use crate::error::{Result, ServiceError};
use crate::service::{
    ControlCode, ControlHandler, ControlOutcome, LifecycleState, ServiceContext,
    ServiceController, ServiceExit, StatusReport,
};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{error, info};
use windows_service::service::{
    ServiceControl, ServiceControlAccept, ServiceExitCode, ServiceState, ServiceStatus,
    ServiceType,
};
use windows_service::service_control_handler::{
    self, ServiceControlHandlerResult, ServiceStatusHandle,
};
use windows_service::{define_windows_service, service_dispatcher};

/// Hand-off from `run_dispatcher` to the FFI service entry point, which the
/// SCM calls on its own thread without user data.
static DISPATCH_CONFIG: OnceLock<MinServiceConfig> = OnceLock::new();

/// Exit code of the service run, read back once the dispatcher returns
static SERVICE_EXIT_CODE: AtomicU32 = AtomicU32::new(0);

define_windows_service!(ffi_service_main, service_main);

/// Connect to the SCM and block until the service stops.
///
/// Returns the process exit code of the service run. Fails with `Dispatcher`
/// when the process was not started by the SCM.
pub fn run_dispatcher(config: MinServiceConfig) -> Result<u32> {
    let service_name = config.service.name.clone();
    DISPATCH_CONFIG
        .set(config)
        .map_err(|_| ServiceError::system("Service dispatcher already started"))?;

    info!("Starting service control dispatcher for '{}'", service_name);
    service_dispatcher::start(&service_name, ffi_service_main).map_err(|e| {
        ServiceError::Dispatcher {
            code: os_error_code(&e),
            message: e.to_string(),
        }
    })?;

    Ok(SERVICE_EXIT_CODE.load(Ordering::SeqCst))
}

fn service_main(_arguments: Vec<OsString>) {
    let Some(config) = DISPATCH_CONFIG.get().cloned() else {
        error!("Service entry point invoked without configuration");
        record_exit(&Err(ServiceError::system("missing dispatcher configuration")));
        return;
    };

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => {
            let controller =
                ServiceController::with_heartbeat(config, Arc::new(WindowsServiceHost));
            runtime.block_on(controller.run())
        }
        Err(e) => {
            error!("Failed to build async runtime: {}", e);
            let e = ServiceError::from(e);
            report_start_failure(&config.service.name, &e);
            Err(e)
        }
    };

    record_exit(&result);
}

fn record_exit(result: &Result<ServiceExit>) -> u32 {
    match result {
        Ok(exit) => info!("Service run finished: {:?}", exit),
        Err(e) => error!("Service run failed: {}", e),
    }

    let code = ServiceExit::process_exit_code(result);
    SERVICE_EXIT_CODE.store(code, Ordering::SeqCst);
    code
}

/// Register only to tell the SCM the service could not start
fn report_start_failure(service_name: &str, error: &ServiceError) {
    let context = Arc::new(ServiceContext::new(service_name));
    let handler = ControlHandler::new(Arc::clone(&context));

    match WindowsServiceHost.register(service_name, handler) {
        Ok(reporter) => {
            context.attach_reporter(reporter);
            context.transition(StatusReport::start_failed(error.exit_code()));
        }
        Err(e) => error!(
            "Could not report start-up failure for '{}': {}",
            service_name, e
        ),
    }
}

/// `ServiceHost` backed by `RegisterServiceCtrlHandlerExW`
#[derive(Debug, Default)]
pub struct WindowsServiceHost;

impl ServiceHost for WindowsServiceHost {
    fn register(
        &self,
        service_name: &str,
        handler: ControlHandler,
    ) -> Result<Arc<dyn StatusReporter>> {
        let event_handler = move |control: ServiceControl| -> ServiceControlHandlerResult {
            match handler.handle(ControlCode::from(control)) {
                ControlOutcome::Handled => ServiceControlHandlerResult::NoError,
                ControlOutcome::NotImplemented => ServiceControlHandlerResult::NotImplemented,
            }
        };

        let status_handle = service_control_handler::register(service_name, event_handler)
            .map_err(|e| ServiceError::registration(os_error_code(&e), e.to_string()))?;

        Ok(Arc::new(WindowsStatusReporter {
            status_handle: Mutex::new(status_handle),
        }))
    }
}

struct WindowsStatusReporter {
    status_handle: Mutex<ServiceStatusHandle>,
}

impl StatusReporter for WindowsStatusReporter {
    fn report(&self, status: &StatusReport) -> Result<()> {
        let service_status = ServiceStatus {
            service_type: ServiceType::OWN_PROCESS,
            current_state: status.state.into(),
            controls_accepted: ServiceControlAccept::from_bits_truncate(
                status.controls_accepted.bits(),
            ),
            exit_code: ServiceExitCode::Win32(status.exit_code),
            checkpoint: status.checkpoint,
            wait_hint: Duration::default(),
            process_id: None,
        };

        self.status_handle
            .lock()
            .set_service_status(service_status)
            .map_err(|e| ServiceError::report_delivery(status.state, e.to_string()))
    }
}

impl From<ServiceControl> for ControlCode {
    fn from(control: ServiceControl) -> Self {
        match control {
            ServiceControl::Stop => Self::Stop,
            ServiceControl::Shutdown => Self::Shutdown,
            ServiceControl::Interrogate => Self::Interrogate,
            other => Self::Other(other.raw_service_control_type()),
        }
    }
}

impl From<LifecycleState> for ServiceState {
    fn from(state: LifecycleState) -> Self {
        match state {
            LifecycleState::StartPending => ServiceState::StartPending,
            LifecycleState::Running => ServiceState::Running,
            LifecycleState::StopPending => ServiceState::StopPending,
            LifecycleState::Stopped => ServiceState::Stopped,
        }
    }
}

fn os_error_code(error: &windows_service::Error) -> u32 {
    match error {
        windows_service::Error::Winapi(io_error) => {
            io_error.raw_os_error().map(|c| c as u32).unwrap_or(1)
        }
        _ => 1,
    }
}
