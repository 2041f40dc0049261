mod controller;
mod handler;
mod runtime;
mod shutdown;
mod signal;
mod state;
mod types;


pub use controller::ServiceController;
pub use handler::ControlHandler;
pub use signal::StopSignal;
pub use state::ServiceContext;
pub use types::{
    ControlCode, ControlOutcome, ControlsAccepted, LifecycleState, ServiceExit, StatusReport,
    WorkerOutcome,
};
