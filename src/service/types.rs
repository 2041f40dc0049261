use std::fmt;
use std::ops::BitOr;

/// Service lifecycle states as seen by the host manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    StartPending,
    Running,
    StopPending,
    Stopped,
}

impl LifecycleState {
    /// Whether `next` is a legal forward step from `self`.
    ///
    /// STOPPED is reachable straight from START_PENDING only when start-up
    /// fails; STOP_PENDING requires RUNNING.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (StartPending, Running)
                | (StartPending, Stopped)
                | (Running, StopPending)
                | (StopPending, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Stopped
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartPending => "START_PENDING",
            Self::Running => "RUNNING",
            Self::StopPending => "STOP_PENDING",
            Self::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}

/// Control codes a host manager can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCode {
    Stop,
    Shutdown,
    Interrogate,
    /// Any other code, kept raw for logging
    Other(u32),
}

impl ControlCode {
    pub fn requests_stop(self) -> bool {
        matches!(self, Self::Stop | Self::Shutdown)
    }
}

/// Answer returned to the host's dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Handled,
    NotImplemented,
}

/// Set of control codes the service currently accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlsAccepted(u32);

impl ControlsAccepted {
    pub const NONE: Self = Self(0);
    pub const STOP: Self = Self(0x0000_0001);
    pub const SHUTDOWN: Self = Self(0x0000_0004);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ControlsAccepted {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Snapshot handed to the host manager on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub state: LifecycleState,
    pub controls_accepted: ControlsAccepted,
    pub exit_code: u32,
    pub checkpoint: u32,
}

impl StatusReport {
    pub fn start_pending() -> Self {
        Self {
            state: LifecycleState::StartPending,
            controls_accepted: ControlsAccepted::NONE,
            exit_code: 0,
            checkpoint: 0,
        }
    }

    pub fn running() -> Self {
        Self {
            state: LifecycleState::Running,
            controls_accepted: ControlsAccepted::STOP | ControlsAccepted::SHUTDOWN,
            exit_code: 0,
            checkpoint: 0,
        }
    }

    pub fn stop_pending() -> Self {
        Self {
            state: LifecycleState::StopPending,
            controls_accepted: ControlsAccepted::NONE,
            exit_code: 0,
            checkpoint: 4,
        }
    }

    pub fn stopped() -> Self {
        Self {
            state: LifecycleState::Stopped,
            controls_accepted: ControlsAccepted::NONE,
            exit_code: 0,
            checkpoint: 3,
        }
    }

    /// STOPPED after the stop signal could not be allocated
    pub fn start_failed(exit_code: u32) -> Self {
        Self {
            state: LifecycleState::Stopped,
            controls_accepted: ControlsAccepted::NONE,
            exit_code,
            checkpoint: 1,
        }
    }
}

/// How the worker loop ended from the controller's point of view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Worker observed the stop signal and returned
    Exited,
    /// Join bound elapsed; the worker was left running
    Detached,
    /// Worker task panicked or was cancelled by the runtime
    Failed(String),
    /// Joining was disabled
    NotJoined,
}

/// Result of a completed service run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceExit {
    pub exit_code: u32,
    pub worker: WorkerOutcome,
}

impl ServiceExit {
    /// Process exit code for a finished run: the STOPPED exit code on a clean
    /// shutdown, the error's OS code when start-up failed.
    pub fn process_exit_code(result: &crate::error::Result<ServiceExit>) -> u32 {
        match result {
            Ok(exit) => exit.exit_code,
            Err(e) => e.exit_code(),
        }
    }
}
