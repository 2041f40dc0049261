use crate::service::LifecycleState;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service registration failed (code {code}): {message}")]
    Registration { code: u32, message: String },

    #[error("Failed to create stop signal (code {code})")]
    StopSignalCreation { code: u32 },

    #[error("Failed to deliver {state:?} status report: {message}")]
    ReportDelivery {
        state: LifecycleState,
        message: String,
    },

    #[error("Service control dispatcher failed (code {code}): {message}")]
    Dispatcher { code: u32, message: String },

    #[error("System error: {message}")]
    System { message: String },
}

impl ServiceError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn registration<S: Into<String>>(code: u32, message: S) -> Self {
        Self::Registration {
            code,
            message: message.into(),
        }
    }

    pub fn report_delivery<S: Into<String>>(state: LifecycleState, message: S) -> Self {
        Self::ReportDelivery {
            state,
            message: message.into(),
        }
    }

    /// Process exit code for this error when it ends the service
    pub fn exit_code(&self) -> u32 {
        match self {
            Self::Registration { code, .. }
            | Self::StopSignalCreation { code }
            | Self::Dispatcher { code, .. } => *code,
            Self::Io(e) => e.raw_os_error().map(|c| c as u32).unwrap_or(1),
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_carries_os_code() {
        assert_eq!(ServiceError::registration(1063, "not started by SCM").exit_code(), 1063);
        assert_eq!(ServiceError::StopSignalCreation { code: 8 }.exit_code(), 8);
        assert_eq!(ServiceError::system("boom").exit_code(), 1);
    }

    #[test]
    fn test_io_error_exit_code_uses_os_error() {
        let err = ServiceError::from(std::io::Error::from_raw_os_error(5));
        assert_eq!(err.exit_code(), 5);

        let err = ServiceError::from(std::io::Error::new(std::io::ErrorKind::Other, "no code"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_report_delivery_message_names_state() {
        let err = ServiceError::report_delivery(LifecycleState::Running, "handle closed");
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Running"));
        assert!(err.to_string().contains("handle closed"));
    }
}
