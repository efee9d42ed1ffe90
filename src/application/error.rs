use delegate_wire::WireError;
use thiserror::Error;

use crate::{
    application::transport::TransportError, domain::error::WeakError, infra::error::InfraError,
};

/// Failure of one delegated recipe or script execution.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("worker configuration error: {message}")]
    Configuration { message: String },
    #[error(transparent)]
    Weak(#[from] WeakError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("worker protocol violation: {message}")]
    Protocol { message: String },
    #[error("unsupported render request: {message}")]
    Unsupported { message: String },
    #[error("worker lease dropped before the delegation finished")]
    Cancelled,
}

impl DelegateError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Expected failures the caller may treat as a rendering problem rather
    /// than an infrastructure outage.
    pub fn is_weak(&self) -> bool {
        matches!(self, DelegateError::Weak(_))
    }

    /// Stack captured where a weak error originated.
    pub fn stack(&self) -> Option<&str> {
        match self {
            DelegateError::Weak(weak) => weak.stack(),
            _ => None,
        }
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            DelegateError::Configuration { .. } => "configuration",
            DelegateError::Weak(_) => "weak",
            DelegateError::Transport(_) => "transport",
            DelegateError::Protocol { .. } => "protocol",
            DelegateError::Unsupported { .. } => "unsupported",
            DelegateError::Cancelled => "cancelled",
        }
    }
}

impl From<WireError> for DelegateError {
    fn from(error: WireError) -> Self {
        DelegateError::protocol(error.to_string())
    }
}

/// Top-level error of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Delegate(#[from] DelegateError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_weak_errors_are_weak() {
        let weak =
            DelegateError::from(WeakError::new("bad template").with_stack(Some("at x".into())));
        assert!(weak.is_weak());
        assert_eq!(weak.stack(), Some("at x"));
        assert_eq!(weak.to_string(), "bad template");

        let fatal = DelegateError::from(TransportError::Status {
            status: 500,
            body: None,
        });
        assert!(!fatal.is_weak());
        assert_eq!(fatal.stack(), None);
        assert_eq!(fatal.kind(), "transport");
    }

    #[test]
    fn wire_errors_become_protocol_errors() {
        let err = DelegateError::from(WireError::malformed("missing req"));
        assert!(matches!(err, DelegateError::Protocol { .. }));
        assert!(err.to_string().contains("missing req"));
    }
}
