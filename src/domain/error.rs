use std::fmt;

/// Expected failure reported by a worker, e.g. a template that does not compile.
///
/// Weak errors are safe to show to the caller as a rendering problem; they do
/// not indicate that the worker or the network is unhealthy. The stack is the
/// one produced where the failure happened, carried over verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeakError {
    message: String,
    stack: Option<String>,
}

impl WeakError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl fmt::Display for WeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WeakError {}
