use serde::Serialize;
use std::fmt;

pub const ERR_VALIDATION: &str = "ERR_VALIDATION";
pub const ERR_DEPENDENCY: &str = "ERR_DEPENDENCY";
pub const ERR_SYSTEM: &str = "ERR_SYSTEM";
pub const ERR_ALREADY_RUNNING: &str = "ERR_ALREADY_RUNNING";
pub const ERR_NOT_RUNNING: &str = "ERR_NOT_RUNNING";
pub const ERR_SPAWN: &str = "ERR_SPAWN";
pub const ERR_EXITED_EARLY: &str = "ERR_EXITED_EARLY";
pub const ERR_BRIDGE: &str = "ERR_BRIDGE";
pub const ERR_CONNECT: &str = "ERR_CONNECT";
pub const ERR_TIMEOUT: &str = "ERR_TIMEOUT";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_VALIDATION, message, trace_id)
    }

    pub fn dependency(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_DEPENDENCY, message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_SYSTEM, message, trace_id)
    }

    pub fn already_running(trace_id: impl Into<String>) -> Self {
        Self::new(ERR_ALREADY_RUNNING, "scrcpy is already running", trace_id)
    }

    pub fn not_running(trace_id: impl Into<String>) -> Self {
        Self::new(ERR_NOT_RUNNING, "scrcpy is not running", trace_id)
    }

    pub fn spawn(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_SPAWN, message, trace_id)
    }

    pub fn exited_early(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_EXITED_EARLY, message, trace_id)
    }

    pub fn bridge(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_BRIDGE, message, trace_id)
    }

    pub fn connect_failed(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_CONNECT, message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new(ERR_TIMEOUT, message, trace_id)
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}
