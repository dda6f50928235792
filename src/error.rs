//! Application-level error type.
//!
//! Library modules return their own `thiserror` enums; everything that reaches
//! `app::run` is converted into an `AppError` carrying the process exit code.
//!
//! Exit codes:
//! - `1` missing input data or invalid arguments
//! - `2` configuration errors (missing credential, unreadable settings)
//! - `3` schema violations in fetched data
//! - `4` source failures and output write / render failures

/// Missing input data file, invalid CLI arguments.
pub const EXIT_MISSING_INPUT: u8 = 1;
/// Missing credential, malformed settings file.
pub const EXIT_CONFIG: u8 = 2;
/// Fetched data does not match the declared query schemas.
pub const EXIT_SCHEMA: u8 = 3;
/// Source aborted the run, output could not be written or rendered.
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// A missing-input error with a hint pointing at the upstream command.
    pub fn missing_input(message: impl Into<String>, hint: impl AsRef<str>) -> Self {
        Self::new(
            EXIT_MISSING_INPUT,
            format!("{}\nHINT: {}", message.into(), hint.as_ref()),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
