use thiserror::Error;

/// Process-level failure: carries the exit code the binary should return.
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

    pub fn exit_code(&self) -> u8 {
        self.exit_code
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

/// Why a single request produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else if err.is_connect() {
            FetchFailure::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            FetchFailure::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            FetchFailure::Body(err.to_string())
        } else {
            FetchFailure::Request(err.to_string())
        }
    }
}

/// Why a date contributed no records to the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DayFailure {
    #[error("{0}")]
    Fetch(#[from] FetchFailure),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document held no usable rates")]
    Empty,
}

/// Every date in the window failed (or the window was empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no rate records were collected for the window")]
pub struct NoData;
