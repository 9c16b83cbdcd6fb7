use thiserror::Error;

#[derive(Error, Debug)]
pub enum RinksideError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),

    #[error("A session is already running")]
    AlreadyRunning,

    #[error("Reasoning call timed out after {0:.1}s")]
    ReasoningTimeout(f64),

    #[error("Reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("Tick processing failed in {component} at window {window}: {reason}")]
    TickProcessingError {
        component: &'static str,
        window: usize,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RinksideError>;
