/// Core error type for the gateway.
///
/// Adapter crates map their specific errors into this type so the core can
/// decide between a user-facing message and a logged internal fault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("duplicate command: {0} is already registered")]
    DuplicateCommand(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
