use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Status target not found: {0}")]
    MissingStatusTarget(String),

    #[error("No application owns instance '{addr}' (series '{key}')")]
    UnresolvedLabel { key: String, addr: String },

    #[error("Row has {actual} values but the window holds {expected} series")]
    ColumnMismatch { expected: usize, actual: usize },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const FEED_ERROR: i32 = 3;
    pub const RENDER_ERROR: i32 = 4;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => exit_code::INVALID_ARGUMENTS,
            Error::Feed(_) | Error::Json(_) => exit_code::FEED_ERROR,
            Error::Render(_) | Error::ColumnMismatch { .. } => exit_code::RENDER_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}
