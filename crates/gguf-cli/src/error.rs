use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Gguf(#[from] gguf::GgufError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("usage: {0}")]
    Usage(String),

    #[error("tensor not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
