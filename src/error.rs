use thiserror::Error;

pub type Result<A, E = Error> = std::result::Result<A, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("range error: {0}")]
    Range(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn schema<S: Into<String>>(msg: S) -> Self {
        Error::Schema(msg.into())
    }

    pub(crate) fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        Error::TypeMismatch(msg.into())
    }

    pub(crate) fn range<S: Into<String>>(msg: S) -> Self {
        Error::Range(msg.into())
    }

    pub(crate) fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }
}
