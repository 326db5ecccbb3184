use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Coarse category of a [`TranscodeError`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Open,
    UnsupportedEncoder,
    Decode,
    Convert,
    Encode,
    Write,
    Resource,
    MissingStats,
    Config,
    Cancelled,
    Io,
}

/// Every failure is fatal to the pass that raised it and aborts the run.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("could not open input {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("encoder not available: {0}")]
    UnsupportedEncoder(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("could not create frame converter: {0}")]
    Convert(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("write to {target} failed: {reason}")]
    Write { target: String, reason: String },

    #[error("could not allocate {0}")]
    Resource(String),

    #[error("second pass requires first-pass rate-control statistics: {0}")]
    MissingStats(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transcode cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscodeError::Open { .. } => ErrorKind::Open,
            TranscodeError::UnsupportedEncoder(_) => ErrorKind::UnsupportedEncoder,
            TranscodeError::Decode(_) => ErrorKind::Decode,
            TranscodeError::Convert(_) => ErrorKind::Convert,
            TranscodeError::Encode(_) => ErrorKind::Encode,
            TranscodeError::Write { .. } => ErrorKind::Write,
            TranscodeError::Resource(_) => ErrorKind::Resource,
            TranscodeError::MissingStats(_) => ErrorKind::MissingStats,
            TranscodeError::Config(_) => ErrorKind::Config,
            TranscodeError::Cancelled => ErrorKind::Cancelled,
            TranscodeError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TranscodeError::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(target: impl ToString, reason: impl ToString) -> Self {
        TranscodeError::Write {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}
