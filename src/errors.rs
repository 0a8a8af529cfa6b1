use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Inquire(#[from] inquire::error::InquireError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("error sending message on channel")]
    TokioMpsc,
    #[error(transparent)]
    InitLoggingError(#[from] tracing_subscriber::util::TryInitError),
    #[error(transparent)]
    LogDirective(#[from] tracing_subscriber::filter::ParseError),
    #[error("no GitHub token found, pass --token or set GITHUB_TOKEN")]
    MissingToken,
    #[error("operation cancelled, session closed")]
    Cancelled,
    #[error("no {kind} named {name:?} in this repository")]
    UnknownCandidate { kind: &'static str, name: String },
    #[error(transparent)]
    Shared(#[from] Arc<AppError>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for AppError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::TokioMpsc
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
