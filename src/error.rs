//! Error taxonomy for run configuration and orchestration.
//!
//! External-process failure is deliberately absent: a failed pre-process or
//! solve is reported through the orchestrator's run state and a non-zero
//! status code, never as an `Err`.
use std::path::PathBuf;
use thiserror::Error;

/// Library result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("keyword {keyword:?} not found{}", describe_anchor(.after))]
    KeywordNotFound {
        keyword: String,
        after: Option<String>,
    },

    #[error("token {token:?} not found{}", describe_anchor(.after))]
    TokenNotFound {
        token: String,
        after: Option<String>,
    },

    #[error("unsupported interval or forcing mode: {0:?}")]
    UnsupportedInterval(String),

    #[error("invalid forcing spec: {0}")]
    InvalidForcingSpec(String),

    #[error("pre-processing failed; solver run refused")]
    PreprocessRequired,

    #[error("run length {length} x interval {interval}s does not match end time {end_time}s")]
    InconsistentRunLength {
        length: f64,
        end_time: f64,
        interval: f64,
    },

    #[error("run length requires an end time, or a length plus an interval")]
    MissingRunLength,

    #[error("cannot decode {value:?} as {kind}")]
    Decode { value: String, kind: &'static str },

    #[error("invalid run config: {0}")]
    Config(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn describe_anchor(after: &Option<String>) -> String {
    match after {
        Some(anchor) => format!(" after {anchor:?}"),
        None => String::new(),
    }
}
