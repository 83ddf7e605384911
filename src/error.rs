//! Error types for the upstream fetchers.
//!
//! Every failure is tagged with the [`Upstream`] it came from so the combined
//! handler can log it and fall back to that section's empty default.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

/// The external source a fetch talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Calendar,
    Weather,
    AirPollution,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Weather => "weather",
            Self::AirPollution => "air_pollution",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single upstream fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body-read failure.
    #[error("{upstream} request failed: {error}")]
    Transport {
        upstream: Upstream,
        #[source]
        error: reqwest::Error,
    },

    /// The upstream answered with a status we do not accept.
    #[error("unexpected response status from {upstream}: {status}")]
    Status {
        upstream: Upstream,
        status: StatusCode,
    },

    /// The body could not be decoded or reshaped.
    #[error("malformed {upstream} response: {reason}")]
    Malformed { upstream: Upstream, reason: String },

    /// A required environment variable was not set at startup.
    #[error("{0} environment variable missing")]
    Configuration(&'static str),
}

impl FetchError {
    pub fn transport(upstream: Upstream, error: reqwest::Error) -> Self {
        Self::Transport { upstream, error }
    }

    pub fn malformed(upstream: Upstream, reason: impl fmt::Display) -> Self {
        Self::Malformed {
            upstream,
            reason: reason.to_string(),
        }
    }

    /// HTTP status carried by the error, if the upstream answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { error, .. } => error.status(),
            _ => None,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
