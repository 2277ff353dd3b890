//! Emitter error taxonomy.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Lifecycle of an [`Emitter`](crate::Emitter).
///
/// An unconfigured emitter is an `EmitterConfig` that has not been through
/// `Emitter::configure` yet, so every live instance starts out `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmitterState {
    Ready,
    Running,
    Stopped,
}

impl fmt::Display for EmitterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EmitterState::Ready => "ready",
            EmitterState::Running => "running",
            EmitterState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum EmitError {
    /// Rejected at configure time, never raised during a run.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to create socket: {source}")]
    SocketCreationFailed {
        #[source]
        source: io::Error,
    },

    /// Per-destination, per-packet. Logged and counted, never returned from a run.
    #[error("transmission to {dest} failed: {source}")]
    TransmissionFailed {
        dest: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("emitter is {0}, expected ready")]
    NotReady(EmitterState),
}

impl EmitError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        EmitError::InvalidConfiguration(msg.into())
    }
}

pub type EmitResult<T> = Result<T, EmitError>;
