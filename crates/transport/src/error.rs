//! Transport errors

use sluice_pipeline::PipelineError;
use std::fmt;
use std::io;
use std::net::SocketAddr;

/// Lifecycle position of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Created,
    Launched,
    Stopped,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Launched => "launched",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Errors from listener construction and launch
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Invalid listener configuration
    #[error("invalid listener configuration: {0}")]
    Config(String),

    /// Stage overrides did not resolve
    #[error("invalid pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    /// Socket creation or bind failed
    #[error("failed to bind UDP socket to {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Operation not allowed in the current state
    #[error("cannot {operation} a listener that is {state}")]
    Lifecycle {
        operation: &'static str,
        state: ListenerState,
    },
}

impl ListenerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn bind(address: SocketAddr, source: io::Error) -> Self {
        Self::Bind { address, source }
    }
}

/// Errors from event-loop construction
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("worker_threads must be at least 1")]
    NoWorkers,

    #[error("failed to build event loop runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("no async runtime is running on this thread")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_message() {
        let err = ListenerError::Lifecycle {
            operation: "launch",
            state: ListenerState::Stopped,
        };
        assert_eq!(err.to_string(), "cannot launch a listener that is stopped");
    }

    #[test]
    fn test_bind_keeps_source() {
        use std::error::Error;

        let err = ListenerError::bind(
            "127.0.0.1:12201".parse().unwrap(),
            io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        );
        assert!(err.to_string().contains("127.0.0.1:12201"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_pipeline_error_converts() {
        let err: ListenerError = PipelineError::UnknownStage("x".into()).into();
        assert!(matches!(err, ListenerError::Pipeline(_)));
    }
}
