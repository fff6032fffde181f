//! Errors surfaced by provisioner operations.

use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// instance names must be non-empty and usable as a container name suffix
    #[error("invalid instance name {0:?}: use letters, digits, '_', '.' or '-' and no spaces")]
    InvalidName(String),

    /// an instance with this name is already running
    #[error("cannot start {0}, already running")]
    NameConflict(String),

    /// no running instance has this name
    #[error("no running instance named {0}")]
    NotFound(String),

    /// the container runtime could not carry out the request
    #[error("{message}")]
    Provision {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// the container went away while waiting for it to become ready
    #[error("container for {0} has exited")]
    ContainerExited(String),

    /// the database did not answer a handshake within the attempt budget
    #[error(
        "{name} was not ready after {attempts} attempts ({elapsed:.1?}); raise the wait attempt limit for large imports"
    )]
    NotReady {
        name: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// the provisioner does not implement this operation
    #[error("operation not supported by this provisioner: {0}")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn provision(message: impl Into<String>) -> Self {
        Error::Provision {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn runtime_io(err: std::io::Error) -> Self {
        Error::Provision {
            message: format!("failed to invoke container runtime: {err}"),
            source: Some(err),
        }
    }
}
