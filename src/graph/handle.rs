use std::io;
use std::time::Duration;

use serde::Serialize;

use super::bolt::{self, BoltVersion};

pub const DEFAULT_USERNAME: &str = "neo4j";

/// Connection details for one running database.
///
/// Returned by name-keyed lookup. Holding one does not keep a connection
/// open; hand [`GraphHandle::uri`] and the credentials to a Bolt driver to
/// run queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphHandle {
    host: String,
    port: u16,
    username: String,
    #[serde(skip)]
    password: String,
}

impl GraphHandle {
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: DEFAULT_USERNAME.to_string(),
            password: password.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// `bolt://host:port`
    pub fn uri(&self) -> String {
        format!("bolt://{}:{}", self.host, self.port)
    }

    /// Open a connection and complete the Bolt handshake.
    ///
    /// Succeeds once the server inside the container accepts clients.
    pub fn ping(&self, timeout: Duration) -> io::Result<BoltVersion> {
        bolt::handshake(&self.host, self.port, timeout)
    }
}
