use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host port for the first instance, and the Bolt port inside every container.
pub const BOLT_PORT: u16 = 7687;

/// Neo4j browser ports, only published when `mount_browser` is requested.
pub const BROWSER_HTTP_PORT: u16 = 7474;
pub const BROWSER_HTTPS_PORT: u16 = 7473;

/// Provisioner settings, fixed once the provisioner is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remove containers as soon as they stop (`docker run --rm`).
    pub autoremove_containers: bool,
    /// Passed verbatim as the Neo4j initial heap size.
    pub initial_heap_size: String,
    /// Passed verbatim as the Neo4j maximum heap size.
    pub max_memory_size: String,
    /// Initial password set inside each container, and used by lookup handles.
    /// Not a security boundary.
    pub password: String,
    pub image: String,
    pub base_port: u16,
    /// Container name prefix marking the managed namespace.
    pub prefix: String,
    /// Host used in lookup handles.
    pub host: String,
    /// Readiness checks made by a waiting start; zero skips waiting.
    pub wait_attempt_limit: u32,
    pub wait_interval_ms: u64,
    /// Run the container as the invoking user so mounted directories stay
    /// owned by them (Unix only).
    pub run_as_user: bool,
}

impl Config {
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            autoremove_containers: true,
            initial_heap_size: "2G".to_string(),
            max_memory_size: "4G".to_string(),
            password: "neo4jpw".to_string(),
            image: "neo4j:4.2".to_string(),
            base_port: BOLT_PORT,
            prefix: "tamarind_".to_string(),
            host: "localhost".to_string(),
            wait_attempt_limit: 20,
            wait_interval_ms: 3000,
            run_as_user: false,
        }
    }
}
