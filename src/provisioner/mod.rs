//! The provisioning contract and its Docker-backed implementation.

pub mod commands;
mod docker;
mod options;

use std::collections::BTreeMap;

pub use docker::DockerProvisioner;
pub use options::StartOptions;

use crate::error::{Error, Result};
use crate::graph::GraphHandle;

/// Creates, lists, and tears down database instances.
///
/// Implementations keep no record of instances themselves; every call asks
/// the backing runtime.
pub trait Provisioner {
    /// Start a new database called `name` and return the port it listens on.
    ///
    /// Unless `options.wait` is set the database may still be booting when
    /// this returns.
    fn start(&self, name: &str, options: &StartOptions) -> Result<u16>;

    /// All running databases managed by this provisioner, by name.
    fn ps(&self) -> Result<BTreeMap<String, u16>>;

    /// Stop the database called `name`.
    fn stop(&self, _name: &str) -> Result<()> {
        Err(Error::Unsupported("stop"))
    }

    /// Connection handle for the running database called `name`.
    fn get(&self, name: &str) -> Result<GraphHandle>;
}

/// Instance names end up in container names, so they must be non-empty and
/// limited to characters Docker accepts there.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// Lowest port at or above `base` that is not in `taken`.
pub fn next_free_port(base: u16, taken: impl IntoIterator<Item = u16>) -> Option<u16> {
    let mut taken: Vec<u16> = taken.into_iter().filter(|p| *p >= base).collect();
    taken.sort_unstable();
    taken.dedup();

    let mut candidate = base;
    for port in taken {
        if port != candidate {
            break;
        }
        candidate = candidate.checked_add(1)?;
    }
    Some(candidate)
}
