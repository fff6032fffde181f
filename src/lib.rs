//! Ephemeral Neo4j databases in local Docker containers.
//!
//! ```no_run
//! use tamarind::{Config, DockerProvisioner, Provisioner, StartOptions};
//!
//! # fn main() -> tamarind::Result<()> {
//! let provisioner = DockerProvisioner::new(Config::default())?;
//! provisioner.start("MyDatabase", &StartOptions::waiting())?;
//! let graph = provisioner.get("MyDatabase")?;
//! println!("{}", graph.uri());
//! provisioner.stop("MyDatabase")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod docker;
pub mod error;
pub mod graph;
pub mod provisioner;

pub use config::Config;
pub use error::{Error, Result};
pub use graph::GraphHandle;
pub use provisioner::{DockerProvisioner, Provisioner, StartOptions};
