//! Client-side view of a running database: connection details and a Bolt
//! handshake probe.

mod bolt;
mod handle;

pub use bolt::{BoltVersion, handshake, handshake_request};
pub use handle::{DEFAULT_USERNAME, GraphHandle};
