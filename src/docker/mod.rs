// Docker CLI plumbing shared by the provisioner and the binary.

pub mod engine;
pub mod ps;
pub mod run;
pub mod types;

pub use engine::{ensure_available, user_args};
pub use ps::{PS_FORMAT, host_port_for, parse_ps_output};
pub use run::{DockerCli, Runtime};
pub use types::{CommandOutput, ContainerSummary, DockerCommand};
