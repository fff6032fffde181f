use std::process::{Command, Stdio};

use log::debug;

use super::types::{CommandOutput, DockerCommand};

/// Something that can carry out `docker` invocations.
///
/// Every call blocks until the runtime answers. Implementations impose no
/// timeout of their own.
pub trait Runtime {
    fn execute(&self, cmd: &DockerCommand) -> std::io::Result<CommandOutput>;
}

impl<R: Runtime + ?Sized> Runtime for &R {
    fn execute(&self, cmd: &DockerCommand) -> std::io::Result<CommandOutput> {
        (**self).execute(cmd)
    }
}

/// Runs commands through the `docker` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    /// Use a different binary, e.g. `podman`, which accepts the same arguments.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for DockerCli {
    fn execute(&self, cmd: &DockerCommand) -> std::io::Result<CommandOutput> {
        debug!("{cmd}");
        let output = Command::new(&self.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .output()?;

        let result = CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success {
            debug!(
                "{} {} exited with {:?}: {}",
                self.program,
                cmd.subcommand().unwrap_or_default(),
                result.exit_code,
                result.stderr.trim()
            );
        }
        Ok(result)
    }
}
