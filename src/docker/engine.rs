use crate::error::{Error, Result};

use super::run::Runtime;
use super::types::DockerCommand;

/// Verify that the Docker daemon is reachable.
pub fn ensure_available(runtime: &impl Runtime) -> Result<()> {
    let out = runtime
        .execute(&DockerCommand::new([
            "version",
            "--format",
            "{{.Server.Version}}",
        ]))
        .map_err(|e| Error::Provision {
            message: format!("failed to invoke `docker`, is it installed and on PATH? ({e})"),
            source: Some(e),
        })?;

    if !out.success {
        return Err(Error::provision(format!(
            "docker daemon is not running (exit {:?}): {}",
            out.exit_code,
            out.stderr.trim()
        )));
    }
    Ok(())
}

/// Returns `["--user", "uid:gid"]` on Unix so containers write files
/// as the invoking user. Empty on other platforms.
pub fn user_args() -> Vec<String> {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() and getegid() are simple POSIX getters that always succeed and have no side effects.
        let uid = unsafe { libc::geteuid() };
        let gid = unsafe { libc::getegid() };
        vec!["--user".into(), format!("{uid}:{gid}")]
    }

    #[cfg(not(unix))]
    {
        Vec::new()
    }
}
