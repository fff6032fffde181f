use std::path::{Path, PathBuf};

use crate::config::{BOLT_PORT, BROWSER_HTTP_PORT, BROWSER_HTTPS_PORT, Config};
use crate::docker::{self, DockerCommand, PS_FORMAT};

use super::options::StartOptions;

/// Container name for the instance called `name`.
pub fn container_name(cfg: &Config, name: &str) -> String {
    format!("{}{name}", cfg.prefix)
}

/// Build the detached `docker run` command for a new instance.
///
/// `cwd` anchors the default data and import directories.
pub fn run_command(
    cfg: &Config,
    name: &str,
    port: u16,
    opts: &StartOptions,
    cwd: &Path,
) -> DockerCommand {
    let mut args: Vec<String> = vec![
        "run".into(),
        "--detach".into(),
        "--name".into(),
        container_name(cfg, name),
    ];
    if cfg.autoremove_containers {
        args.push("--rm".into());
    }
    if cfg.run_as_user {
        args.extend(docker::user_args());
    }

    args.extend(["-p".into(), format!("{port}:{BOLT_PORT}")]);
    if opts.mount_browser {
        for browser_port in [BROWSER_HTTP_PORT, BROWSER_HTTPS_PORT] {
            args.extend(["-p".into(), format!("{browser_port}:{browser_port}")]);
        }
    }

    for (key, value) in environment(cfg) {
        args.extend(["-e".into(), format!("{key}={value}")]);
    }

    if let Some(host) = data_dir(opts, name, cwd) {
        args.extend(["-v".into(), format!("{}:/data:rw", host.display())]);
    }
    if let Some(host) = import_dir(opts, name, cwd) {
        args.extend(["-v".into(), format!("{}:/import:ro", host.display())]);
    }

    let image = opts.image.clone().unwrap_or_else(|| cfg.image.clone());
    args.extend([
        image,
        "bash".into(),
        "-c".into(),
        container_script(&cfg.password, &opts.run_before, &opts.run_after),
    ]);

    DockerCommand { args }
}

/// Environment handed to the Neo4j process.
pub fn environment(cfg: &Config) -> Vec<(&'static str, String)> {
    let bolt_address = format!("0.0.0.0:{BOLT_PORT}");
    vec![
        (
            "NEO4J_dbms_memory_heap_initial__size",
            cfg.initial_heap_size.clone(),
        ),
        (
            "NEO4J_dbms_memory_heap_max__size",
            cfg.max_memory_size.clone(),
        ),
        (
            "NEO4J_dbms_connector_bolt_listen__address",
            bolt_address.clone(),
        ),
        (
            "NEO4J_dbms_connector_bolt_advertised__address",
            bolt_address,
        ),
    ]
}

/// Shell script run inside the container: set the password, start the
/// database in the background, and keep the container alive.
pub fn container_script(password: &str, run_before: &str, run_after: &str) -> String {
    let mut script = String::new();
    let run_before = run_before.trim();
    if !run_before.is_empty() {
        script.push_str(run_before);
        script.push_str(" ; ");
    }
    script.push_str("./bin/neo4j-admin set-initial-password ");
    script.push_str(&shell_words::quote(password));
    script.push_str(" && neo4j start");
    let run_after = run_after.trim();
    if !run_after.is_empty() {
        script.push_str(" && ");
        script.push_str(run_after);
    }
    script.push_str(" && tail -f /dev/null");
    script
}

fn data_dir(opts: &StartOptions, name: &str, cwd: &Path) -> Option<PathBuf> {
    match &opts.data_path {
        Some(path) => Some(path.clone()),
        None if opts.use_data_path => Some(cwd.join("data").join(name)),
        None => None,
    }
}

fn import_dir(opts: &StartOptions, name: &str, cwd: &Path) -> Option<PathBuf> {
    match &opts.import_path {
        Some(path) => Some(path.clone()),
        None if opts.use_import_path => Some(cwd.join("import").join(name)),
        None => None,
    }
}

/// Build the `docker ps` command listing running containers in the managed
/// namespace. Docker's name filter matches substrings; callers still check
/// the prefix.
pub fn ps_command(cfg: &Config) -> DockerCommand {
    DockerCommand::new([
        "ps".to_string(),
        "--filter".into(),
        format!("name={}", cfg.prefix),
        "--format".into(),
        PS_FORMAT.into(),
    ])
}

pub fn stop_command(cfg: &Config, name: &str) -> DockerCommand {
    DockerCommand::new(["stop".to_string(), container_name(cfg, name)])
}

pub fn remove_command(cfg: &Config, name: &str) -> DockerCommand {
    DockerCommand::new(["rm".to_string(), container_name(cfg, name)])
}

/// Prints `true` while the container is running.
pub fn inspect_running_command(cfg: &Config, name: &str) -> DockerCommand {
    DockerCommand::new([
        "inspect".to_string(),
        "--format".into(),
        "{{.State.Running}}".into(),
        container_name(cfg, name),
    ])
}
