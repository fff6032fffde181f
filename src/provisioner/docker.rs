use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::{BOLT_PORT, Config};
use crate::docker::{CommandOutput, DockerCli, DockerCommand, Runtime, parse_ps_output};
use crate::error::{Error, Result};
use crate::graph::GraphHandle;

use super::commands::{
    container_name, inspect_running_command, ps_command, remove_command, run_command, stop_command,
};
use super::{Provisioner, StartOptions, next_free_port, validate_name};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// A database provisioning service that creates Docker containers locally.
///
/// Good for quick prototyping, e.g. when you want several throwaway
/// databases mounted from the current directory.
pub struct DockerProvisioner<R = DockerCli> {
    config: Config,
    runtime: R,
    work_dir: PathBuf,
}

impl DockerProvisioner<DockerCli> {
    /// Provisioner driving the local `docker` binary, with default data
    /// directories under the current working directory.
    pub fn new(config: Config) -> Result<Self> {
        let work_dir = std::env::current_dir().map_err(|e| Error::Provision {
            message: format!("cannot determine working directory: {e}"),
            source: Some(e),
        })?;
        Ok(Self::with_runtime(config, DockerCli::new(), work_dir))
    }
}

impl<R: Runtime> DockerProvisioner<R> {
    pub fn with_runtime(config: Config, runtime: R, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            runtime,
            work_dir: work_dir.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Run `cmd`, treating a non-zero exit as a provisioning failure.
    fn execute(&self, cmd: &DockerCommand) -> Result<CommandOutput> {
        let out = self.runtime.execute(cmd).map_err(Error::runtime_io)?;
        if out.success {
            Ok(out)
        } else {
            Err(Error::provision(format!(
                "docker {} failed (exit {:?}): {}",
                cmd.subcommand().unwrap_or_default(),
                out.exit_code,
                out.stderr.trim()
            )))
        }
    }

    /// Whether the container for `name` exists and is running.
    pub fn is_running(&self, name: &str) -> Result<bool> {
        let out = self
            .runtime
            .execute(&inspect_running_command(&self.config, name))
            .map_err(Error::runtime_io)?;
        if out.success {
            return Ok(out.stdout.trim() == "true");
        }
        // `docker inspect` fails outright once an autoremoved container is gone.
        if is_missing_container(&out.stderr) {
            return Ok(false);
        }
        Err(Error::provision(format!(
            "docker inspect failed (exit {:?}): {}",
            out.exit_code,
            out.stderr.trim()
        )))
    }

    /// Poll until `name` answers a Bolt handshake.
    ///
    /// Sleeps before each attempt. Fails early if the container disappears.
    /// An `attempt_limit` of zero means no waiting at all.
    pub fn wait_until_ready(&self, name: &str, port: u16, attempt_limit: u32) -> Result<()> {
        if attempt_limit == 0 {
            debug!("{name}: readiness check skipped, attempt limit is 0");
            return Ok(());
        }
        let handle = self.handle(port);
        let started = Instant::now();

        for attempt in 1..=attempt_limit {
            std::thread::sleep(self.config.wait_interval());

            if !self.is_running(name)? {
                return Err(Error::ContainerExited(name.to_string()));
            }

            match handle.ping(PING_TIMEOUT) {
                Ok(version) => {
                    info!(
                        "{name} ready on {} (bolt {version}, attempt {attempt})",
                        handle.uri()
                    );
                    return Ok(());
                }
                Err(e) => debug!("{name} not ready yet (attempt {attempt}): {e}"),
            }
        }

        Err(Error::NotReady {
            name: name.to_string(),
            attempts: attempt_limit,
            elapsed: started.elapsed(),
        })
    }

    fn handle(&self, port: u16) -> GraphHandle {
        GraphHandle::new(self.config.host.clone(), port, self.config.password.clone())
    }
}

fn is_missing_container(stderr: &str) -> bool {
    stderr.contains("No such object") || stderr.contains("No such container")
}

impl<R: Runtime> Provisioner for DockerProvisioner<R> {
    fn start(&self, name: &str, options: &StartOptions) -> Result<u16> {
        validate_name(name)?;

        let running = self.ps()?;
        if running.contains_key(name) {
            return Err(Error::NameConflict(name.to_string()));
        }

        let port = next_free_port(self.config.base_port, running.values().copied())
            .ok_or_else(|| Error::provision("no free host port left above the base port"))?;

        let cmd = run_command(&self.config, name, port, options, &self.work_dir);
        let out = self.runtime.execute(&cmd).map_err(Error::runtime_io)?;
        if !out.success {
            // Docker refuses a name held by a container `ps` did not show,
            // e.g. one that is stopped but not yet removed.
            if out.stderr.contains("is already in use") {
                return Err(Error::NameConflict(name.to_string()));
            }
            return Err(Error::provision(format!(
                "failed to start {name} (exit {:?}): {}",
                out.exit_code,
                out.stderr.trim()
            )));
        }
        info!(
            "started {} on port {port} ({})",
            container_name(&self.config, name),
            out.stdout.trim()
        );

        if options.wait {
            let limit = options
                .wait_attempt_limit
                .unwrap_or(self.config.wait_attempt_limit);
            self.wait_until_ready(name, port, limit)?;
        }

        Ok(port)
    }

    fn ps(&self) -> Result<BTreeMap<String, u16>> {
        let out = self.execute(&ps_command(&self.config))?;
        let mut instances = BTreeMap::new();

        for row in parse_ps_output(&out.stdout, &self.config.prefix, BOLT_PORT) {
            let name = &row.name[self.config.prefix.len()..];
            match row.bolt_port {
                Some(port) => {
                    instances.insert(name.to_string(), port);
                }
                None => warn!(
                    "{} publishes no port for {BOLT_PORT}/tcp, skipping",
                    row.name
                ),
            }
        }
        Ok(instances)
    }

    fn stop(&self, name: &str) -> Result<()> {
        if !self.ps()?.contains_key(name) {
            return Err(Error::NotFound(name.to_string()));
        }

        self.execute(&stop_command(&self.config, name))?;
        if !self.config.autoremove_containers {
            // With autoremove the runtime already deletes it; `rm` would fail.
            self.execute(&remove_command(&self.config, name))?;
        }
        info!("stopped {}", container_name(&self.config, name));
        Ok(())
    }

    fn get(&self, name: &str) -> Result<GraphHandle> {
        let port = self
            .ps()?
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.handle(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// In-memory stand-in for the docker CLI: tracks containers created by
    /// `run` and answers `ps`, `stop`, `rm`, and `inspect` from that state.
    #[derive(Default)]
    struct FakeDocker {
        /// (container name, host port, autoremove, running)
        containers: RefCell<Vec<(String, u16, bool, bool)>>,
        log: RefCell<Vec<DockerCommand>>,
        fail_run: Option<String>,
    }

    impl Runtime for FakeDocker {
        fn execute(&self, cmd: &DockerCommand) -> std::io::Result<CommandOutput> {
            self.log.borrow_mut().push(cmd.clone());
            let mut containers = self.containers.borrow_mut();
            let out = match cmd.subcommand() {
                Some("run") => {
                    if let Some(stderr) = &self.fail_run {
                        return Ok(CommandOutput::failed(125, stderr.clone()));
                    }
                    let name = cmd.flag_value("--name").unwrap_or_default().to_string();
                    if containers.iter().any(|c| c.0 == name) {
                        return Ok(CommandOutput::failed(
                            125,
                            format!("Conflict. The container name \"/{name}\" is already in use"),
                        ));
                    }
                    let port = cmd
                        .flag_value("-p")
                        .and_then(|p| p.split(':').next())
                        .and_then(|p| p.parse().ok())
                        .unwrap_or_default();
                    let autoremove = cmd.args.iter().any(|a| a == "--rm");
                    containers.push((name, port, autoremove, true));
                    CommandOutput::ok("c0ffee\n")
                }
                Some("ps") => CommandOutput::ok(
                    containers
                        .iter()
                        .filter(|c| c.3)
                        .map(|c| format!("{}\t0.0.0.0:{}->7687/tcp\n", c.0, c.1))
                        .collect::<String>(),
                ),
                Some("stop") => {
                    let name = &cmd.args[1];
                    match containers.iter().position(|c| &c.0 == name) {
                        Some(i) if containers[i].2 => {
                            containers.remove(i);
                            CommandOutput::ok(name.clone())
                        }
                        Some(i) => {
                            containers[i].3 = false;
                            CommandOutput::ok(name.clone())
                        }
                        None => CommandOutput::failed(1, "No such container"),
                    }
                }
                Some("rm") => {
                    let name = &cmd.args[1];
                    let before = containers.len();
                    containers.retain(|c| &c.0 != name || c.3);
                    if containers.len() < before {
                        CommandOutput::ok(name.clone())
                    } else {
                        CommandOutput::failed(1, "cannot remove container")
                    }
                }
                Some("inspect") => {
                    let name = cmd.args.last().cloned().unwrap_or_default();
                    match containers.iter().find(|c| c.0 == name) {
                        Some(c) => CommandOutput::ok(format!("{}\n", c.3)),
                        None => CommandOutput::failed(1, "No such object"),
                    }
                }
                _ => CommandOutput::failed(1, "unknown command"),
            };
            Ok(out)
        }
    }

    fn provisioner(config: Config) -> DockerProvisioner<FakeDocker> {
        DockerProvisioner::with_runtime(config, FakeDocker::default(), "/work")
    }

    #[test]
    fn start_then_ps_lists_instance_at_or_above_base() {
        let p = provisioner(Config::default());
        let port = p.start("MyDatabase", &StartOptions::default()).unwrap();
        assert!(port >= 7687);
        assert_eq!(p.ps().unwrap().get("MyDatabase"), Some(&port));
    }

    #[test]
    fn sequential_ports_and_stop() {
        let p = provisioner(Config::default());
        let first = p.start("MyDatabase", &StartOptions::default()).unwrap();
        let second = p.start("OldDatabase", &StartOptions::default()).unwrap();
        assert_eq!(first, 7687);
        assert_eq!(second, 7688);

        p.stop("OldDatabase").unwrap();
        let running = p.ps().unwrap();
        assert_eq!(running.len(), 1);
        assert_eq!(running["MyDatabase"], first);
    }

    #[test]
    fn duplicate_start_is_a_name_conflict() {
        let p = provisioner(Config::default());
        p.start("dup", &StartOptions::default()).unwrap();
        assert!(matches!(
            p.start("dup", &StartOptions::default()),
            Err(Error::NameConflict(n)) if n == "dup"
        ));
        assert_eq!(p.ps().unwrap().len(), 1);
    }

    #[test]
    fn runtime_name_clash_is_a_name_conflict() {
        let mut cfg = Config::default();
        cfg.autoremove_containers = false;
        let p = provisioner(cfg);
        p.start("ghost", &StartOptions::default()).unwrap();
        // Stop the container behind the provisioner's back without removing it.
        p.runtime()
            .containers
            .borrow_mut()
            .iter_mut()
            .for_each(|c| c.3 = false);
        assert!(p.ps().unwrap().is_empty());
        assert!(matches!(
            p.start("ghost", &StartOptions::default()),
            Err(Error::NameConflict(_))
        ));
    }

    #[test]
    fn invalid_name_never_reaches_runtime() {
        let p = provisioner(Config::default());
        assert!(matches!(
            p.start("has space", &StartOptions::default()),
            Err(Error::InvalidName(_))
        ));
        assert!(p.runtime().log.borrow().is_empty());
    }

    #[test]
    fn run_failure_is_a_provision_error() {
        let runtime = FakeDocker {
            fail_run: Some("Unable to find image 'neo4j:4.2' locally".into()),
            ..FakeDocker::default()
        };
        let p = DockerProvisioner::with_runtime(Config::default(), runtime, "/work");
        let err = p.start("a", &StartOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Provision { .. }));
        assert!(err.to_string().contains("Unable to find image"));
        assert!(p.ps().unwrap().is_empty());
    }

    #[test]
    fn stop_unknown_is_not_found() {
        let p = provisioner(Config::default());
        assert!(matches!(p.stop("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn stop_removes_when_autoremove_is_off() {
        let mut cfg = Config::default();
        cfg.autoremove_containers = false;
        let p = provisioner(cfg);
        p.start("keep", &StartOptions::default()).unwrap();
        p.stop("keep").unwrap();

        let log = p.runtime().log.borrow();
        let subcommands: Vec<_> = log.iter().filter_map(|c| c.subcommand()).collect();
        assert_eq!(subcommands, ["ps", "run", "ps", "stop", "rm"]);
        assert!(p.runtime().containers.borrow().is_empty());
    }

    #[test]
    fn stop_skips_rm_with_autoremove() {
        let p = provisioner(Config::default());
        p.start("gone", &StartOptions::default()).unwrap();
        p.stop("gone").unwrap();
        let log = p.runtime().log.borrow();
        assert!(log.iter().all(|c| c.subcommand() != Some("rm")));
    }

    #[test]
    fn get_matches_ps_port() {
        let p = provisioner(Config::default());
        p.start("one", &StartOptions::default()).unwrap();
        p.start("two", &StartOptions::default()).unwrap();
        let handle = p.get("two").unwrap();
        assert_eq!(handle.port(), p.ps().unwrap()["two"]);
        assert_eq!(handle.uri(), "bolt://localhost:7688");
        assert!(matches!(p.get("three"), Err(Error::NotFound(_))));
    }

    #[test]
    fn freed_port_is_reused() {
        let p = provisioner(Config::default());
        for name in ["a", "b", "c"] {
            p.start(name, &StartOptions::default()).unwrap();
        }
        p.stop("b").unwrap();
        assert_eq!(p.start("d", &StartOptions::default()).unwrap(), 7688);
        let ports: Vec<u16> = p.ps().unwrap().into_values().collect();
        let mut unique = ports.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), ports.len());
    }

    #[test]
    fn unreachable_runtime_is_a_provision_error() {
        struct Missing;
        impl Runtime for Missing {
            fn execute(&self, _cmd: &DockerCommand) -> std::io::Result<CommandOutput> {
                Err(std::io::Error::from(std::io::ErrorKind::NotFound))
            }
        }
        let p = DockerProvisioner::with_runtime(Config::default(), Missing, "/work");
        assert!(matches!(p.ps(), Err(Error::Provision { .. })));
    }

    #[test]
    fn wait_returns_once_handshake_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut req = [0u8; 20];
            conn.read_exact(&mut req).unwrap();
            conn.write_all(&[0, 0, 2, 4]).unwrap();
        });

        let cfg = Config {
            base_port: port,
            host: "127.0.0.1".into(),
            wait_interval_ms: 10,
            ..Config::default()
        };
        let p = provisioner(cfg);
        assert_eq!(p.start("ready", &StartOptions::waiting()).unwrap(), port);
    }

    #[test]
    fn wait_gives_up_after_attempt_limit() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let cfg = Config {
            base_port: port,
            host: "127.0.0.1".into(),
            wait_interval_ms: 1,
            ..Config::default()
        };
        let p = provisioner(cfg);
        let opts = StartOptions {
            wait_attempt_limit: Some(2),
            ..StartOptions::waiting()
        };
        assert!(matches!(
            p.start("slow", &opts),
            Err(Error::NotReady { attempts: 2, .. })
        ));
    }

    #[test]
    fn wait_notices_exited_container() {
        let cfg = Config {
            wait_interval_ms: 1,
            ..Config::default()
        };
        let p = provisioner(cfg);
        p.start("crash", &StartOptions::default()).unwrap();
        p.runtime().containers.borrow_mut().clear();
        assert!(matches!(
            p.wait_until_ready("crash", 7687, 3),
            Err(Error::ContainerExited(_))
        ));
    }

    #[test]
    fn daemon_failure_while_waiting_is_a_provision_error() {
        /// Creates containers, then loses the daemon for everything else.
        struct DaemonGone;
        impl Runtime for DaemonGone {
            fn execute(&self, cmd: &DockerCommand) -> std::io::Result<CommandOutput> {
                Ok(match cmd.subcommand() {
                    Some("ps") => CommandOutput::ok(""),
                    Some("run") => CommandOutput::ok("c0ffee\n"),
                    _ => CommandOutput::failed(
                        1,
                        "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
                    ),
                })
            }
        }

        let cfg = Config {
            wait_interval_ms: 1,
            ..Config::default()
        };
        let p = DockerProvisioner::with_runtime(cfg, DaemonGone, "/work");
        let err = p.start("x", &StartOptions::waiting()).unwrap_err();
        assert!(matches!(err, Error::Provision { .. }), "{err:?}");
        assert!(err.to_string().contains("Cannot connect to the Docker daemon"));
    }

    #[test]
    fn zero_attempt_limit_skips_waiting() {
        let p = provisioner(Config::default());
        let opts = StartOptions {
            wait_attempt_limit: Some(0),
            ..StartOptions::waiting()
        };
        assert_eq!(p.start("quick", &opts).unwrap(), 7687);
        let log = p.runtime().log.borrow();
        assert!(log.iter().all(|c| c.subcommand() != Some("inspect")));
    }
}
