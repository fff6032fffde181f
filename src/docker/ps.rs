use super::types::ContainerSummary;

/// Go template handed to `docker ps --format`: name and ports, tab separated.
pub const PS_FORMAT: &str = "{{.Names}}\t{{.Ports}}";

/// Parse `docker ps --format` output (see [`PS_FORMAT`]) into the rows whose
/// name starts with `prefix`.
///
/// `container_port` selects which published mapping is reported as the
/// instance's port; other mappings (browser ports, unpublished ports) are ignored.
///
/// ```text
/// tamarind_MyDatabase	0.0.0.0:7687->7687/tcp, :::7687->7687/tcp, 7473-7474/tcp
/// unrelated	0.0.0.0:8080->80/tcp
/// ```
pub fn parse_ps_output(raw: &str, prefix: &str, container_port: u16) -> Vec<ContainerSummary> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let (name, ports) = line.split_once('\t').unwrap_or((line, ""));
            let name = name.trim();
            if !name.starts_with(prefix) {
                return None;
            }
            Some(ContainerSummary {
                name: name.to_string(),
                bolt_port: host_port_for(ports, container_port),
            })
        })
        .collect()
}

/// Find the host port published for `container_port/tcp` in a `docker ps`
/// ports column. IPv4 and IPv6 bindings normally agree; the first one wins.
pub fn host_port_for(ports: &str, container_port: u16) -> Option<u16> {
    let wanted = format!("{container_port}/tcp");
    ports
        .split(',')
        .map(str::trim)
        .filter_map(|entry| entry.split_once("->"))
        .filter(|(_, target)| *target == wanted)
        .find_map(|(host, _)| {
            // `0.0.0.0:7688`, `:::7688`, `[::]:7688`
            let (_, port) = host.rsplit_once(':')?;
            port.parse().ok()
        })
}
