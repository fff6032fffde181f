use std::fmt;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Bolt preamble sent before the version proposals.
const MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Versions offered to the server, most preferred first.
/// Each is encoded big-endian as `[0, 0, minor, major]`.
const PROPOSALS: [BoltVersion; 4] = [
    BoltVersion { major: 4, minor: 4 },
    BoltVersion { major: 4, minor: 2 },
    BoltVersion { major: 4, minor: 1 },
    BoltVersion { major: 3, minor: 0 },
];

/// Protocol version agreed during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoltVersion {
    pub major: u8,
    pub minor: u8,
}

impl BoltVersion {
    fn encode(self) -> [u8; 4] {
        [0, 0, self.minor, self.major]
    }

    fn decode(raw: [u8; 4]) -> Option<Self> {
        let version = Self {
            major: raw[3],
            minor: raw[2],
        };
        (version.major != 0).then_some(version)
    }
}

impl fmt::Display for BoltVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The 20 bytes a client sends to open a Bolt connection.
pub fn handshake_request() -> [u8; 20] {
    let mut buf = [0u8; 20];
    buf[..4].copy_from_slice(&MAGIC);
    for (i, version) in PROPOSALS.iter().enumerate() {
        let start = 4 + i * 4;
        buf[start..start + 4].copy_from_slice(&version.encode());
    }
    buf
}

/// Connect to `host:port` and negotiate a protocol version.
///
/// Every resolved address is tried in turn, each bounded by `timeout`.
pub fn handshake(host: &str, port: u16, timeout: Duration) -> io::Result<BoltVersion> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
    let mut last_err = io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("{host} did not resolve to any address"),
    );
    for addr in addrs {
        match handshake_addr(addr, timeout) {
            Ok(version) => return Ok(version),
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

fn handshake_addr(addr: SocketAddr, timeout: Duration) -> io::Result<BoltVersion> {
    let mut stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stream.write_all(&handshake_request())?;

    let mut answer = [0u8; 4];
    stream.read_exact(&mut answer)?;
    BoltVersion::decode(answer).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "server rejected every proposed Bolt version",
        )
    })
}
