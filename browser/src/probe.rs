// SPDX-License-Identifier: GPL-3.0-only

//! Single-server liveness and latency query.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::trace;
use mbii_protocol::{game::GetStatus, server, server::StatusResponse, Error as ProtocolError};
use thiserror::Error;

use crate::record::{is_blank, PingStatus, ServerAddr, ServerRecord};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300);

/// A zero read timeout is rejected by the OS.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

const MAX_PACKET_SIZE: usize = 16384;

#[derive(Error, Debug)]
enum Error {
    #[error("Failed to resolve host")]
    Resolve,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Server details decoded from a status reply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusInfo {
    pub hostname: Option<String>,
    pub map: Option<String>,
    pub gamename: Option<String>,
    pub game_type: Option<String>,
    pub players: usize,
    pub max_clients: Option<u32>,
    pub need_password: bool,
}

impl StatusInfo {
    fn from(p: &StatusResponse) -> Self {
        let game_type = p.gametype().map(|i| match server::gametype_name(i) {
            Some(name) => name.to_owned(),
            None => i.to_string(),
        });
        Self {
            hostname: p.hostname().map(str::to_owned),
            map: p.map().map(str::to_owned),
            gamename: p.gamename().map(str::to_owned),
            game_type,
            players: p.players().len(),
            max_clients: p.max_clients(),
            need_password: p.need_password(),
        }
    }

    /// Fills record fields that the directory left empty.
    ///
    /// The password flag is only ever raised, never cleared.
    pub fn fill(&self, record: &mut ServerRecord) {
        fn set(field: &mut String, value: Option<&String>) {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                if is_blank(field) {
                    field.clone_from(value);
                }
            }
        }

        if is_blank(&record.hostname) || record.hostname == record.address {
            if let Some(hostname) = self.hostname.as_ref().filter(|v| !v.is_empty()) {
                record.hostname.clone_from(hostname);
            }
        }
        set(&mut record.map_name, self.map.as_ref());
        set(&mut record.mod_identifier, self.gamename.as_ref());
        set(&mut record.game_type, self.game_type.as_ref());
        if is_blank(&record.player_count) {
            record.player_count = match self.max_clients {
                Some(max) => format!("{}/{}", self.players, max),
                None => self.players.to_string(),
            };
        }
        record.password_protected |= self.need_password;
    }
}

/// Result of one probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub ping: PingStatus,
    /// Present if the reply was a well-formed status response.
    pub status: Option<StatusInfo>,
}

impl Reply {
    pub fn new(ping: PingStatus) -> Self {
        Self { ping, status: None }
    }
}

/// Sends a liveness query to one server.
///
/// Implementations block for at most `timeout` and report failures as a
/// [`PingStatus`] instead of returning an error.
pub trait Prober: Sync {
    fn probe(&self, addr: &ServerAddr, timeout: Duration) -> Reply;
}

/// Queries servers with the `getstatus` packet over UDP.
#[derive(Copy, Clone, Debug, Default)]
pub struct QueryClient;

/// Runs `lookup` on a helper thread and waits for it at most `timeout`.
///
/// Returns `None` when the deadline passes first. A stalled lookup keeps its
/// thread until the resolver gives up, the result is dropped.
fn resolve_within<F>(timeout: Duration, lookup: F) -> Result<Option<SocketAddr>, Error>
where
    F: FnOnce() -> io::Result<Option<SocketAddr>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(lookup());
    });
    match rx.recv_timeout(timeout) {
        Ok(res) => res?.map(Some).ok_or(Error::Resolve),
        Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Resolve),
    }
}

/// Host names are resolved within the probe timeout.
fn resolve(addr: &ServerAddr, timeout: Duration) -> Result<Option<SocketAddr>, Error> {
    if let Ok(ip) = addr.host.parse::<IpAddr>() {
        return Ok(Some(SocketAddr::new(ip, addr.port)));
    }
    let target = (addr.host.clone(), addr.port);
    resolve_within(timeout, move || Ok(target.to_socket_addrs()?.next()))
}

impl QueryClient {
    fn query(&self, addr: &ServerAddr, timeout: Duration) -> Result<Reply, Error> {
        let started = Instant::now();
        let Some(target) = resolve(addr, timeout)? else {
            trace!("{}: host lookup timed out", addr);
            return Ok(Reply::new(PingStatus::Timeout));
        };
        let timeout = timeout.saturating_sub(started.elapsed());
        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let sock = UdpSocket::bind(local)?;
        sock.connect(target)?;
        sock.set_read_timeout(Some(timeout.max(MIN_TIMEOUT)))?;

        let mut buf = [0; MAX_PACKET_SIZE];
        let n = GetStatus.encode(&mut buf)?;
        let start = Instant::now();
        sock.send(&buf[..n])?;

        let n = match sock.recv(&mut buf) {
            Ok(n) => n,
            Err(e) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                    return Ok(Reply::new(PingStatus::Timeout));
                }
                _ => return Err(e.into()),
            },
        };
        let ping = (start.elapsed().as_secs_f64() * 1000.0).round() as u32;

        let status = match StatusResponse::decode(&buf[..n]) {
            Ok(p) => Some(StatusInfo::from(&p)),
            Err(e) => {
                trace!("{}: unexpected reply: {}", addr, e);
                None
            }
        };

        Ok(Reply {
            ping: PingStatus::Latency(ping),
            status,
        })
    }
}

impl Prober for QueryClient {
    fn probe(&self, addr: &ServerAddr, timeout: Duration) -> Reply {
        let reply = self.query(addr, timeout).unwrap_or_else(|e| {
            trace!("{}: {}", addr, e);
            Reply::new(PingStatus::Error)
        });
        trace!("{}: {}", addr, reply.ping);
        reply
    }
}

/// Measures the round-trip time to `host:port`.
pub fn probe(host: &str, port: u16, timeout: Duration) -> PingStatus {
    QueryClient.probe(&ServerAddr::new(host, port), timeout).ping
}
