// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, warn};
use mbii_protocol::{game::GetServers, master::GetServersResponse, types::Str, PROTOCOL_VERSION};

use super::{DirectorySource, Error};
use crate::record::ServerRecord;
use crate::registry::MasterEndpoint;

pub const DEFAULT_MASTER_TIMEOUT: Duration = Duration::from_secs(2);

/// Asks a master server for the addresses of registered game servers.
///
/// Masters only know addresses, every other field is left unknown until a
/// status reply fills it.
#[derive(Clone, Debug)]
pub struct MasterSource {
    endpoint: MasterEndpoint,
    protocol: u32,
    timeout: Duration,
}

impl MasterSource {
    pub fn new(endpoint: MasterEndpoint) -> Self {
        Self {
            endpoint,
            protocol: PROTOCOL_VERSION,
            timeout: DEFAULT_MASTER_TIMEOUT,
        }
    }

    pub fn protocol(mut self, protocol: u32) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn query_servers(&self) -> Result<Vec<SocketAddrV4>, Error> {
        let address = &*self.endpoint.address;
        let target = address
            .to_socket_addrs()?
            .find(|i| i.is_ipv4())
            .ok_or_else(|| Error::Resolve(address.into()))?;

        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        sock.connect(target)?;

        let mut buf = [0; 2048];
        let n = GetServers::new(self.protocol).encode(&mut buf)?;
        sock.send(&buf[..n])?;

        let mut seen = HashSet::new();
        let mut servers = Vec::new();
        let start = Instant::now();
        while let Some(timeout) = self
            .timeout
            .checked_sub(start.elapsed())
            .filter(|i| !i.is_zero())
        {
            sock.set_read_timeout(Some(timeout))?;
            let n = match sock.recv(&mut buf) {
                Ok(n) => n,
                Err(e) => match e.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => break,
                    _ => return Err(e.into()),
                },
            };
            match GetServersResponse::decode(&buf[..n]) {
                Ok(packet) => {
                    servers.extend(packet.iter().filter(|i| seen.insert(*i)));
                    if packet.is_end() {
                        break;
                    }
                }
                Err(e) => debug!("{}: unexpected packet \"{}\": {}", address, Str(&buf[..n]), e),
            }
        }

        if servers.is_empty() {
            warn!("master {} returned no servers", self.endpoint);
        }
        Ok(servers)
    }
}

impl fmt::Display for MasterSource {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "master {}", self.endpoint)
    }
}

impl DirectorySource for MasterSource {
    fn fetch(&self) -> Result<Vec<ServerRecord>, Error> {
        let records = self
            .query_servers()?
            .into_iter()
            .map(|addr| {
                let addr = addr.to_string();
                ServerRecord::new(addr.clone(), addr)
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    fn fake_master(packets: Vec<GetServersResponse>) -> String {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = sock.local_addr().unwrap().to_string();
        thread::spawn(move || {
            let mut buf = [0; 512];
            let (n, from) = sock.recv_from(&mut buf).unwrap();
            assert_eq!(GetServers::decode(&buf[..n]), Ok(GetServers::new(26)));
            for p in packets {
                let n = p.encode(&mut buf).unwrap();
                sock.send_to(&buf[..n], from).unwrap();
            }
        });
        addr
    }

    fn addr(last: u8, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, last), port)
    }

    #[test]
    fn split_list() {
        let master = fake_master(vec![
            GetServersResponse::new(vec![addr(1, 29070), addr(2, 29071)], false),
            GetServersResponse::new(vec![addr(2, 29071), addr(3, 29070)], true),
        ]);
        let source = MasterSource::new(MasterEndpoint::new("test", &master));
        let records = source.fetch().unwrap();
        let addrs: Vec<_> = records.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addrs, ["192.0.2.1:29070", "192.0.2.2:29071", "192.0.2.3:29070"]);
        assert_eq!(records[0].hostname, records[0].address);
        assert_eq!(records[0].mod_identifier, "N/A");
    }

    #[test]
    fn missing_end_marker_waits_for_timeout() {
        let master = fake_master(vec![GetServersResponse::new(vec![addr(9, 29070)], false)]);
        let source = MasterSource::new(MasterEndpoint::new("test", &master))
            .timeout(Duration::from_millis(200));
        let start = Instant::now();
        let records = source.fetch().unwrap();
        assert_eq!(records.len(), 1);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn unresolvable_master() {
        let source = MasterSource::new(MasterEndpoint::new("test", "mbii-master.invalid:29070"));
        assert!(source.fetch().is_err());
    }
}
