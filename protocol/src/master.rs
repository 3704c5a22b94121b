// SPDX-License-Identifier: LGPL-3.0-only

//! Master server packets.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::cursor::{Cursor, CursorMut};
use crate::Error;

/// Game server addresses list.
///
/// A master may split a long list over several datagrams, only the last one
/// carries the end marker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetServersResponse {
    addrs: Vec<SocketAddrV4>,
    end: bool,
}

impl GetServersResponse {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xffgetserversResponse";

    /// End of transmission marker.
    pub const EOT: &'static [u8] = b"EOT";

    /// Creates a new `GetServersResponse`.
    pub fn new(addrs: Vec<SocketAddrV4>, end: bool) -> Self {
        Self { addrs, end }
    }

    /// Decode packet from `src`.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;

        let mut ret = Self::default();
        while !cur.is_empty() {
            cur.expect(b"\\")?;
            if cur.rest().starts_with(Self::EOT) {
                ret.end = true;
                break;
            }
            let ip = Ipv4Addr::from(cur.take_array::<4>()?);
            let port = cur.take_u16_be()?;
            // masters pad the list with zero entries
            if !ip.is_unspecified() && port != 0 {
                ret.addrs.push(SocketAddrV4::new(ip, port));
            }
        }
        Ok(ret)
    }

    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put(Self::HEADER)?;
        for addr in &self.addrs {
            cur.put(b"\\")?
                .put(&addr.ip().octets())?
                .put(&addr.port().to_be_bytes())?;
        }
        if self.end {
            cur.put(b"\\")?.put(Self::EOT)?.put(&[0; 3])?;
        }
        Ok(cur.pos())
    }

    /// Iterator over game server addresses.
    pub fn iter(&self) -> impl Iterator<Item = SocketAddrV4> + '_ {
        self.addrs.iter().copied()
    }

    /// Returns `true` if game server addresses list is empty.
    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Returns `true` if this is the last packet of the list.
    pub fn is_end(&self) -> bool {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_servers_response() {
        let src = b"\xff\xff\xff\xffgetserversResponse\
            \\\x7f\x00\x00\x01\x71\x8e\
            \\\x0a\x5c\x00\x02\x71\x8f\
            \\EOT\x00\x00\x00";
        let p = GetServersResponse::decode(src).unwrap();
        assert!(p.is_end());
        let addrs: Vec<_> = p.iter().collect();
        assert_eq!(
            addrs,
            [
                SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 29070),
                // 0x5c is a backslash inside the address
                SocketAddrV4::new(Ipv4Addr::new(10, 92, 0, 2), 29071),
            ]
        );

        let mut buf = [0; 128];
        let n = p.encode(&mut buf).unwrap();
        assert_eq!(&buf[..n], &src[..]);
    }

    #[test]
    fn get_servers_response_partial() {
        let p = GetServersResponse::new(
            vec![SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 5), 29070)],
            false,
        );
        let mut buf = [0; 128];
        let n = p.encode(&mut buf).unwrap();
        let r = GetServersResponse::decode(&buf[..n]).unwrap();
        assert!(!r.is_end());
        assert_eq!(r, p);
    }

    #[test]
    fn get_servers_response_zero_padding() {
        let src = b"\xff\xff\xff\xffgetserversResponse\\\x00\x00\x00\x00\x00\x00\\EOT";
        let p = GetServersResponse::decode(src).unwrap();
        assert!(p.is_empty());
        assert!(p.is_end());
    }

    #[test]
    fn get_servers_response_truncated() {
        let src = b"\xff\xff\xff\xffgetserversResponse\\\x7f\x00\x00";
        assert!(GetServersResponse::decode(src).is_err());
        assert!(GetServersResponse::decode(b"\xff\xff\xff\xffstatusResponse\n").is_err());
    }
}
