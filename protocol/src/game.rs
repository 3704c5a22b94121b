// SPDX-License-Identifier: LGPL-3.0-only

//! Game client packets.

use crate::cursor::{Cursor, CursorMut};
use crate::{Error, PROTOCOL_VERSION};

/// Request a status from a game server.
///
/// Any reply proves that the server is alive, so the packet doubles as a ping.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GetStatus;

impl GetStatus {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xffgetstatus\n";

    /// Decode packet from `src`.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;
        cur.expect_end()?;
        Ok(Self)
    }

    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        Ok(CursorMut::new(buf).put(Self::HEADER)?.pos())
    }
}

/// Request a list of server addresses from a master server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetServers {
    /// Select only servers with the network `protocol`.
    pub protocol: u32,
    /// Include full servers.
    pub full: bool,
    /// Include empty servers.
    pub empty: bool,
}

impl Default for GetServers {
    fn default() -> Self {
        Self::new(PROTOCOL_VERSION)
    }
}

impl GetServers {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xffgetservers ";

    /// Creates a new `GetServers` asking for all servers with `protocol`.
    pub fn new(protocol: u32) -> Self {
        Self {
            protocol,
            full: true,
            empty: true,
        }
    }

    /// Decode packet from `src`.
    pub fn decode(src: &[u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;
        let s = std::str::from_utf8(cur.rest()).map_err(|_| Error::InvalidPacket)?;
        let mut words = s.split_ascii_whitespace();
        let protocol = words
            .next()
            .and_then(|i| i.parse().ok())
            .ok_or(Error::InvalidPacket)?;
        let mut ret = Self {
            protocol,
            full: false,
            empty: false,
        };
        for i in words {
            match i {
                "full" => ret.full = true,
                "empty" => ret.empty = true,
                _ => return Err(Error::InvalidPacket),
            }
        }
        Ok(ret)
    }

    /// Encode packet to `buf`.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cur = CursorMut::new(buf);
        cur.put(Self::HEADER)?.put_display(self.protocol)?;
        if self.full {
            cur.put(b" full")?;
        }
        if self.empty {
            cur.put(b" empty")?;
        }
        Ok(cur.pos())
    }
}
