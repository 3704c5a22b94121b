// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;
use std::str::FromStr;

use mbii_protocol::color;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Placeholder for metadata that a directory did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

/// Outcome of probing one server during a refresh cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PingStatus {
    /// Not probed yet.
    #[default]
    Pending,
    /// Round-trip time in milliseconds.
    Latency(u32),
    /// No reply within the probe timeout.
    Timeout,
    /// Socket or resolver failure.
    Error,
    /// The address could not be split into a host and a port number.
    ParseError,
    /// The host or the port is missing.
    InvalidAddress,
}

impl PingStatus {
    /// Returns `false` only for [`PingStatus::Pending`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn latency(&self) -> Option<u32> {
        match *self {
            Self::Latency(ms) => Some(ms),
            _ => None,
        }
    }
}

impl fmt::Display for PingStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Pending => fmt.write_str("Pending"),
            Self::Latency(ms) => write!(fmt, "{}", ms),
            Self::Timeout => fmt.write_str("Timeout"),
            Self::Error => fmt.write_str("Error"),
            Self::ParseError => fmt.write_str("Parse Error"),
            Self::InvalidAddress => fmt.write_str("Invalid Addr"),
        }
    }
}

impl Serialize for PingStatus {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_str(self)
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddrError {
    #[error("Failed to parse address")]
    Parse,
    #[error("Address has no host or port")]
    Invalid,
}

impl From<AddrError> for PingStatus {
    fn from(err: AddrError) -> Self {
        match err {
            AddrError::Parse => Self::ParseError,
            AddrError::Invalid => Self::InvalidAddress,
        }
    }
}

/// A `host:port` pair split from a listing address.
///
/// The host is kept as text and resolved only when a probe is sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for ServerAddr {
    type Err = AddrError;

    /// Splits on the last colon, so `[::1]:29070` keeps its IPv6 host.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s.trim().rsplit_once(':').ok_or(AddrError::Parse)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() || port.is_empty() {
            return Err(AddrError::Invalid);
        }
        match port.parse::<u16>() {
            Ok(0) => Err(AddrError::Invalid),
            Ok(port) => Ok(Self::new(host, port)),
            Err(_) => Err(AddrError::Parse),
        }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.host.contains(':') {
            write!(fmt, "[{}]:{}", self.host, self.port)
        } else {
            write!(fmt, "{}:{}", self.host, self.port)
        }
    }
}

/// One discovered server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerRecord {
    /// Display name, may contain colour codes.
    #[serde(serialize_with = "serialize_colored")]
    pub hostname: String,
    /// `ip:port` as listed by the directory.
    pub address: String,
    #[serde(rename = "map")]
    pub map_name: String,
    #[serde(rename = "players")]
    pub player_count: String,
    #[serde(rename = "mod")]
    pub mod_identifier: String,
    pub game_type: String,
    /// Best-effort guess, never authoritative.
    pub password_protected: bool,
    #[serde(rename = "ping")]
    pub ping_status: PingStatus,
}

impl ServerRecord {
    /// Creates a record with unknown metadata.
    pub fn new(hostname: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            address: address.into(),
            map_name: NOT_AVAILABLE.to_owned(),
            player_count: NOT_AVAILABLE.to_owned(),
            mod_identifier: NOT_AVAILABLE.to_owned(),
            game_type: NOT_AVAILABLE.to_owned(),
            password_protected: false,
            ping_status: PingStatus::Pending,
        }
    }

    pub fn parse_addr(&self) -> Result<ServerAddr, AddrError> {
        self.address.parse()
    }

    /// Hostname without colour codes.
    pub fn plain_hostname(&self) -> std::borrow::Cow<'_, str> {
        color::trim_color(&self.hostname)
    }
}

/// Returns `true` if a metadata field holds no real value.
pub fn is_blank(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case(NOT_AVAILABLE)
}

fn serialize_colored<S>(s: &str, ser: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    ser.serialize_str(color::trim_color(s).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_addr() {
        assert_eq!(
            "127.0.0.1:29070".parse(),
            Ok(ServerAddr::new("127.0.0.1", 29070))
        );
        assert_eq!(
            " mb2.example.org:29071 ".parse(),
            Ok(ServerAddr::new("mb2.example.org", 29071))
        );
        assert_eq!("[::1]:29070".parse(), Ok(ServerAddr::new("::1", 29070)));
    }

    #[test]
    fn parse_addr_failures() {
        assert_eq!("not-an-address".parse::<ServerAddr>(), Err(AddrError::Parse));
        assert_eq!("1.2.3.4:port".parse::<ServerAddr>(), Err(AddrError::Parse));
        assert_eq!("1.2.3.4:70000".parse::<ServerAddr>(), Err(AddrError::Parse));
        assert_eq!("1.2.3.4:0".parse::<ServerAddr>(), Err(AddrError::Invalid));
        assert_eq!("[::1]:0".parse::<ServerAddr>(), Err(AddrError::Invalid));
        assert_eq!(":29070".parse::<ServerAddr>(), Err(AddrError::Invalid));
        assert_eq!("1.2.3.4:".parse::<ServerAddr>(), Err(AddrError::Invalid));
    }

    #[test]
    fn addr_display() {
        assert_eq!(ServerAddr::new("::1", 29070).to_string(), "[::1]:29070");
        assert_eq!(ServerAddr::new("10.0.0.1", 1).to_string(), "10.0.0.1:1");
    }

    #[test]
    fn ping_status_display() {
        assert_eq!(PingStatus::Latency(45).to_string(), "45");
        assert_eq!(PingStatus::ParseError.to_string(), "Parse Error");
        assert_eq!(PingStatus::InvalidAddress.to_string(), "Invalid Addr");
        assert!(!PingStatus::Pending.is_terminal());
        assert!(PingStatus::Timeout.is_terminal());
        assert_eq!(PingStatus::from(AddrError::Invalid), PingStatus::InvalidAddress);
    }

    #[test]
    fn record_json() {
        let mut r = ServerRecord::new("^1MB^7II ^3EU", "10.0.0.1:29070");
        r.ping_status = PingStatus::Latency(20);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["hostname"], "MBII EU");
        assert_eq!(v["ping"], "20");
        assert_eq!(v["map"], "N/A");
        assert_eq!(v["password_protected"], false);
    }

    #[test]
    fn blank_fields() {
        assert!(is_blank(""));
        assert!(is_blank(" n/a "));
        assert!(!is_blank("mb2_dotf"));
    }
}
