// SPDX-License-Identifier: GPL-3.0-only

//! Known master servers.

use std::fmt;

use mbii_protocol::DEFAULT_PORT;
use serde::Serialize;

/// Label of the user supplied master entry.
pub const CUSTOM: &str = "Custom";

/// A named master server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MasterEndpoint {
    pub name: Box<str>,
    /// `host:port`
    pub address: Box<str>,
}

impl MasterEndpoint {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Creates the custom entry, appending the default port if missing.
    pub fn custom(address: &str) -> Option<Self> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }
        let has_port = match address.rsplit_once(':') {
            // a bare IPv6 address has colons but no port
            Some((host, _)) => !host.contains(':') || host.ends_with(']'),
            None => false,
        };
        let address = if has_port {
            address.to_owned()
        } else if address.contains(':') {
            let host = address.trim_start_matches('[').trim_end_matches(']');
            format!("[{}]:{}", host, DEFAULT_PORT)
        } else {
            format!("{}:{}", address, DEFAULT_PORT)
        };
        Some(Self::new(CUSTOM, &address))
    }
}

impl fmt::Display for MasterEndpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} ({})", self.name, self.address)
    }
}

const BUILTIN: &[(&str, &str)] = &[
    ("JKHubServers (AppSpot)", "jkhubservers.appspot.com:29070"),
    ("MBII (master.moviebattles.org)", "master.moviebattles.org:29070"),
    ("MBII (master2.moviebattles.org)", "master2.moviebattles.org:29070"),
    ("JKHub (master.jkhub.org)", "master.jkhub.org:29070"),
    (
        "Raven Software (masterjk3.ravensoft.com)",
        "masterjk3.ravensoft.com:29070",
    ),
];

/// Fixed list of master servers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterRegistry {
    entries: Vec<MasterEndpoint>,
}

impl Default for MasterRegistry {
    fn default() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(name, address)| MasterEndpoint::new(name, address))
                .collect(),
        }
    }
}

impl MasterRegistry {
    pub fn entries(&self) -> &[MasterEndpoint] {
        &self.entries
    }

    /// Finds a master by name.
    ///
    /// Anything that is not a known name is taken as a custom `host[:port]`.
    pub fn resolve(&self, name: &str) -> Option<MasterEndpoint> {
        let name = name.trim();
        self.entries
            .iter()
            .find(|i| &*i.name == name)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|i| i.name.eq_ignore_ascii_case(name))
            })
            .cloned()
            .or_else(|| MasterEndpoint::custom(name))
    }
}
