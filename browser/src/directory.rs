// SPDX-License-Identifier: GPL-3.0-only

//! Sources of candidate servers.

mod listing;
mod master;

use std::fmt;
use std::io;

use mbii_protocol::Error as ProtocolError;
use thiserror::Error;

use crate::record::ServerRecord;

pub use self::listing::{parse_listing, ListingSource, DEFAULT_LISTING_TIMEOUT, DEFAULT_LISTING_URL};
pub use self::master::{MasterSource, DEFAULT_MASTER_TIMEOUT};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Server table not found")]
    NoTable,
    #[error("Failed to resolve master \"{0}\"")]
    Resolve(Box<str>),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Produces raw server records without ping results.
pub trait DirectorySource: fmt::Display + Send + Sync {
    fn fetch(&self) -> Result<Vec<ServerRecord>, Error>;
}

/// A fixed list of servers.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
    records: Vec<ServerRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<ServerRecord>) -> Self {
        Self { records }
    }

    /// Records named after their addresses.
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let records = addresses
            .into_iter()
            .map(|i| ServerRecord::new(i.as_ref(), i.as_ref()))
            .collect();
        Self::new(records)
    }
}

impl fmt::Display for StaticSource {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "static list of {} servers", self.records.len())
    }
}

impl DirectorySource for StaticSource {
    fn fetch(&self) -> Result<Vec<ServerRecord>, Error> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_source() {
        let source = StaticSource::from_addresses(["10.0.0.1:29070", "bad"]);
        let records = source.fetch().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].hostname, "bad");
        assert_eq!(source.to_string(), "static list of 2 servers");
    }
}
