// SPDX-License-Identifier: GPL-3.0-only

//! Refresh cycle and read access for front ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use log::{debug, info, warn};
use thiserror::Error;

use crate::catalog::{Catalog, Column};
use crate::config::{Config, SourceKind};
use crate::directory::{self, DirectorySource, ListingSource, MasterSource};
use crate::record::ServerRecord;
use crate::registry::MasterRegistry;
use crate::scheduler::ProbeScheduler;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown master \"{0}\"")]
    UnknownMaster(String),
    #[error("Failed to fetch servers from {origin}: {source}")]
    Directory {
        origin: String,
        source: directory::Error,
    },
}

/// Outcome of a refresh.
#[derive(Clone, Debug)]
pub enum RefreshStatus {
    Loaded { servers: usize, alive: usize },
    /// The directory returned no usable servers.
    Empty,
    /// The directory failed, the catalog was cleared.
    Failed(Arc<Error>),
    /// Another refresh was still running.
    Busy,
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Loaded { servers, alive } => {
                write!(fmt, "{} servers, {} responding", servers, alive)
            }
            Self::Empty => fmt.write_str("No servers found"),
            Self::Failed(e) => write!(fmt, "No servers found ({})", e),
            Self::Busy => fmt.write_str("Refresh already in progress"),
        }
    }
}

struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the directory, the scheduler and the catalog for the lifetime of a
/// browsing session.
pub struct Session {
    directory: Box<dyn DirectorySource>,
    scheduler: ProbeScheduler,
    catalog: Catalog,
    refreshing: AtomicBool,
    last_status: Mutex<Option<RefreshStatus>>,
}

impl Session {
    pub fn new(directory: Box<dyn DirectorySource>, scheduler: ProbeScheduler, catalog: Catalog) -> Self {
        Self {
            directory,
            scheduler,
            catalog,
            refreshing: AtomicBool::new(false),
            last_status: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let cfg = &config.directory;
        let directory: Box<dyn DirectorySource> = match cfg.source {
            SourceKind::Listing => Box::new(ListingSource::new(&cfg.url, cfg.timeout())),
            SourceKind::Master => {
                let endpoint = MasterRegistry::default()
                    .resolve(&cfg.master)
                    .ok_or_else(|| Error::UnknownMaster(cfg.master.clone()))?;
                let source = MasterSource::new(endpoint)
                    .protocol(cfg.protocol)
                    .timeout(cfg.master_timeout());
                Box::new(source)
            }
        };
        let scheduler = ProbeScheduler::new(config.probe.timeout(), config.probe.concurrency);
        Ok(Self::new(directory, scheduler, Catalog::new(config.mod_table())))
    }

    pub fn directory(&self) -> &dyn DirectorySource {
        &*self.directory
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fetches the directory, probes every server and replaces the catalog.
    ///
    /// Blocks until all probes are resolved. Readers keep seeing the previous
    /// catalog until the new one is complete.
    pub fn refresh(&self) -> RefreshStatus {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            debug!("refresh ignored, another one is running");
            return RefreshStatus::Busy;
        };

        let start = Instant::now();
        info!("fetching servers from {}", self.directory);
        let status = match self.directory.fetch() {
            Ok(records) => self.load(records),
            Err(source) => {
                let e = Error::Directory {
                    origin: self.directory.to_string(),
                    source,
                };
                warn!("{}", e);
                self.catalog.replace(Vec::new());
                RefreshStatus::Failed(Arc::new(e))
            }
        };
        info!("{} in {:.3}s", status, start.elapsed().as_secs_f32());

        *self.last_status.lock().unwrap_or_else(PoisonError::into_inner) = Some(status.clone());
        status
    }

    fn load(&self, mut records: Vec<ServerRecord>) -> RefreshStatus {
        let total = records.len();
        records.retain(|r| !r.address.trim().is_empty());
        if records.len() != total {
            debug!("dropped {} servers without address", total - records.len());
        }
        if records.is_empty() {
            self.catalog.replace(records);
            return RefreshStatus::Empty;
        }

        let records = self.scheduler.probe_all(records);
        let servers = records.len();
        let alive = records
            .iter()
            .filter(|r| r.ping_status.latency().is_some())
            .count();
        self.catalog.replace(records);
        RefreshStatus::Loaded { servers, alive }
    }

    /// Filtered and sorted copy of the current catalog.
    pub fn get_view(&self, filter: &str, column: Column, descending: bool) -> Vec<ServerRecord> {
        self.catalog.view(filter, column, descending)
    }

    pub fn select(&self, address: &str) -> Option<ServerRecord> {
        self.catalog.select(address)
    }

    /// Incremented by every completed refresh.
    pub fn generation(&self) -> u64 {
        self.catalog.generation()
    }

    pub fn last_status(&self) -> Option<RefreshStatus> {
        self.last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use crate::directory::StaticSource;
    use crate::record::{PingStatus, ServerRecord};

    fn session(source: impl DirectorySource + 'static) -> Session {
        let scheduler = ProbeScheduler::new(Duration::from_millis(50), 4);
        Session::new(Box::new(source), scheduler, Catalog::default())
    }

    struct FailingSource;

    impl fmt::Display for FailingSource {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            fmt.write_str("failing")
        }
    }

    impl DirectorySource for FailingSource {
        fn fetch(&self) -> Result<Vec<ServerRecord>, directory::Error> {
            Err(directory::Error::NoTable)
        }
    }

    struct BlockingSource {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl fmt::Display for BlockingSource {
        fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
            fmt.write_str("blocking")
        }
    }

    impl DirectorySource for BlockingSource {
        fn fetch(&self) -> Result<Vec<ServerRecord>, directory::Error> {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            Ok(Vec::new())
        }
    }

    #[test]
    fn unparsable_addresses_without_network() {
        let session = session(StaticSource::from_addresses(["bad", "host:0", ""]));
        assert!(session.last_status().is_none());
        assert_eq!(session.generation(), 0);

        let status = session.refresh();
        assert!(matches!(status, RefreshStatus::Loaded { servers: 2, alive: 0 }));
        assert_eq!(session.generation(), 1);

        let view = session.get_view("All", Column::Address, false);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].address, "bad");
        assert_eq!(view[0].ping_status, PingStatus::ParseError);
        assert_eq!(view[1].ping_status, PingStatus::InvalidAddress);
        assert!(session.select("host:0").is_some());
        assert!(session.select("").is_none());
    }

    #[test]
    fn empty_directory() {
        let session = session(StaticSource::from_addresses(["", " "]));
        assert!(matches!(session.refresh(), RefreshStatus::Empty));
        assert!(session.catalog().is_empty());
        assert!(matches!(session.last_status(), Some(RefreshStatus::Empty)));
    }

    #[test]
    fn failed_directory_clears_catalog() {
        let session = session(FailingSource);
        session.catalog().replace(vec![ServerRecord::new("old", "bad")]);
        let status = session.refresh();
        assert!(matches!(status, RefreshStatus::Failed(_)));
        assert_eq!(status.to_string(), "No servers found (Failed to fetch servers from failing: Server table not found)");
        assert!(session.catalog().is_empty());
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn overlapping_refresh_is_busy() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let session = session(BlockingSource {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });

        thread::scope(|s| {
            let first = s.spawn(|| session.refresh());
            entered_rx.recv().unwrap();
            assert!(matches!(session.refresh(), RefreshStatus::Busy));
            release_tx.send(()).unwrap();
            assert!(matches!(first.join().unwrap(), RefreshStatus::Empty));
        });

        // the guard is released afterwards
        release_tx.send(()).unwrap();
        assert!(matches!(session.refresh(), RefreshStatus::Empty));
        assert!(matches!(session.last_status(), Some(RefreshStatus::Empty)));
    }
}
