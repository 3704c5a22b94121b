// SPDX-License-Identifier: GPL-3.0-only

//! Concurrent probing of a batch of servers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::probe::{Prober, QueryClient, Reply, DEFAULT_TIMEOUT};
use crate::record::{PingStatus, ServerRecord};

pub const DEFAULT_CONCURRENCY: usize = 20;

/// Probes many servers with a bounded number of queries in flight.
pub struct ProbeScheduler<P = QueryClient> {
    prober: P,
    timeout: Duration,
    max_concurrency: usize,
}

impl Default for ProbeScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_CONCURRENCY)
    }
}

impl ProbeScheduler {
    pub fn new(timeout: Duration, max_concurrency: usize) -> Self {
        Self::with_prober(QueryClient, timeout, max_concurrency)
    }
}

impl<P: Prober> ProbeScheduler<P> {
    pub fn with_prober(prober: P, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            prober,
            timeout,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Probes every record and stores the outcome in its `ping_status`.
    ///
    /// Records with a malformed address are marked without touching the
    /// network. Returns after every dispatched probe has resolved, so no record
    /// is left `Pending`. Records keep their input order.
    pub fn probe_all(&self, mut records: Vec<ServerRecord>) -> Vec<ServerRecord> {
        let start = Instant::now();
        let mut jobs = Vec::with_capacity(records.len());
        for (index, record) in records.iter_mut().enumerate() {
            match record.parse_addr() {
                Ok(addr) => {
                    record.ping_status = PingStatus::Pending;
                    jobs.push((index, addr));
                }
                Err(e) => {
                    debug!("{:?}: {}", record.address, e);
                    record.ping_status = e.into();
                }
            }
        }

        let dispatched = jobs.len();
        let workers = self.max_concurrency.min(dispatched);
        let queue = Mutex::new(jobs.into_iter());
        let (tx, rx) = mpsc::channel();

        thread::scope(|s| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                s.spawn(move || loop {
                    let job = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                    let Some((index, addr)) = job else {
                        break;
                    };
                    let reply = panic::catch_unwind(AssertUnwindSafe(|| {
                        self.prober.probe(&addr, self.timeout)
                    }))
                    .unwrap_or_else(|_| {
                        warn!("{}: probe failed unexpectedly", addr);
                        Reply::new(PingStatus::Error)
                    });
                    if tx.send((index, reply)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            // completion order
            for (index, reply) in rx {
                let record = &mut records[index];
                trace!("{} [{}]", record.address, reply.ping);
                record.ping_status = match reply.ping {
                    // a prober must not hand back an unresolved probe
                    PingStatus::Pending => PingStatus::Error,
                    ping => ping,
                };
                if let Some(status) = reply.status {
                    status.fill(record);
                }
            }
        });

        let alive = records.iter().filter(|r| r.ping_status.latency().is_some()).count();
        debug!(
            "probed {} of {} servers with {} workers in {:.3}s, {} alive",
            dispatched,
            records.len(),
            workers,
            start.elapsed().as_secs_f32(),
            alive,
        );

        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::record::ServerAddr;

    /// Replies after `delay` depending on the port number.
    struct FakeProber {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl FakeProber {
        fn new(delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl Prober for FakeProber {
        fn probe(&self, addr: &ServerAddr, _timeout: Duration) -> Reply {
            let n = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(n, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match addr.port {
                1 => Reply::new(PingStatus::Timeout),
                2 => Reply::new(PingStatus::Error),
                3 => panic!("probe exploded"),
                4 => Reply::new(PingStatus::Pending),
                port => Reply::new(PingStatus::Latency(u32::from(port))),
            }
        }
    }

    fn record(address: &str) -> ServerRecord {
        ServerRecord::new(address, address)
    }

    #[test]
    fn every_record_is_resolved() {
        let records = vec![
            record("10.0.0.1:45"),
            record("10.0.0.2:1"),
            record("10.0.0.3:2"),
            record("not-an-address"),
            record("10.0.0.4:"),
            record("10.0.0.5:4"),
        ];
        let scheduler = ProbeScheduler::with_prober(FakeProber::new(Duration::ZERO), DEFAULT_TIMEOUT, 4);
        let records = scheduler.probe_all(records);
        let pings: Vec<_> = records.iter().map(|r| r.ping_status).collect();
        assert_eq!(
            pings,
            [
                PingStatus::Latency(45),
                PingStatus::Timeout,
                PingStatus::Error,
                PingStatus::ParseError,
                PingStatus::InvalidAddress,
                PingStatus::Error,
            ]
        );
        assert!(records.iter().all(|r| r.ping_status.is_terminal()));
    }

    #[test]
    fn parse_error_among_valid_addresses() {
        let mut records: Vec<_> = (0..10)
            .map(|i| record(&format!("192.0.2.{}:{}", i + 1, 29070 + i)))
            .collect();
        records.insert(5, record("not-an-address"));
        let scheduler = ProbeScheduler::with_prober(FakeProber::new(Duration::ZERO), DEFAULT_TIMEOUT, 20);
        let records = scheduler.probe_all(records);
        assert_eq!(records.len(), 11);
        assert_eq!(records[5].ping_status, PingStatus::ParseError);
        let probed = records
            .iter()
            .filter(|r| r.ping_status.latency().is_some())
            .count();
        assert_eq!(probed, 10);
    }

    #[test]
    fn panicking_probe_is_isolated() {
        let records = vec![
            record("10.0.0.1:10"),
            record("10.0.0.2:3"),
            record("10.0.0.3:30"),
        ];
        let scheduler = ProbeScheduler::with_prober(FakeProber::new(Duration::ZERO), DEFAULT_TIMEOUT, 1);
        let records = scheduler.probe_all(records);
        assert_eq!(records[0].ping_status, PingStatus::Latency(10));
        assert_eq!(records[1].ping_status, PingStatus::Error);
        assert_eq!(records[2].ping_status, PingStatus::Latency(30));
    }

    #[test]
    fn bounded_concurrency() {
        let timeout = Duration::from_millis(50);
        let records: Vec<_> = (0..100)
            .map(|i| record(&format!("192.0.2.{}:1", i + 1)))
            .collect();
        let prober = FakeProber::new(timeout);
        let scheduler = ProbeScheduler::with_prober(prober, timeout, 20);

        let start = Instant::now();
        let records = scheduler.probe_all(records);
        let elapsed = start.elapsed();

        assert!(records.iter().all(|r| r.ping_status == PingStatus::Timeout));
        // 100 probes over 20 workers take at least five rounds
        assert!(elapsed >= timeout * 5, "{:?}", elapsed);
        assert!(elapsed < timeout * 50, "{:?}", elapsed);
        let max = scheduler.prober.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 20 && max > 1, "{}", max);
    }

    #[test]
    fn empty_batch() {
        let scheduler = ProbeScheduler::with_prober(FakeProber::new(Duration::ZERO), DEFAULT_TIMEOUT, 20);
        assert!(scheduler.probe_all(Vec::new()).is_empty());
        let records = scheduler.probe_all(vec![record("garbage")]);
        assert_eq!(records[0].ping_status, PingStatus::ParseError);
    }
}
