use std::{
    net::{Ipv4Addr, SocketAddrV4, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use mbii_browser::{PingStatus, ProbeScheduler, ServerRecord};
use mbii_protocol::game::GetStatus;

const LOCALHOST: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0);

const STATUS: &[u8] = b"\xff\xff\xff\xffstatusResponse\n\
    \\sv_hostname\\^5Loopback ^7MB\\mapname\\mb2_smuggler\\gamename\\MBII\
    \\g_gametype\\7\\sv_maxclients\\32\\g_needpass\\0\n\
    3 50 \"Padawan\"\n";

/// Answers every query after `delay`.
fn spawn_server(delay: Duration, reply: &'static [u8]) -> String {
    let sock = UdpSocket::bind(LOCALHOST).unwrap();
    let addr = sock.local_addr().unwrap().to_string();
    thread::spawn(move || {
        let mut buf = [0; 512];
        while let Ok((n, from)) = sock.recv_from(&mut buf) {
            if &buf[..n] != GetStatus::HEADER {
                continue;
            }
            thread::sleep(delay);
            let _ = sock.send_to(reply, from);
        }
    });
    addr
}

/// Bound socket that never answers.
fn black_hole() -> (UdpSocket, String) {
    let sock = UdpSocket::bind(LOCALHOST).unwrap();
    let addr = sock.local_addr().unwrap().to_string();
    (sock, addr)
}

#[test]
fn mixed_batch() {
    let responsive = spawn_server(Duration::from_millis(20), STATUS);
    let (_hole, silent) = black_hole();
    let records = vec![
        ServerRecord::new(responsive.as_str(), responsive.as_str()),
        ServerRecord::new("silent", silent.as_str()),
        ServerRecord::new("broken", "not-an-address"),
    ];

    let scheduler = ProbeScheduler::new(Duration::from_millis(300), 20);
    let start = Instant::now();
    let records = scheduler.probe_all(records);
    let elapsed = start.elapsed();

    // probes overlap, the batch takes one timeout plus scheduling slack
    assert!(elapsed >= Duration::from_millis(250), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300 + 150), "took {:?}", elapsed);

    // the silent server does not delay the responsive one
    match records[0].ping_status {
        PingStatus::Latency(ms) => assert!((15..200).contains(&ms), "latency {}", ms),
        ref s => panic!("unexpected status {:?}", s),
    }
    assert_eq!(records[0].hostname, "^5Loopback ^7MB");
    assert_eq!(records[0].map_name, "mb2_smuggler");
    assert_eq!(records[0].mod_identifier, "MBII");
    assert_eq!(records[0].player_count, "1/32");
    assert_eq!(records[0].game_type, "Siege");
    assert_eq!(records[1].ping_status, PingStatus::Timeout);
    assert_eq!(records[2].ping_status, PingStatus::ParseError);
    assert!(records.iter().all(|r| r.ping_status.is_terminal()));
}

#[test]
fn any_reply_counts_as_alive() {
    let addr = spawn_server(Duration::ZERO, b"hello");
    let mut record = ServerRecord::new("odd", addr.as_str());
    record.map_name = "ffa_bespin".to_owned();

    let scheduler = ProbeScheduler::new(Duration::from_millis(300), 1);
    let records = scheduler.probe_all(vec![record]);
    assert!(records[0].ping_status.latency().is_some());
    // nothing to merge from an unknown reply
    assert_eq!(records[0].map_name, "ffa_bespin");
    assert_eq!(records[0].mod_identifier, "N/A");
}

#[test]
fn malformed_addresses_skip_the_network() {
    let records = ["", "1.2.3.4", "1.2.3.4:port", "1.2.3.4:70000", ":29070", "host:", "1.2.3.4:0"]
        .iter()
        .map(|addr| ServerRecord::new("x", *addr))
        .collect();
    let scheduler = ProbeScheduler::new(Duration::from_secs(5), 2);
    let start = Instant::now();
    let records = scheduler.probe_all(records);
    assert!(start.elapsed() < Duration::from_secs(1));

    let statuses: Vec<_> = records.iter().map(|r| r.ping_status).collect();
    assert_eq!(
        statuses,
        [
            PingStatus::ParseError,
            PingStatus::ParseError,
            PingStatus::ParseError,
            PingStatus::ParseError,
            PingStatus::InvalidAddress,
            PingStatus::InvalidAddress,
            PingStatus::InvalidAddress,
        ]
    );
}

#[test]
fn many_silent_servers_respect_the_cap() {
    let holes: Vec<_> = (0..10).map(|_| black_hole()).collect();
    let records = holes
        .iter()
        .map(|(_, addr)| ServerRecord::new("silent", addr.as_str()))
        .collect();

    // two waves of five
    let scheduler = ProbeScheduler::new(Duration::from_millis(100), 5);
    let start = Instant::now();
    let records = scheduler.probe_all(records);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(180), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1000), "took {:?}", elapsed);
    assert!(records.iter().all(|r| r.ping_status == PingStatus::Timeout));
}
