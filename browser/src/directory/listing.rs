// SPDX-License-Identifier: GPL-3.0-only

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use log::{debug, trace};
use regex::{Captures, Regex};

use super::{DirectorySource, Error};
use crate::record::{ServerRecord, NOT_AVAILABLE};

pub const DEFAULT_LISTING_URL: &str = "https://jkhubservers.appspot.com";
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(30);

// Address cell of the full-width table.
const ADDRESS: usize = 3;
const FULL_ROW: usize = 11;

// Column offsets relative to the address cell.
const MAP: usize = 1;
const PLAYERS: usize = 2;
const MOD: usize = 4;
const GAME_TYPE: usize = 5;

macro_rules! regex {
    ($re:literal) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($re).expect("invalid regex"))
    }};
}

/// Scrapes the server table of a web listing.
#[derive(Clone, Debug)]
pub struct ListingSource {
    url: String,
    timeout: Duration,
}

impl ListingSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for ListingSource {
    fn default() -> Self {
        Self::new(DEFAULT_LISTING_URL, DEFAULT_LISTING_TIMEOUT)
    }
}

impl fmt::Display for ListingSource {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "listing {}", self.url)
    }
}

impl DirectorySource for ListingSource {
    fn fetch(&self) -> Result<Vec<ServerRecord>, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let body = client.get(&self.url).send()?.error_for_status()?.text()?;
        debug!("{}: received {} bytes", self.url, body.len());
        parse_listing(&body)
    }
}

/// Extracts server records from the first table body of an HTML page.
///
/// Full-width rows take the address from their fixed column, even when the text
/// does not parse, so a broken entry still reaches the catalog. Narrower rows
/// use their last `host:port` cell and are skipped without one.
pub fn parse_listing(html: &str) -> Result<Vec<ServerRecord>, Error> {
    let tbody = regex!(r"(?is)<tbody[^>]*>(.*?)</tbody>")
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or(Error::NoTable)?;

    let mut records = Vec::new();
    for row in regex!(r"(?is)<tr[^>]*>(.*?)</tr>").captures_iter(tbody.as_str()) {
        let row = &row[1];
        let cells: Vec<String> = regex!(r"(?is)<td[^>]*>(.*?)</td>")
            .captures_iter(row)
            .map(|c| cell_text(&c[1]))
            .collect();
        match parse_row(&cells, is_locked(row)) {
            Some(record) => records.push(record),
            None => trace!("skip row {:?}", cells),
        }
    }
    debug!("listing has {} servers", records.len());
    Ok(records)
}

fn parse_row(cells: &[String], password_protected: bool) -> Option<ServerRecord> {
    let addr = if cells.len() >= FULL_ROW {
        ADDRESS
    } else {
        cells.iter().rposition(|i| is_address(i))?
    };
    let address = &cells[addr];
    let hostname = cells[..addr]
        .iter()
        .rev()
        .find(|i| !i.is_empty())
        .unwrap_or(address);
    let column = |offset: usize| match cells.get(addr + offset) {
        Some(s) if !s.is_empty() => s.clone(),
        _ => NOT_AVAILABLE.to_owned(),
    };

    let mut record = ServerRecord::new(hostname.as_str(), address.as_str());
    record.map_name = column(MAP);
    record.player_count = column(PLAYERS);
    record.mod_identifier = column(MOD);
    record.game_type = column(GAME_TYPE);
    record.password_protected = password_protected;
    Some(record)
}

fn is_address(s: &str) -> bool {
    regex!(r"^(?:\d{1,3}(?:\.\d{1,3}){3}|\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)+):\d{1,5}$")
        .is_match(s)
}

/// Looks for lock icons or password hints in the row markup.
fn is_locked(row: &str) -> bool {
    if row.contains('\u{1f512}') {
        return true;
    }
    regex!(r"(?i)<[^>]*(?:class|title|alt)\s*=\s*['\x22][^'\x22]*(?:lock|passw)[^>]*>").is_match(row)
}

fn cell_text(html: &str) -> String {
    let text = regex!(r"(?s)<[^>]*>").replace_all(html, " ");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> Cow<'_, str> {
    regex!(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);").replace_all(s, |c: &Captures| {
        let entity = &c[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16))
                .or_else(|| entity.strip_prefix('#').map(str::parse))
                .and_then(Result::ok)
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => c.to_string(),
            None => c[0].to_owned(),
        }
    })
}
