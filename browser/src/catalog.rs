// SPDX-License-Identifier: GPL-3.0-only

//! The current set of probed servers and views over it.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::mods::ModTable;
use crate::record::ServerRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown column \"{0}\"")]
pub struct UnknownColumn(pub String);

/// Sortable record field.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Address,
    Map,
    Players,
    Mod,
    GameType,
    #[default]
    Ping,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Self::Name,
        Self::Address,
        Self::Map,
        Self::Players,
        Self::Mod,
        Self::GameType,
        Self::Ping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Map => "map",
            Self::Players => "players",
            Self::Mod => "mod",
            Self::GameType => "gametype",
            Self::Ping => "ping",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Players | Self::Ping)
    }

    fn value<'a>(&self, record: &'a ServerRecord) -> Cow<'a, str> {
        match self {
            Self::Name => record.plain_hostname(),
            Self::Address => Cow::Borrowed(&record.address),
            Self::Map => Cow::Borrowed(&record.map_name),
            Self::Players => Cow::Borrowed(&record.player_count),
            Self::Mod => Cow::Borrowed(&record.mod_identifier),
            Self::GameType => Cow::Borrowed(&record.game_type),
            Self::Ping => Cow::Owned(record.ping_status.to_string()),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Column {
    type Err = UnknownColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "name" | "hostname" => Self::Name,
            "address" | "addr" => Self::Address,
            "map" | "mapname" => Self::Map,
            "players" | "clients" => Self::Players,
            "mod" => Self::Mod,
            "gametype" | "type" => Self::GameType,
            "ping" => Self::Ping,
            _ => return Err(UnknownColumn(s.to_owned())),
        })
    }
}

/// Sort key for numeric columns.
///
/// Uses the first run of digits. Values without digits, such as `Timeout` or
/// `N/A`, get the largest key and end up last in ascending order.
pub fn numeric_key(s: &str) -> u64 {
    let digits = s
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or_default();
    digits.parse().unwrap_or(u64::MAX)
}

/// Stable sort of `records` by `column`.
pub fn sort_records(records: &mut [ServerRecord], column: Column, descending: bool) {
    if column.is_numeric() {
        sort_by_key(records, descending, |r| numeric_key(&column.value(r)));
    } else {
        sort_by_key(records, descending, |r| column.value(r).to_lowercase());
    }
}

fn sort_by_key<K, F>(records: &mut [ServerRecord], descending: bool, mut f: F)
where
    K: Ord,
    F: FnMut(&ServerRecord) -> K,
{
    if descending {
        records.sort_by_cached_key(|r| Reverse(f(r)));
    } else {
        records.sort_by_cached_key(f);
    }
}

struct Snapshot {
    records: Arc<[ServerRecord]>,
    generation: u64,
}

/// Servers from the latest completed refresh.
///
/// The record set is only ever replaced as a whole, readers get an immutable
/// snapshot and never see a partially updated list.
pub struct Catalog {
    mods: ModTable,
    current: RwLock<Snapshot>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(ModTable::default())
    }
}

impl Catalog {
    pub fn new(mods: ModTable) -> Self {
        Self {
            mods,
            current: RwLock::new(Snapshot {
                records: Arc::from(Vec::new()),
                generation: 0,
            }),
        }
    }

    pub fn mods(&self) -> &ModTable {
        &self.mods
    }

    /// Replaces all records and returns the new generation number.
    pub fn replace(&self, records: Vec<ServerRecord>) -> u64 {
        let records = Arc::from(records);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.records = records;
        current.generation += 1;
        current.generation
    }

    pub fn snapshot(&self) -> Arc<[ServerRecord]> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    /// Incremented on every [`Catalog::replace`], zero before the first one.
    pub fn generation(&self) -> u64 {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records running the mod `selector`, in catalog order.
    pub fn filter(&self, selector: &str) -> Vec<ServerRecord> {
        let matches = self.mods.matcher(selector);
        self.snapshot()
            .iter()
            .filter(|r| matches(&r.mod_identifier))
            .cloned()
            .collect()
    }

    /// All records ordered by `column`.
    pub fn sort(&self, column: Column, descending: bool) -> Vec<ServerRecord> {
        let mut records = self.snapshot().to_vec();
        sort_records(&mut records, column, descending);
        records
    }

    /// Filtered and ordered records from a single snapshot.
    pub fn view(&self, selector: &str, column: Column, descending: bool) -> Vec<ServerRecord> {
        let mut records = self.filter(selector);
        sort_records(&mut records, column, descending);
        records
    }

    pub fn select(&self, address: &str) -> Option<ServerRecord> {
        let address = address.trim();
        self.snapshot().iter().find(|r| r.address == address).cloned()
    }
}
