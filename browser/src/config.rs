// SPDX-License-Identifier: GPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::{de::Error as _, Deserialize, Deserializer};
use thiserror::Error;

use crate::catalog::Column;
use crate::directory::{DEFAULT_LISTING_TIMEOUT, DEFAULT_LISTING_URL, DEFAULT_MASTER_TIMEOUT};
use crate::mods::{ModAlias, ModTable};
use crate::probe;
use crate::scheduler::DEFAULT_CONCURRENCY;

pub const DEFAULT_CONFIG_PATH: &str = "config/main.toml";
pub const DEFAULT_FILTER: &str = "Movie Battles II";
pub const DEFAULT_MASTER: &str = "MBII (master.moviebattles.org)";

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(rename = "mod")]
    #[serde(default)]
    pub mods: Vec<ModAlias>,
}

impl Config {
    /// Mod selectors from the config, or the built-in table if none are listed.
    pub fn mod_table(&self) -> ModTable {
        if self.mods.is_empty() {
            ModTable::default()
        } else {
            ModTable::new(self.mods.clone())
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    #[serde(deserialize_with = "deserialize_log_level")]
    pub level: LevelFilter,
    #[serde(default = "default_true")]
    pub time: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            time: true,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    /// Per server timeout in milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout: u32,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.into())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: default_probe_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Listing,
    Master,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub source: SourceKind,
    #[serde(default = "default_url")]
    pub url: String,
    /// Listing download timeout in seconds.
    #[serde(default = "default_listing_timeout")]
    pub timeout: u32,
    /// Registry name or `host:port`.
    #[serde(default = "default_master")]
    pub master: String,
    /// Master reply timeout in seconds.
    #[serde(default = "default_master_timeout")]
    pub master_timeout: u32,
    #[serde(default = "default_protocol")]
    pub protocol: u32,
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.into())
    }

    pub fn master_timeout(&self) -> Duration {
        Duration::from_secs(self.master_timeout.into())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            url: default_url(),
            timeout: default_listing_timeout(),
            master: default_master(),
            master_timeout: default_master_timeout(),
            protocol: default_protocol(),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_column")]
    pub sort: Column,
    #[serde(default)]
    pub descending: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            sort: Column::default(),
            descending: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> LevelFilter {
    LevelFilter::Warn
}

fn default_probe_timeout() -> u32 {
    probe::DEFAULT_TIMEOUT.as_millis() as u32
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_url() -> String {
    DEFAULT_LISTING_URL.to_owned()
}

fn default_listing_timeout() -> u32 {
    DEFAULT_LISTING_TIMEOUT.as_secs() as u32
}

fn default_master() -> String {
    DEFAULT_MASTER.to_owned()
}

fn default_master_timeout() -> u32 {
    DEFAULT_MASTER_TIMEOUT.as_secs() as u32
}

fn default_protocol() -> u32 {
    mbii_protocol::PROTOCOL_VERSION
}

fn default_filter() -> String {
    DEFAULT_FILTER.to_owned()
}

fn deserialize_log_level<'de, D>(de: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(de)?;
    parse_log_level(&s).ok_or_else(|| D::Error::custom(format!("Invalid log level: \"{}\"", s)))
}

pub fn parse_log_level(s: &str) -> Option<LevelFilter> {
    use LevelFilter as E;

    let level_filter = match s {
        "" => return None,
        _ if "off".starts_with(s) => E::Off,
        _ if "error".starts_with(s) => E::Error,
        _ if "warn".starts_with(s) => E::Warn,
        _ if "info".starts_with(s) => E::Info,
        _ if "debug".starts_with(s) => E::Debug,
        _ if "trace".starts_with(s) => E::Trace,
        _ => match s.parse::<u8>() {
            Ok(0) => E::Off,
            Ok(1) => E::Error,
            Ok(2) => E::Warn,
            Ok(3) => E::Info,
            Ok(4) => E::Debug,
            Ok(5) => E::Trace,
            _ => return None,
        },
    };
    Some(level_filter)
}

fn deserialize_column<'de, D>(de: D) -> Result<Column, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(de)?;
    s.parse().map_err(D::Error::custom)
}

pub fn parse(data: &str) -> Result<Config, Error> {
    Ok(toml::from_str(data)?)
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, Error> {
    let data = fs::read_to_string(path)?;
    parse(&data)
}
