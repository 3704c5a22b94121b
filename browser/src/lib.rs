// SPDX-License-Identifier: GPL-3.0-only

#![deny(unsafe_code)]

//! Server discovery and latency probing for Movie Battles II.

pub mod catalog;
pub mod config;
pub mod directory;
pub mod mods;
pub mod probe;
pub mod record;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use crate::{
    catalog::{Catalog, Column},
    config::Config,
    directory::DirectorySource,
    probe::probe,
    record::{PingStatus, ServerAddr, ServerRecord},
    scheduler::ProbeScheduler,
    session::{RefreshStatus, Session},
};
