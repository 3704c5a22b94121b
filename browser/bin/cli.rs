// SPDX-License-Identifier: GPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

use std::process;

use getopts::Options;
use log::LevelFilter;
use mbii_browser::{
    catalog::Column,
    config::{self, DEFAULT_FILTER},
    directory::DEFAULT_LISTING_URL,
    probe, scheduler,
};
use thiserror::Error;

const BIN_NAME: &str = env!("CARGO_BIN_NAME");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid value for log option: \"{0}\"")]
    InvalidLogLevel(String),
    #[error("Invalid timeout \"{0}\"")]
    InvalidTimeout(String),
    #[error("Invalid concurrency \"{0}\"")]
    InvalidConcurrency(String),
    #[error(transparent)]
    InvalidColumn(#[from] mbii_browser::catalog::UnknownColumn),
    #[error(transparent)]
    Options(#[from] getopts::Fail),
}

#[derive(Debug, Default)]
pub struct Cli {
    pub log_level: Option<LevelFilter>,
    pub config_path: Option<Box<str>>,
    pub timeout: Option<u32>,
    pub concurrency: Option<usize>,
    pub master: Option<String>,
    pub url: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<Column>,
    pub reverse: bool,
    pub json: bool,
    pub force_color: bool,
    pub args: Vec<String>,
}

fn print_usage(opts: Options) {
    let brief = format!(
        "\
Usage: {} [options] <COMMAND> [ARGS]

COMMANDS:
    list                fetch and ping servers, print the filtered list (default)
    ping hosts...       ping each host:port
    select ADDRESS      fetch and ping servers, print one server
    masters             print known master servers
    mods                print mod filters\
        ",
        BIN_NAME
    );
    print!("{}", opts.usage(&brief));
}

fn print_version() {
    println!("{} v{}", PKG_NAME, PKG_VERSION);
}

pub fn parse() -> Result<Cli, Error> {
    let mut cli = Cli::default();

    let args: Vec<_> = std::env::args().collect();
    let mut opts = Options::new();
    opts.optflag("h", "help", "print usage help");
    opts.optflag("v", "version", "print program version");
    let log_help =
        "logging level [default: warn(2)]\nLEVEL: 0-5, off, error, warn, info, debug, trace";
    opts.optopt("l", "log", log_help, "LEVEL");
    let help = format!("config path [example: {}]", config::DEFAULT_CONFIG_PATH);
    opts.optopt("c", "config", &help, "PATH");
    let help = format!(
        "time to wait for each server [default: {}]",
        probe::DEFAULT_TIMEOUT.as_millis()
    );
    opts.optopt("t", "timeout", &help, "MS");
    let help = format!(
        "servers to ping at once [default: {}]",
        scheduler::DEFAULT_CONCURRENCY
    );
    opts.optopt("n", "concurrency", &help, "N");
    opts.optopt("m", "master", "get servers from a master server", "NAME|HOST:PORT");
    let help = format!("get servers from a web listing [default: {}]", DEFAULT_LISTING_URL);
    opts.optopt("u", "url", &help, "URL");
    let help = format!("show only servers of a mod [default: {}]", DEFAULT_FILTER);
    opts.optopt("f", "filter", &help, "MOD");
    let columns = Column::ALL.map(|i| i.as_str()).join(", ");
    let help = format!("sort column [default: ping]\nCOLUMN: {}", columns);
    opts.optopt("s", "sort", &help, "COLUMN");
    opts.optflag("r", "reverse", "sort in descending order");
    opts.optflag("j", "json", "output JSON");
    opts.optflag("F", "force-color", "force colored output");

    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("help") {
        print_usage(opts);
        process::exit(0);
    }

    if matches.opt_present("version") {
        print_version();
        process::exit(0);
    }

    if let Some(s) = matches.opt_str("log") {
        let level = config::parse_log_level(&s).ok_or(Error::InvalidLogLevel(s))?;
        cli.log_level = Some(level);
    }

    if let Some(s) = matches.opt_str("config") {
        cli.config_path = Some(s.into_boxed_str());
    }

    if let Some(s) = matches.opt_str("timeout") {
        cli.timeout = Some(s.parse().map_err(|_| Error::InvalidTimeout(s))?);
    }

    if let Some(s) = matches.opt_str("concurrency") {
        match s.parse::<usize>() {
            Ok(n) if n > 0 => cli.concurrency = Some(n),
            _ => return Err(Error::InvalidConcurrency(s)),
        }
    }

    if let Some(s) = matches.opt_str("sort") {
        cli.sort = Some(s.parse()?);
    }

    cli.master = matches.opt_str("master");
    cli.url = matches.opt_str("url");
    cli.filter = matches.opt_str("filter");
    cli.reverse = matches.opt_present("reverse");
    cli.json = matches.opt_present("json");
    cli.force_color = matches.opt_present("force-color");
    cli.args = matches.free;

    Ok(cli)
}
