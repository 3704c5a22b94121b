// SPDX-License-Identifier: GPL-3.0-only

#![deny(unsafe_code)]

mod cli;
mod logger;

use std::fmt;
use std::process;

use mbii_browser::{
    config::{self, Config, SourceKind},
    directory::StaticSource,
    mods,
    registry::MasterRegistry,
    session::{self, RefreshStatus},
    Catalog, ProbeScheduler, ServerRecord, Session,
};
use mbii_protocol::color;
use serde::Serialize;
use thiserror::Error;

use crate::{cli::Cli, logger::Logger};

#[derive(Error, Debug)]
enum Error {
    #[error("Undefined command \"{0}\"")]
    UndefinedCommand(String),
    #[error("Command \"{0}\" requires an argument")]
    MissingArgument(&'static str),
    #[error("Server \"{0}\" not found")]
    NotFound(String),
    #[error(transparent)]
    Session(#[from] session::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ListResult<'a> {
    status: String,
    generation: u64,
    filter: &'a str,
    servers: &'a [ServerRecord],
}

struct Colored<'a> {
    inner: &'a str,
    forced: bool,
}

impl<'a> Colored<'a> {
    fn new(s: &'a str, forced: bool) -> Self {
        Self { inner: s, forced }
    }
}

impl fmt::Display for Colored<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        #[cfg(feature = "color")]
        if self.forced || crossterm::tty::IsTty::is_tty(&std::io::stdout()) {
            use crossterm::style::{Color, ResetColor, SetForegroundColor};

            for (code, text) in color::ColorIter::new(self.inner) {
                let fg = match color::Color::try_from(code) {
                    Ok(color::Color::Black) => Color::DarkGrey,
                    Ok(color::Color::Red) => Color::Red,
                    Ok(color::Color::Green) => Color::Green,
                    Ok(color::Color::Yellow) => Color::Yellow,
                    Ok(color::Color::Blue) => Color::Blue,
                    Ok(color::Color::Cyan) => Color::Cyan,
                    Ok(color::Color::Magenta) => Color::Magenta,
                    Ok(color::Color::White) => Color::White,
                    Err(_) => Color::Reset,
                };
                write!(fmt, "{}{}", SetForegroundColor(fg), text)?;
            }
            return write!(fmt, "{}", ResetColor);
        }

        for (_, text) in color::ColorIter::new(self.inner) {
            fmt.write_str(text)?;
        }
        Ok(())
    }
}

fn load_config(cli: &Cli, logger: &Logger) -> Result<Config, config::Error> {
    let mut cfg = match cli.config_path.as_deref() {
        Some(p) => config::load(p)?,
        None => Config::default(),
    };

    if let Some(level) = cli.log_level {
        cfg.log.level = level;
    }
    if let Some(timeout) = cli.timeout {
        cfg.probe.timeout = timeout;
    }
    if let Some(concurrency) = cli.concurrency {
        cfg.probe.concurrency = concurrency;
    }
    if let Some(url) = &cli.url {
        cfg.directory.source = SourceKind::Listing;
        cfg.directory.url = url.clone();
    }
    if let Some(master) = &cli.master {
        cfg.directory.source = SourceKind::Master;
        cfg.directory.master = master.clone();
    }
    if let Some(filter) = &cli.filter {
        cfg.view.filter = filter.clone();
    }
    if let Some(sort) = cli.sort {
        cfg.view.sort = sort;
    }
    if cli.reverse {
        cfg.view.descending = !cfg.view.descending;
    }

    logger.update_config(&cfg.log);

    Ok(cfg)
}

fn print_servers(
    cli: &Cli,
    session: &Session,
    status: &RefreshStatus,
    filter: &str,
    servers: &[ServerRecord],
) -> Result<(), Error> {
    if cli.json {
        let result = ListResult {
            status: status.to_string(),
            generation: session.generation(),
            filter,
            servers,
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for i in servers {
        println!(
            "{:>12}  {:>7}  {:<20}  {:<18}  {:<21}  {}{}",
            i.ping_status.to_string(),
            i.player_count,
            i.map_name,
            i.mod_identifier,
            i.address,
            if i.password_protected { "* " } else { "" },
            Colored::new(&i.hostname, cli.force_color),
        );
    }
    if servers.len() != session.catalog().len() {
        println!("{} of {} servers match \"{}\"", servers.len(), session.catalog().len(), filter);
    }
    println!("{}", status);
    Ok(())
}

fn print_server(cli: &Cli, server: &ServerRecord) -> Result<(), Error> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(server)?);
        return Ok(());
    }

    println!("name:      {}", Colored::new(&server.hostname, cli.force_color));
    println!("address:   {}", server.address);
    println!("map:       {}", server.map_name);
    println!("players:   {}", server.player_count);
    println!("mod:       {}", server.mod_identifier);
    println!("game type: {}", server.game_type);
    println!("password:  {}", if server.password_protected { "yes" } else { "no" });
    println!("ping:      {}", server.ping_status);
    Ok(())
}

fn list_servers(cli: &Cli, cfg: &Config) -> Result<(), Error> {
    let session = Session::from_config(cfg)?;
    let status = session.refresh();
    let view = &cfg.view;
    let servers = session.get_view(&view.filter, view.sort, view.descending);
    print_servers(cli, &session, &status, &view.filter, &servers)
}

fn ping_servers(cli: &Cli, cfg: &Config, hosts: &[String]) -> Result<(), Error> {
    if hosts.is_empty() {
        return Err(Error::MissingArgument("ping"));
    }
    let source = StaticSource::from_addresses(hosts);
    let scheduler = ProbeScheduler::new(cfg.probe.timeout(), cfg.probe.concurrency);
    let session = Session::new(Box::new(source), scheduler, Catalog::new(cfg.mod_table()));
    let status = session.refresh();
    let servers = session.get_view(mods::ALL, cfg.view.sort, cfg.view.descending);
    print_servers(cli, &session, &status, mods::ALL, &servers)
}

fn select_server(cli: &Cli, cfg: &Config, address: &str) -> Result<(), Error> {
    let session = Session::from_config(cfg)?;
    let status = session.refresh();
    match session.select(address) {
        Some(server) => print_server(cli, &server),
        None => {
            eprintln!("{}", status);
            Err(Error::NotFound(address.to_owned()))
        }
    }
}

fn print_masters(cli: &Cli) -> Result<(), Error> {
    let registry = MasterRegistry::default();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(registry.entries())?);
    } else {
        for i in registry.entries() {
            println!("{:<42} {}", i.name, i.address);
        }
    }
    Ok(())
}

fn print_mods(cli: &Cli, cfg: &Config) -> Result<(), Error> {
    let table = cfg.mod_table();
    let names = table.names();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for i in names {
            println!("{}", i);
        }
    }
    Ok(())
}

fn execute(cli: &Cli, cfg: &Config) -> Result<(), Error> {
    let args = &cli.args;
    match args.first().map(|s| s.as_str()).unwrap_or_default() {
        "list" | "" => list_servers(cli, cfg),
        "ping" => ping_servers(cli, cfg, &args[1..]),
        "select" => match args.get(1) {
            Some(address) => select_server(cli, cfg, address),
            None => Err(Error::MissingArgument("select")),
        },
        "masters" => print_masters(cli),
        "mods" => print_mods(cli, cfg),
        s => Err(Error::UndefinedCommand(s.to_owned())),
    }
}

fn main() {
    let cli = cli::parse().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let logger = logger::init();

    let cfg = load_config(&cli, logger).unwrap_or_else(|e| {
        match cli.config_path.as_deref() {
            Some(p) => eprintln!("Failed to load config \"{p}\": {e}"),
            None => eprintln!("{e}"),
        }
        process::exit(1);
    });

    if let Err(e) = execute(&cli, &cfg) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
