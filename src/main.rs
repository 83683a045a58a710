mod catalog;
mod cli;
mod config;
mod drivers;
mod error;
mod freeze;
mod logging;
mod ops;
mod restore;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::process::ExitCode;
use tracing::{error, info};

use cli::{Cli, Mode};
use config::settings::ConnectionSettings;
use drivers::Connection;
use drivers::http::HttpConnection;

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Done,
    NoModeSelected,
}

fn main() -> ExitCode {
    let cli = Cli::parse_from(cli::normalize_args(std::env::args_os()));
    logging::init(cli.debug);

    let connect = |settings: &ConnectionSettings| -> error::Result<Box<dyn Connection>> {
        Ok(Box::new(HttpConnection::open(settings)?))
    };

    match run(&cli, connect) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::NoModeSelected) => ExitCode::from(2),
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Pick the mode, validate its settings, connect, and dispatch. Errors
/// returned from here are fatal; per-database and restore failures are
/// logged and the run still ends with `done`.
fn run<'c, F>(cli: &Cli, connect: F) -> Result<Outcome>
where
    F: FnOnce(&ConnectionSettings) -> error::Result<Box<dyn Connection + 'c>>,
{
    let Some(mode) = cli.mode()? else {
        println!("Choose mode (restore or backup)");
        return Ok(Outcome::NoModeSelected);
    };

    match mode {
        Mode::Backup => {
            let settings = cli.backup_settings()?;
            settings.validate()?;
            let conn_settings = cli.connection_settings()?;
            let conn = open(connect, &conn_settings)?;
            info!("Run in backup mode");

            let bar = ops::create_progress_bar("Backing up");
            let result = ops::do_backup(conn.as_ref(), &settings, &conn_settings.host, &bar);
            bar.finish_and_clear();
            match result {
                Ok(summary) if !summary.failed.is_empty() => {
                    error!("backup incomplete for: {}", summary.failed.join(", "));
                }
                Ok(_) => {}
                Err(err) => error!("can't finish backup, {err}"),
            }
        }
        Mode::Restore => {
            let settings = cli.restore_settings()?;
            settings.validate()?;
            let conn_settings = cli.connection_settings()?;
            let conn = open(connect, &conn_settings)?;
            info!("Run in restore mode");

            let bar = ops::create_progress_bar("Restoring");
            let result = ops::do_restore(conn.as_ref(), &settings, &bar);
            bar.finish_and_clear();
            if let Err(err) = result {
                error!("can't restore database, {err}");
            }
        }
    }

    println!("{}", "done".green());
    Ok(Outcome::Done)
}

fn open<'c, F>(connect: F, settings: &ConnectionSettings) -> Result<Box<dyn Connection + 'c>>
where
    F: FnOnce(&ConnectionSettings) -> error::Result<Box<dyn Connection + 'c>>,
{
    let conn = connect(settings).with_context(|| format!("can't connect to clickhouse server at {}", settings.url()))?;
    conn.ping()
        .with_context(|| format!("clickhouse server at {} is not answering", settings.url()))?;
    info!("connected to {} via {}", settings.url(), conn.name());
    Ok(conn)
}
