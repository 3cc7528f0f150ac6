//! `env_logger` setup with the engine's line format:
//! `LOG: [19-Oct-2026 14:03:11]: message`.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use env_logger::{Builder, Env};
use log::Level;

const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "ERR",
        Level::Warn => "WAR",
        Level::Info | Level::Debug | Level::Trace => "LOG",
    }
}

pub fn format_line(level: Level, at: NaiveDateTime, message: &str) -> String {
    format!("{}: [{}]: {message}", prefix(level), at.format(TIMESTAMP_FORMAT))
}

/// Installs the global logger. `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            let line = format_line(
                record.level(),
                Local::now().naive_local(),
                &record.args().to_string(),
            );
            writeln!(buf, "{line}")
        })
        .try_init()
        .context("logger already installed")
}
