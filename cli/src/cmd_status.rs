// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;

use clap::{ArgMatches, Command, arg};
use colored::Colorize;
use twinsync_core::{SqliteStatus, StatusStore};

use crate::config::Config;

#[derive(Debug, Clone, Default)]
pub struct CmdStatus {
    pub pairs: Vec<String>,
    pub long: bool,
}

impl CmdStatus {
    pub const NAME: &str = "status";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Show what the status store remembers about each pair")
            .arg(arg!([PAIR] ... "Pairs to show, all of them by default"))
            .arg(arg!(-l --long "Show the href on both sides next to each UID"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            pairs: matches
                .get_many::<String>("PAIR")
                .map(|pairs| pairs.cloned().collect())
                .unwrap_or_default(),
            long: matches.get_flag("long"),
        }
    }

    pub async fn run(self, config: &Config) -> Result<(), Box<dyn Error>> {
        for name in config.select_pairs(&self.pairs)? {
            let path = config.status_db(&name)?;
            if !path.exists() {
                println!("{}: {}", name.bold(), "never synchronized".dimmed());
                continue;
            }

            tracing::debug!(pair = %name, path = %path.display(), "reading status database");
            let status = SqliteStatus::open(Some(&path)).await?;
            let records = status.snapshot().await;
            status.close().await;
            let records = records?;

            println!("{}: {} item(s)", name.bold(), records.len());
            for (uid, record) in &records {
                if self.long {
                    println!("  {uid}  a={}  b={}", record.a.href, record.b.href);
                } else {
                    println!("  {uid}");
                }
            }
        }
        Ok(())
    }
}
