// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::error::Error;
use std::fmt::Write as _;

use clap::{ArgMatches, Command, arg};
use colored::Colorize;
use twinsync_core::{
    AbortHandle, Action, Duplicate, Outcome, Plan, Resolution, RunStatus, SkipReason, SyncReport,
};

use crate::config::Config;
use crate::pair::Pair;

#[derive(Debug, Clone, Default)]
pub struct CmdSync {
    pub pairs: Vec<String>,
    pub dry_run: bool,
    pub force_delete: bool,
}

impl CmdSync {
    pub const NAME: &str = "sync";

    pub fn command() -> Command {
        Command::new(Self::NAME)
            .about("Synchronize the configured pairs")
            .arg(arg!([PAIR] ... "Pairs to synchronize, all of them by default"))
            .arg(arg!(--"dry-run" "Show what would be done without writing anything"))
            .arg(arg!(--"force-delete" "Allow deleting every item when one side was emptied"))
    }

    pub fn from(matches: &ArgMatches) -> Self {
        Self {
            pairs: matches
                .get_many::<String>("PAIR")
                .map(|pairs| pairs.cloned().collect())
                .unwrap_or_default(),
            dry_run: matches.get_flag("dry-run"),
            force_delete: matches.get_flag("force-delete"),
        }
    }

    /// Runs every selected pair in turn and tells whether all ended clean.
    #[tracing::instrument(skip_all, fields(pairs = ?self.pairs))]
    pub async fn run(self, config: &Config, abort: AbortHandle) -> Result<bool, Box<dyn Error>> {
        let mut clean = true;
        for name in config.select_pairs(&self.pairs)? {
            if abort.is_aborted() {
                tracing::warn!(pair = %name, "not started, aborted");
                clean = false;
                continue;
            }

            let pair = match Pair::open(config, &name, self.force_delete, abort.clone()).await {
                Ok(pair) => pair,
                Err(e) => {
                    println!("{} {}: {}", "Error:".red(), name.bold(), e);
                    clean = false;
                    continue;
                }
            };
            let result = if self.dry_run {
                pair.synchronizer
                    .plan()
                    .await
                    .map(|plan| println!("{}", format_plan(&name, &plan)))
            } else {
                pair.synchronizer.run().await.map(|report| {
                    println!("{}", format_report(&name, &report));
                    clean &= report.status() == RunStatus::Clean;
                })
            };
            pair.close().await;

            if let Err(e) = result {
                println!("{} {}: {}", "Error:".red(), name.bold(), e);
                clean = false;
            }
        }
        Ok(clean)
    }
}

fn format_plan(name: &str, plan: &Plan) -> String {
    let mut out = format!("{} {}", "Plan for".bold(), name.bold());
    for entry in plan.entries.iter().filter(|e| e.action != Action::Unchanged) {
        let action = match &entry.resolution {
            Some(Resolution::Resolved(action)) => {
                format!("{} -> {action}", entry.action).yellow().to_string()
            }
            Some(Resolution::Unresolved(reason)) => {
                format!("{} ({reason})", entry.action).red().to_string()
            }
            None => entry.action.to_string(),
        };
        let _ = write!(out, "\n  {}  {action}", entry.uid);
    }
    for uid in &plan.stale {
        let _ = write!(out, "\n  {uid}  {}", "forget".dimmed());
    }
    write_duplicates(&mut out, &plan.duplicates);
    let _ = write!(out, "\n  {} change(s)", plan.actions());
    out
}

fn format_report(name: &str, report: &SyncReport) -> String {
    let status = report.status();
    let status_text = match status {
        RunStatus::Clean => status.to_string().green(),
        RunStatus::CompletedWithErrors => status.to_string().yellow(),
        RunStatus::Aborted => status.to_string().red(),
    };
    let mut out = format!("{} {}", name.bold(), status_text);

    for entry in &report.entries {
        let outcome = match &entry.outcome {
            Outcome::Skipped(SkipReason::Unchanged | SkipReason::ContentUnchanged) => continue,
            o @ Outcome::Applied(_) => o.to_string().green(),
            o @ Outcome::Skipped(_) => o.to_string().yellow(),
            o @ Outcome::Failed(_) => o.to_string().red(),
        };
        let _ = write!(out, "\n  {}  {outcome}", entry.uid);
    }
    write_duplicates(&mut out, &report.duplicates);

    let c = report.counts();
    let _ = write!(
        out,
        "\n  created {}, updated {}, deleted {}, conflicted {}, failed {}, unchanged {}, skipped {}",
        c.created, c.updated, c.deleted, c.conflicted, c.failed, c.unchanged, c.skipped
    );
    out
}

fn write_duplicates(out: &mut String, duplicates: &[Duplicate]) {
    for dup in duplicates {
        let hrefs: Vec<_> = dup.hrefs.iter().map(|h| h.as_str()).collect();
        let _ = write!(
            out,
            "\n  {}  {} on {}: {}",
            dup.uid,
            "duplicate".red(),
            dup.side,
            hrefs.join(", ")
        );
    }
}
