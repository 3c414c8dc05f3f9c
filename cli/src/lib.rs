// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line interface of twinsync.

mod cli;
mod cmd_generate_completion;
mod cmd_status;
mod cmd_sync;
mod config;
mod pair;

pub use crate::cli::{Cli, Commands, run};
pub use crate::config::{Config, parse_config};
