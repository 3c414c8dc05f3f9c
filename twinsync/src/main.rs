// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! twinsync - two-way synchronization of calendars and address books

use std::process::ExitCode;

use twinsync_cli::run;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}
