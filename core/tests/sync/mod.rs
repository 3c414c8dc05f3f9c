// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end synchronization tests for the twinsync-core crate.
//!
//! These tests validate complete runs: planning, conflict handling, partial
//! failure, safety checks and persistence of the status across runs.

mod filesystem;
mod lifecycle;
mod safety;
