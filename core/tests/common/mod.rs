// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - Test data factories (fixtures)
//! - Storage and status doubles that inject faults
//! - Temporary directory management with auto-cleanup

mod faults;
mod fixtures;
mod temp_dir;

#[allow(unused_imports)]
pub use assertions::{assert_converged, outcomes};
#[allow(unused_imports)]
pub use faults::{Fault, FlakyStatus, FlakyStorage, RecordingHook};
#[allow(unused_imports)]
pub use fixtures::{MemoryPair, vcard, vevent};
#[allow(unused_imports)]
pub use temp_dir::{TempDirs, setup_temp_dirs};
