// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Workflow controller for Secure Boot MOK signing keys.
//!
//! Everything cryptographic is delegated to external system utilities:
//! `kmodgenca` generates the signing key, and `mokutil` queries the
//! firmware Secure Boot state and edits the MOK list. This crate only
//! validates the enrollment password, sequences those tools, and maps
//! their exit codes and captured output to user-visible results.

mod config;
mod credential;
pub mod enroll;
mod error;
mod invoke;
pub mod secure_boot;

pub use config::{config_path, CleanupPolicy, Config};
pub use credential::{Credential, ValidationError};
pub use error::Error;
