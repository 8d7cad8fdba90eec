// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::credential::ValidationError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    /// The firmware reports Secure Boot as anything other than
    /// enabled. The enrollment workflow is meaningless in that state,
    /// so callers treat this as fatal.
    SecureBootDisabled { state: String },

    /// The password pair was rejected before any external step ran.
    Validation(ValidationError),

    /// An external tool could not be started at all.
    Spawn { tool: String, detail: String },

    /// An external tool ran and exited unsuccessfully. `stderr` holds
    /// its captured diagnostics, unmodified.
    Tool { tool: String, stderr: String },

    /// Removing an entry of the trust-store directory failed. The
    /// unenrollment that preceded the cleanup is not rolled back.
    Cleanup { path: PathBuf, source: io::Error },

    /// The config file exists but could not be read.
    ReadConfig { path: Utf8PathBuf, source: io::Error },

    /// The config file is not valid TOML or sets unknown fields.
    ParseConfig {
        path: Utf8PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            SecureBootDisabled { state } => {
                write!(f, "Secure Boot is not enabled: {state}")
            }

            Validation(err) => write!(f, "{err}"),

            Spawn { tool, detail } => {
                write!(f, "failed to run {tool}: {detail}")
            }

            Tool { tool, stderr } => {
                write!(f, "{tool} failed: {}", stderr.trim_end())
            }

            Cleanup { path, source } => {
                write!(f, "failed to remove {}: {source}", path.display())
            }

            ReadConfig { path, source } => {
                write!(f, "failed to read config at {path}: {source}")
            }

            ParseConfig { path, source } => {
                write!(f, "invalid config at {path}: {source}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Validation(err) => Some(err),
            Error::Cleanup { source, .. } => Some(source),
            Error::ReadConfig { source, .. } => Some(source),
            Error::ParseConfig { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}
