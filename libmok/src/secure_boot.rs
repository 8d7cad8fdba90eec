// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::config::Config;
use crate::error::Error;
use crate::invoke;
use log::info;

/// Marker in the state-query tool's output when Secure Boot is active.
pub const ENABLED_MARKER: &str = "SecureBoot enabled";

/// Query the firmware Secure Boot state and return the tool's report.
pub fn state_text(config: &Config) -> Result<String, Error> {
    let output = invoke::run_captured(config.mokutil(), &["--sb-state"])?;
    if !output.success() {
        return Err(Error::Tool {
            tool: invoke::tool_name(config.mokutil()),
            stderr: output.stderr,
        });
    }
    Ok(output.stdout.trim().to_owned())
}

/// Check that Secure Boot is enabled.
///
/// The enrollment workflow is meaningless without it, so callers treat
/// a failure here as fatal.
pub fn check_enabled(config: &Config) -> Result<(), Error> {
    let state = state_text(config)?;
    if state.contains(ENABLED_MARKER) {
        info!("{state}");
        Ok(())
    } else {
        Err(Error::SecureBootDisabled { state })
    }
}
