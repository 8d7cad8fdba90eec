// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::credential::Credential;
use crate::error::Error;
use camino::Utf8Path;
use command_run::Command;
use std::io::Write;
use std::process::{self, Stdio};
use zeroize::Zeroizing;

/// Exit status and captured output of one external tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Name used for a tool in error messages.
pub fn tool_name(program: &Utf8Path) -> String {
    program.file_name().unwrap_or(program.as_str()).to_owned()
}

/// Run a tool with stdout and stderr captured. A non-zero exit is not
/// an error at this level; callers inspect the returned status.
pub fn run_captured(program: &Utf8Path, args: &[&str]) -> Result<ToolOutput, Error> {
    let mut cmd = Command::with_args(program.as_str(), args);
    cmd.enable_capture();
    cmd.check = false;
    let output = cmd.run().map_err(|err| Error::Spawn {
        tool: tool_name(program),
        detail: err.to_string(),
    })?;
    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run a tool that prompts for a password and a confirmation on its
/// standard input. The password is written twice, then stdin is closed.
pub fn run_with_password(
    program: &Utf8Path,
    args: &[&str],
    credential: &Credential,
) -> Result<ToolOutput, Error> {
    let mut child = process::Command::new(program.as_std_path())
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| Error::Spawn {
            tool: tool_name(program),
            detail: err.to_string(),
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        let secret = credential.expose();
        let input = Zeroizing::new(format!("{secret}\n{secret}\n"));
        // The tool may exit without reading the prompt (for example
        // when the key it operates on does not exist). The exit status
        // below is the failure signal in that case, not the pipe error.
        let _ = stdin.write_all(input.as_bytes());
    }

    let output = child.wait_with_output().map_err(|err| Error::Spawn {
        tool: tool_name(program),
        detail: err.to_string(),
    })?;
    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
