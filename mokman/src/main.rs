// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use anyhow::{anyhow, Error};
use argh::FromArgs;
use camino::Utf8PathBuf;
use fehler::{throw, throws};
use libmok::{config_path, enroll, secure_boot, Config, Credential};
use log::info;
use std::io::{self, Write};
use zeroize::{Zeroize, Zeroizing};

/// Manage a Secure Boot signing key with mokutil.
#[derive(FromArgs, PartialEq, Debug)]
struct Opt {
    /// path of the config file
    #[argh(option)]
    config: Option<Utf8PathBuf>,

    /// action to run
    #[argh(subcommand)]
    action: Action,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum Action {
    Status(StatusAction),
    Enroll(EnrollAction),
    Unenroll(UnenrollAction),
}

/// Show the firmware Secure Boot state.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "status")]
struct StatusAction {}

/// Create a signing key and enroll it in the MOK list.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "enroll")]
struct EnrollAction {}

/// Unenroll the signing key and remove the key files.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "unenroll")]
struct UnenrollAction {}

const ENROLL_NOTICE: &str = "\
Warning: Enrolling a self-signed key for Secure Boot carries certain risks.

1. If the key is compromised, it could allow malicious software to bypass
   Secure Boot protections.
2. Ensure the key is stored securely and only enroll keys from trusted
   sources.
3. If you're not familiar with the implications of using a self-signed key,
   seek advice from a knowledgeable source.

Password Requirements: Use only upper case letters, lower case letters, and
numbers. Do not use symbols or special characters.
";

#[throws]
fn prompt_line(prompt: &str) -> Zeroizing<String> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let entry = Zeroizing::new(line.trim_end().to_owned());
    line.zeroize();
    entry
}

/// Read the password and its confirmation, and validate the pair.
#[throws]
fn read_credential() -> Credential {
    let password = prompt_line("Password: ")?;
    let confirm = prompt_line("Confirm Password: ")?;
    Credential::new(password.as_str(), confirm.as_str()).map_err(libmok::Error::from)?
}

#[throws]
fn run_status(config: &Config) {
    let state = secure_boot::state_text(config)?;
    println!("{state}");
}

#[throws]
fn run_enroll(config: &Config) {
    secure_boot::check_enabled(config)?;

    println!("{ENROLL_NOTICE}");
    let credential = read_credential()?;

    let outcome = enroll::create_and_enroll(config, &credential)?;
    for line in &outcome.messages {
        println!("{line}");
    }
}

#[throws]
fn run_unenroll(config: &Config) {
    secure_boot::check_enabled(config)?;

    let credential = read_credential()?;

    let outcome = enroll::unenroll(config, &credential)?;
    for line in &outcome.messages {
        println!("{line}");
    }
    if let Some(err) = outcome.cleanup_error {
        throw!(anyhow!("Failed to delete files. Reason: {err}"));
    }
}

#[throws]
fn main() {
    env_logger::init();

    let opt: Opt = argh::from_env();
    let default_config = config_path();
    let config_file = opt.config.as_deref().unwrap_or(&default_config);
    let config = Config::load(config_file)?;
    info!("using config {config_file}");

    match &opt.action {
        Action::Status(_) => run_status(&config),
        Action::Enroll(_) => run_enroll(&config),
        Action::Unenroll(_) => run_unenroll(&config),
    }?;
}
