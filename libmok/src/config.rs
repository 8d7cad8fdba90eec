// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::error::Error;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;

/// How the trust-store directory is scrubbed after an unenrollment.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Remove files, symlinks, and empty subdirectories. A non-empty
    /// subdirectory makes the cleanup fail.
    Flat,

    /// Remove subdirectories recursively.
    Recursive,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    certs_dir: Utf8PathBuf,
    cleanup: CleanupPolicy,
    mokutil: Utf8PathBuf,
    kmodgenca: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            certs_dir: "/etc/pki/akmods/certs".into(),
            cleanup: CleanupPolicy::Flat,
            mokutil: "mokutil".into(),
            kmodgenca: "/usr/sbin/kmodgenca".into(),
        }
    }
}

/// Default path of the config file.
pub fn config_path() -> Utf8PathBuf {
    Utf8PathBuf::from("/etc/mokman.toml")
}

impl Config {
    /// Load the config file at `path`. A missing file is not an error;
    /// the defaults are used in that case.
    pub fn load(path: &Utf8Path) -> Result<Config, Error> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let src = fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_owned(),
            source,
        })?;
        Config::parse(&src, path)
    }

    fn parse(src: &str, path: &Utf8Path) -> Result<Config, Error> {
        toml::from_str(src).map_err(|source| Error::ParseConfig {
            path: path.to_owned(),
            source,
        })
    }

    /// Trust-store directory holding the generated key material.
    pub fn certs_dir(&self) -> &Utf8Path {
        &self.certs_dir
    }

    /// Path of the public key artifact that the generation tool
    /// deposits and the enrollment tools operate on.
    pub fn public_key_path(&self) -> Utf8PathBuf {
        self.certs_dir.join("public_key.der")
    }

    pub fn cleanup(&self) -> CleanupPolicy {
        self.cleanup
    }

    /// Program used to query the firmware state and edit the MOK list.
    pub fn mokutil(&self) -> &Utf8Path {
        &self.mokutil
    }

    /// Program used to generate the signing key.
    pub fn kmodgenca(&self) -> &Utf8Path {
        &self.kmodgenca
    }
}
