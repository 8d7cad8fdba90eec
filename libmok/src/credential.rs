// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::{error, fmt};
use zeroize::Zeroize;

/// Reason a password pair was rejected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// The password and its confirmation differ.
    Mismatch,

    /// The password is empty.
    Empty,

    /// The password contains a character outside `[A-Za-z0-9]`.
    InvalidCharacters,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            ValidationError::Mismatch => "Passwords do not match.",
            ValidationError::Empty => "Password cannot be empty.",
            ValidationError::InvalidCharacters => {
                "Password must only contain upper case letters, \
                 lower case letters, and numbers."
            }
        };
        f.write_str(msg)
    }
}

impl error::Error for ValidationError {}

/// A validated enrollment password.
///
/// Construction enforces the password rules, so holders can assume the
/// contained secret is well-formed. The buffer is zeroed on drop and
/// excluded from `Debug` output; it leaves the process only through an
/// external tool's piped standard input.
pub struct Credential(String);

impl Credential {
    /// Validate a password and its confirmation.
    pub fn new(password: &str, confirm: &str) -> Result<Credential, ValidationError> {
        if password != confirm {
            return Err(ValidationError::Mismatch);
        }
        if password.is_empty() {
            return Err(ValidationError::Empty);
        }
        if !password.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidCharacters);
        }
        Ok(Credential(password.to_owned()))
    }

    /// The raw secret, for writing to a tool's stdin.
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Credential(..)")
    }
}
