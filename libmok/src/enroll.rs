// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Enrollment and unenrollment workflows.
//!
//! Each workflow is a strict sequence of external steps. A failed step
//! aborts the workflow with the tool's captured diagnostics; completed
//! steps are never rolled back.

use crate::config::{CleanupPolicy, Config};
use crate::credential::Credential;
use crate::error::Error;
use crate::invoke;
use fs_err as fs;
use log::{info, warn};

/// Report from a completed workflow operation: one user-visible line
/// per finished stage, in order.
#[derive(Debug)]
pub struct Outcome {
    pub messages: Vec<String>,

    /// Failure from the post-unenroll trust-store scrub. When set, the
    /// unenrollment itself still succeeded and is not rolled back.
    pub cleanup_error: Option<Error>,
}

impl Outcome {
    /// True when every stage, including cleanup, succeeded.
    pub fn fully_succeeded(&self) -> bool {
        self.cleanup_error.is_none()
    }
}

/// Generate a signing key and enroll its public half in the MOK list.
///
/// The generation tool deposits the public key at the well-known path
/// in the trust store; the enrollment tool then imports that file,
/// reading the password and its confirmation from stdin. Enrollment
/// does not run if generation fails.
pub fn create_and_enroll(config: &Config, credential: &Credential) -> Result<Outcome, Error> {
    let generate = invoke::run_captured(config.kmodgenca(), &["-a"])?;
    if !generate.success() {
        return Err(Error::Tool {
            tool: invoke::tool_name(config.kmodgenca()),
            stderr: generate.stderr,
        });
    }

    let key_path = config.public_key_path();
    info!("signing key created at {key_path}");

    let import = invoke::run_with_password(
        config.mokutil(),
        &["--import", key_path.as_str()],
        credential,
    )?;
    if !import.success() {
        // The generated key stays on disk; importing it again does not
        // require regenerating it.
        warn!("signing key at {key_path} was created but not enrolled");
        return Err(Error::Tool {
            tool: invoke::tool_name(config.mokutil()),
            stderr: import.stderr,
        });
    }

    Ok(Outcome {
        messages: vec![
            format!("Signing key created at {key_path}."),
            "Key successfully enrolled. Reboot to complete.".to_owned(),
        ],
        cleanup_error: None,
    })
}

/// Remove the signing key from the MOK list, then scrub the trust
/// store.
///
/// The scrub only runs if the deletion tool reported success, and a
/// scrub failure is reported separately in the outcome rather than as
/// an error: the unenrollment has already happened and is not undone.
pub fn unenroll(config: &Config, credential: &Credential) -> Result<Outcome, Error> {
    let key_path = config.public_key_path();
    let delete = invoke::run_with_password(
        config.mokutil(),
        &["--delete", key_path.as_str()],
        credential,
    )?;
    if !delete.success() {
        return Err(Error::Tool {
            tool: invoke::tool_name(config.mokutil()),
            stderr: delete.stderr,
        });
    }

    let mut messages = vec!["Key successfully unenrolled. Reboot to complete.".to_owned()];
    let cleanup_error = match scrub_trust_store(config) {
        Ok(()) => {
            messages.push(format!("All key files removed from {}.", config.certs_dir()));
            None
        }
        Err(err) => {
            warn!("trust-store cleanup failed: {err}");
            Some(err)
        }
    };

    Ok(Outcome {
        messages,
        cleanup_error,
    })
}

/// Remove every entry of the trust-store directory. Files and symlinks
/// are unlinked; subdirectories are removed per the configured policy.
fn scrub_trust_store(config: &Config) -> Result<(), Error> {
    let dir = config.certs_dir();
    let dir_err = |source| Error::Cleanup {
        path: dir.as_std_path().to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir.as_std_path()).map_err(dir_err)? {
        let entry = entry.map_err(dir_err)?;
        let path = entry.path();
        let entry_err = |source| Error::Cleanup {
            path: path.clone(),
            source,
        };

        let file_type = entry.file_type().map_err(entry_err)?;
        if file_type.is_dir() {
            match config.cleanup() {
                CleanupPolicy::Flat => fs::remove_dir(&path),
                CleanupPolicy::Recursive => fs::remove_dir_all(&path),
            }
        } else {
            fs::remove_file(&path)
        }
        .map_err(entry_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use anyhow::Result;
    use camino::{Utf8Path, Utf8PathBuf};
    use tempfile::TempDir;

    fn test_credential() -> Credential {
        Credential::new("Secret123", "Secret123").unwrap()
    }

    /// Fake mokutil that records its arguments and stdin, then exits
    /// with `exit_code`.
    fn fake_mokutil(tmp: &Utf8Path, exit_code: u8, stderr: &str) -> Result<Utf8PathBuf> {
        let mut body = format!("echo \"$@\" >> {tmp}/mokutil_args\ncat >> {tmp}/mokutil_stdin\n");
        if !stderr.is_empty() {
            body += &format!("echo '{stderr}' >&2\n");
        }
        body += &format!("exit {exit_code}");
        testutil::write_script(tmp, "mokutil", &body)
    }

    /// Fake kmodgenca that deposits the public key artifact.
    fn fake_kmodgenca(tmp: &Utf8Path, certs_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        testutil::write_script(tmp, "kmodgenca", &format!("touch {certs_dir}/public_key.der"))
    }

    fn workflow_config(
        tmp: &Utf8Path,
        certs_dir: &Utf8Path,
        mokutil: &Utf8Path,
        kmodgenca: &Utf8Path,
        cleanup: &str,
    ) -> Result<Config> {
        testutil::load_config(
            tmp,
            &format!(
                "certs_dir = \"{certs_dir}\"\n\
                 cleanup = \"{cleanup}\"\n\
                 mokutil = \"{mokutil}\"\n\
                 kmodgenca = \"{kmodgenca}\"\n"
            ),
        )
    }

    #[test]
    fn test_create_and_enroll() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;

        let mokutil = fake_mokutil(&tmp, 0, "")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let outcome = create_and_enroll(&config, &test_credential())?;
        assert!(outcome.fully_succeeded());
        assert_eq!(
            outcome.messages,
            [
                format!("Signing key created at {certs_dir}/public_key.der."),
                "Key successfully enrolled. Reboot to complete.".to_owned(),
            ]
        );

        // The enrollment tool was given the artifact path and the
        // password twice on stdin.
        assert_eq!(
            fs::read_to_string(tmp.join("mokutil_args"))?.trim_end(),
            format!("--import {certs_dir}/public_key.der")
        );
        assert_eq!(
            fs::read_to_string(tmp.join("mokutil_stdin"))?,
            "Secret123\nSecret123\n"
        );
        Ok(())
    }

    #[test]
    fn test_generation_failure_skips_enrollment() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;

        let mokutil = fake_mokutil(&tmp, 0, "")?;
        let kmodgenca =
            testutil::write_script(&tmp, "kmodgenca", "echo 'CA generation failed' >&2\nexit 1")?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let err = create_and_enroll(&config, &test_credential()).unwrap_err();
        match err {
            Error::Tool { tool, stderr } => {
                assert_eq!(tool, "kmodgenca");
                assert!(stderr.contains("CA generation failed"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // The enrollment step never ran.
        assert!(!tmp.join("mokutil_args").exists());
        Ok(())
    }

    #[test]
    fn test_enrollment_failure_surfaces_stderr() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;

        let mokutil = fake_mokutil(&tmp, 1, "wrong PIN")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let err = create_and_enroll(&config, &test_credential()).unwrap_err();
        assert!(err.to_string().contains("wrong PIN"));

        // The generated artifact is left in place for a manual retry.
        assert!(certs_dir.join("public_key.der").exists());
        Ok(())
    }

    #[test]
    fn test_unenroll() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;
        fs::write(certs_dir.join("public_key.der"), "key")?;
        fs::write(certs_dir.join("private_key.priv"), "key")?;
        std::os::unix::fs::symlink("public_key.der", certs_dir.join("key.link"))?;
        fs::create_dir(certs_dir.join("backup"))?;

        let mokutil = fake_mokutil(&tmp, 0, "")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let outcome = unenroll(&config, &test_credential())?;
        assert!(outcome.fully_succeeded());
        assert_eq!(
            outcome.messages,
            [
                "Key successfully unenrolled. Reboot to complete.".to_owned(),
                format!("All key files removed from {certs_dir}."),
            ]
        );
        assert_eq!(
            fs::read_to_string(tmp.join("mokutil_args"))?.trim_end(),
            format!("--delete {certs_dir}/public_key.der")
        );
        assert_eq!(
            fs::read_to_string(tmp.join("mokutil_stdin"))?,
            "Secret123\nSecret123\n"
        );

        // Files, the symlink, and the empty subdirectory are all gone.
        assert_eq!(fs::read_dir(certs_dir.as_std_path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_deletion_failure_skips_cleanup() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;
        fs::write(certs_dir.join("public_key.der"), "key")?;

        let mokutil = fake_mokutil(&tmp, 1, "Failed to unenroll new keys")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let err = unenroll(&config, &test_credential()).unwrap_err();
        assert!(err.to_string().contains("Failed to unenroll new keys"));

        // The trust store was not touched.
        assert!(certs_dir.join("public_key.der").exists());
        Ok(())
    }

    #[test]
    fn test_flat_cleanup_reports_non_empty_subdir() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;
        fs::create_dir(certs_dir.join("backup"))?;
        fs::write(certs_dir.join("backup/old_key.der"), "key")?;

        let mokutil = fake_mokutil(&tmp, 0, "")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let outcome = unenroll(&config, &test_credential())?;

        // The unenrollment succeeded and is reported; the cleanup
        // failure is reported distinctly.
        assert_eq!(
            outcome.messages,
            ["Key successfully unenrolled. Reboot to complete."]
        );
        assert!(matches!(outcome.cleanup_error, Some(Error::Cleanup { .. })));
        assert!(certs_dir.join("backup/old_key.der").exists());
        Ok(())
    }

    #[test]
    fn test_recursive_cleanup_removes_subdirs() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;
        fs::create_dir(certs_dir.join("backup"))?;
        fs::write(certs_dir.join("backup/old_key.der"), "key")?;

        let mokutil = fake_mokutil(&tmp, 0, "")?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "recursive")?;

        let outcome = unenroll(&config, &test_credential())?;
        assert!(outcome.fully_succeeded());
        assert_eq!(fs::read_dir(certs_dir.as_std_path())?.count(), 0);
        Ok(())
    }

    /// A second unenroll after the trust store has been emptied fails
    /// in the deletion tool, not in the controller, and skips cleanup.
    #[test]
    fn test_unenroll_twice() -> Result<()> {
        let tmp_dir = TempDir::new()?;
        let tmp = testutil::tmp_path(&tmp_dir);
        let certs_dir = tmp.join("certs");
        fs::create_dir(&certs_dir)?;
        fs::write(certs_dir.join("public_key.der"), "key")?;

        // Fake mokutil that only succeeds while the key file exists,
        // like the real `--delete`.
        let key_path = certs_dir.join("public_key.der");
        let mokutil = testutil::write_script(
            &tmp,
            "mokutil",
            &format!(
                "cat > /dev/null\n\
                 if [ -e {key_path} ]; then exit 0; fi\n\
                 echo 'Failed to unenroll new keys' >&2\n\
                 exit 1"
            ),
        )?;
        let kmodgenca = fake_kmodgenca(&tmp, &certs_dir)?;
        let config = workflow_config(&tmp, &certs_dir, &mokutil, &kmodgenca, "flat")?;

        let first = unenroll(&config, &test_credential())?;
        assert!(first.fully_succeeded());

        let err = unenroll(&config, &test_credential()).unwrap_err();
        match err {
            Error::Tool { tool, stderr } => {
                assert_eq!(tool, "mokutil");
                assert!(stderr.contains("Failed to unenroll new keys"));
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }
}
