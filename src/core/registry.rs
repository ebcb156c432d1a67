//! Container registry publishing: logout, login, build, push.
//!
//! The external container CLI sits behind [`RegistryClient`] so the
//! publish policy can be tested against a fake. The login secret is read
//! from the credential file and handed over stdin; it never appears in
//! argv or in echoed commands.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::utils::command;

/// Operations bedrockup needs from the container tooling.
pub trait RegistryClient {
    fn logout(&self) -> Result<()>;
    fn login(&self, username: &str, secret: &[u8]) -> Result<()>;
    fn build(&self, image: &str) -> Result<()>;
    fn push(&self, image: &str) -> Result<()>;
}

/// [`RegistryClient`] backed by the local `docker` CLI.
pub struct DockerClient;

impl RegistryClient for DockerClient {
    fn logout(&self) -> Result<()> {
        command::run("docker", &["logout"], "docker logout")
            .map_err(|e| Error::registry_command_failed("docker logout", e.to_string()))?;
        Ok(())
    }

    fn login(&self, username: &str, secret: &[u8]) -> Result<()> {
        command::run_with_stdin(
            "docker",
            &["login", "-u", username, "--password-stdin"],
            secret,
            "docker login",
        )
        .map_err(|e| Error::registry_command_failed("docker login", e.to_string()))?;
        Ok(())
    }

    fn build(&self, image: &str) -> Result<()> {
        command::run("docker", &["build", "-t", image, "."], "docker build")
            .map_err(|e| Error::registry_command_failed("docker build", e.to_string()))?;
        Ok(())
    }

    fn push(&self, image: &str) -> Result<()> {
        command::run("docker", &["push", image], "docker push")
            .map_err(|e| Error::registry_command_failed("docker push", e.to_string()))?;
        Ok(())
    }
}

/// Read the registry secret as raw bytes. No trailing-newline trimming:
/// the file content is the password.
pub fn read_credential(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(Error::credential_file_missing(path.to_string_lossy()))
        }
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some(format!("read {}", path.display())),
        )),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub image: String,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn best_effort_logout(registry: &dyn RegistryClient) {
    if let Err(e) = registry.logout() {
        log_status!("publish", "logout failed: {} (continuing)", e);
    }
}

/// Logs out on drop, so the cleanup runs on every exit path of the
/// publish sequence.
struct LogoutGuard<'a> {
    registry: &'a dyn RegistryClient,
}

impl Drop for LogoutGuard<'_> {
    fn drop(&mut self) {
        best_effort_logout(self.registry);
    }
}

/// Publish the image: pre-logout, login, build, push, final logout.
///
/// A missing credential file is irrecoverable and propagates. Tool
/// failures (login, build, push) fold into an unsuccessful report so the
/// pipeline can continue with its non-fatal policy. Logout runs exactly
/// twice on every path.
pub fn publish(
    registry: &dyn RegistryClient,
    username: &str,
    image: &str,
    credential_file: &Path,
) -> Result<PublishReport> {
    // Ambient login state from previous runs is cleared up front.
    best_effort_logout(registry);
    let _cleanup = LogoutGuard { registry };

    let secret = read_credential(credential_file)?;

    log_status!("publish", "Logging in as {} (password via stdin)", username);
    let outcome = registry
        .login(username, &secret)
        .and_then(|_| {
            log_status!("publish", "Building {}", image);
            registry.build(image)
        })
        .and_then(|_| {
            log_status!("publish", "Pushing {}", image);
            registry.push(image)
        });

    match outcome {
        Ok(()) => Ok(PublishReport {
            image: image.to_string(),
            published: true,
            error: None,
        }),
        Err(e) => {
            log_status!("publish", "Publish failed: {}", e);
            Ok(PublishReport {
                image: image.to_string(),
                published: false,
                error: Some(e.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRegistry {
        calls: RefCell<Vec<String>>,
        fail_logout: bool,
        fail_login: bool,
        fail_build: bool,
        fail_push: bool,
        seen_secret: RefCell<Option<Vec<u8>>>,
    }

    impl RecordingRegistry {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl RegistryClient for RecordingRegistry {
        fn logout(&self) -> Result<()> {
            self.calls.borrow_mut().push("logout".to_string());
            if self.fail_logout {
                return Err(Error::registry_command_failed("docker logout", "not logged in"));
            }
            Ok(())
        }

        fn login(&self, _username: &str, secret: &[u8]) -> Result<()> {
            self.calls.borrow_mut().push("login".to_string());
            *self.seen_secret.borrow_mut() = Some(secret.to_vec());
            if self.fail_login {
                return Err(Error::registry_command_failed("docker login", "denied"));
            }
            Ok(())
        }

        fn build(&self, _image: &str) -> Result<()> {
            self.calls.borrow_mut().push("build".to_string());
            if self.fail_build {
                return Err(Error::registry_command_failed("docker build", "boom"));
            }
            Ok(())
        }

        fn push(&self, _image: &str) -> Result<()> {
            self.calls.borrow_mut().push("push".to_string());
            if self.fail_push {
                return Err(Error::registry_command_failed("docker push", "boom"));
            }
            Ok(())
        }
    }

    fn credential_file(content: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pass");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn successful_publish_runs_full_sequence() {
        let (_dir, pass) = credential_file(b"hunter2\n");
        let registry = RecordingRegistry::default();
        let report = publish(&registry, "alice", "alice/srv", &pass).unwrap();
        assert!(report.published);
        assert_eq!(registry.calls(), ["logout", "login", "build", "push", "logout"]);
    }

    #[test]
    fn secret_bytes_are_passed_verbatim() {
        let (_dir, pass) = credential_file(b"p@ss\nword\n");
        let registry = RecordingRegistry::default();
        publish(&registry, "alice", "alice/srv", &pass).unwrap();
        assert_eq!(
            registry.seen_secret.borrow().as_deref(),
            Some(b"p@ss\nword\n".as_slice())
        );
    }

    #[test]
    fn login_failure_is_unsuccessful_but_still_cleans_up() {
        let (_dir, pass) = credential_file(b"x");
        let registry = RecordingRegistry {
            fail_login: true,
            ..Default::default()
        };
        let report = publish(&registry, "alice", "alice/srv", &pass).unwrap();
        assert!(!report.published);
        assert!(report.error.is_some());
        assert_eq!(registry.calls(), ["logout", "login", "logout"]);
    }

    #[test]
    fn push_failure_is_unsuccessful_but_still_cleans_up() {
        let (_dir, pass) = credential_file(b"x");
        let registry = RecordingRegistry {
            fail_push: true,
            ..Default::default()
        };
        let report = publish(&registry, "alice", "alice/srv", &pass).unwrap();
        assert!(!report.published);
        assert_eq!(registry.calls(), ["logout", "login", "build", "push", "logout"]);
    }

    #[test]
    fn missing_credential_file_propagates_after_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let registry = RecordingRegistry::default();
        let err = publish(
            &registry,
            "alice",
            "alice/srv",
            &dir.path().join("nope"),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::CredentialFileMissing);
        // Both logouts still happen: the ambient cleanup and the guard.
        assert_eq!(registry.calls(), ["logout", "logout"]);
    }

    #[test]
    fn logout_failures_are_swallowed() {
        let (_dir, pass) = credential_file(b"x");
        let registry = RecordingRegistry {
            fail_logout: true,
            ..Default::default()
        };
        let report = publish(&registry, "alice", "alice/srv", &pass).unwrap();
        assert!(report.published);
    }

    #[test]
    fn read_credential_missing_file_is_typed() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_credential(&dir.path().join("absent")).unwrap_err();
        assert_eq!(err.code, ErrorCode::CredentialFileMissing);
    }

    #[test]
    fn read_credential_returns_raw_bytes() {
        let (_dir, pass) = credential_file(b"trailing newline kept\n");
        assert_eq!(read_credential(&pass).unwrap(), b"trailing newline kept\n");
    }
}
