//! SSH key pair generation for new hosts.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// Produces a key pair at a given path and hands back the public half.
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self, private_key: &Path) -> Result<String>;
}

/// Where the public half of `private_key` is written.
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = OsString::from(private_key.as_os_str());
    path.push(".pub");
    PathBuf::from(path)
}

/// Shells out to `ssh-keygen` for a passphrase-less 2048 bit RSA key.
#[derive(Debug, Clone, Default)]
pub struct SshKeygen;

#[async_trait]
impl KeyGenerator for SshKeygen {
    async fn generate(&self, private_key: &Path) -> Result<String> {
        let public_key = public_key_path(private_key);

        // ssh-keygen prompts before overwriting.
        for stale in [private_key, public_key.as_path()] {
            match tokio::fs::remove_file(stale).await {
                Ok(()) => debug!(path = %stale.display(), "removed stale key file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(dir) = private_key.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        debug!(path = %private_key.display(), "generating ssh key");

        let output = Command::new("ssh-keygen")
            .args(["-t", "rsa", "-b", "2048", "-N", "", "-q", "-f"])
            .arg(private_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::SshKey(format!("failed to run ssh-keygen: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::SshKey(stderr.trim().to_string()));
        }

        let key = tokio::fs::read_to_string(&public_key).await.map_err(|e| {
            Error::SshKey(format!("reading {}: {e}", public_key.display()))
        })?;

        Ok(key.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn have_ssh_keygen() -> bool {
        std::process::Command::new("ssh-keygen")
            .arg("-?")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    #[test]
    fn public_key_sits_next_to_private_key() {
        assert_eq!(
            public_key_path(Path::new("/tmp/machines/box/id_rsa")),
            PathBuf::from("/tmp/machines/box/id_rsa.pub")
        );
    }

    #[tokio::test]
    async fn generates_rsa_key_and_replaces_stale_files() {
        if !have_ssh_keygen() {
            eprintln!("ssh-keygen not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("nested").join("id_rsa");
        std::fs::create_dir_all(key.parent().unwrap()).unwrap();
        std::fs::write(&key, "stale").unwrap();

        let public = SshKeygen.generate(&key).await.unwrap();

        assert!(public.starts_with("ssh-rsa "));
        assert!(!public.ends_with('\n'));
        assert_ne!(std::fs::read_to_string(&key).unwrap(), "stale");
    }
}
