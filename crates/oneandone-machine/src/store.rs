//! On-disk record of the machines this tool created.
//!
//! Layout: `<root>/machines/<name>/config.json`, with the machine's SSH key
//! pair stored next to it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use oneandone_driver::HostConfig;
use serde::{Deserialize, Serialize};

const RECORD_FILE: &str = "config.json";
const KEY_FILE: &str = "id_rsa";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("machine '{0}' does not exist")]
    NotFound(String),

    #[error("machine '{0}' already exists")]
    AlreadyExists(String),

    #[error("invalid machine name '{0}'")]
    InvalidName(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: malformed record: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// What is remembered about a machine between invocations. Secrets are left
/// out: the API key comes from the environment every time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRecord {
    pub name: String,
    pub driver: String,
    pub server_id: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub firewall_policy_id: Option<String>,
    pub host: HostConfig,
}

pub struct MachineStore {
    root: PathBuf,
}

impl MachineStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$HOME/.oneandone-machine`, or the working directory when there is
    /// no home directory.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".oneandone-machine")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn machine_dir(&self, name: &str) -> PathBuf {
        self.root.join("machines").join(name)
    }

    pub fn key_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(KEY_FILE)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.machine_dir(name).join(RECORD_FILE).is_file()
    }

    /// Reserve the directory for a new machine.
    pub fn prepare(&self, name: &str) -> Result<PathBuf> {
        check_name(name)?;
        if self.exists(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let dir = self.machine_dir(name);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    pub fn save(&self, record: &MachineRecord) -> Result<()> {
        check_name(&record.name)?;
        let dir = self.machine_dir(&record.name);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(RECORD_FILE);
        let json = serde_json::to_string_pretty(record).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }

    pub fn load(&self, name: &str) -> Result<MachineRecord> {
        check_name(name)?;
        let path = self.machine_dir(name).join(RECORD_FILE);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&json).map_err(|source| StoreError::Json { path, source })
    }

    /// Forget a machine, key files included. Missing machines are ignored.
    pub fn remove(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let dir = self.machine_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path: dir, source }),
        }
    }
}

/// Names become directory names.
fn check_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
