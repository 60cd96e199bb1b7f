use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wait::WaitPolicy;

pub const DEFAULT_APPLIANCE: &str = "ubuntu1404-64std";
pub const DEFAULT_SIZE: &str = "M";
pub const DEFAULT_DATACENTER: &str = "US";
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Port the container engine listens on with TLS.
pub const ENGINE_PORT: u16 = 2376;

/// What the user asked for.
///
/// Secrets (`api_key`, `ssh_password`) are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(skip)]
    pub api_key: String,
    pub machine_name: String,
    #[serde(default)]
    pub description: String,
    pub appliance: String,
    pub datacenter: String,
    pub size: String,
    #[serde(default)]
    pub firewall_policy: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub load_balancer: Option<String>,
    #[serde(default)]
    pub monitoring_policy: Option<String>,
    #[serde(skip)]
    pub ssh_password: Option<String>,
    pub ssh_user: String,
    pub ssh_port: u16,
    pub ssh_key_path: PathBuf,
}

impl HostConfig {
    pub fn new(machine_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        let machine_name = machine_name.into();
        Self {
            api_key: api_key.into(),
            ssh_key_path: PathBuf::from(format!("{machine_name}_id_rsa")),
            machine_name,
            description: String::new(),
            appliance: DEFAULT_APPLIANCE.into(),
            datacenter: DEFAULT_DATACENTER.into(),
            size: DEFAULT_SIZE.into(),
            firewall_policy: None,
            ip_address: None,
            load_balancer: None,
            monitoring_policy: None,
            ssh_password: None,
            ssh_user: DEFAULT_SSH_USER.into(),
            ssh_port: DEFAULT_SSH_PORT,
        }
    }

    pub fn firewall_policy(&self) -> Option<&str> {
        requested(&self.firewall_policy)
    }

    pub fn ip_address(&self) -> Option<&str> {
        requested(&self.ip_address)
    }

    pub fn load_balancer(&self) -> Option<&str> {
        requested(&self.load_balancer)
    }

    pub fn monitoring_policy(&self) -> Option<&str> {
        requested(&self.monitoring_policy)
    }

    pub fn ssh_password(&self) -> Option<&str> {
        self.ssh_password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Blank option values count as "not requested".
fn requested(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Poll budgets for the waits performed while creating a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// New firewall policy reaching `ACTIVE`.
    pub firewall_active: WaitPolicy,
    /// Provider filling in the server's first IP address.
    pub ip_assignment: WaitPolicy,
    /// Server reaching `POWERED_ON` once it has an address.
    pub power_on: WaitPolicy,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            firewall_active: WaitPolicy::new(Duration::from_secs(30), 10),
            ip_assignment: WaitPolicy::new(Duration::from_secs(5), 120),
            power_on: WaitPolicy::new(Duration::from_secs(10), 400),
        }
    }
}
