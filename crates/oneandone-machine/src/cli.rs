use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use oneandone_driver::HostConfig;
use oneandone_driver::config::{DEFAULT_APPLIANCE, DEFAULT_DATACENTER, DEFAULT_SIZE};

#[derive(Debug, Parser)]
#[command(name = "oneandone-machine")]
#[command(about = "Create and manage container hosts on 1&1 Cloud Server", long_about = None)]
pub struct Cli {
    /// 1&1 API access key
    #[arg(
        long = "oneandone-api-key",
        env = "ONEANDONE_API_KEY",
        global = true,
        hide_env_values = true,
        default_value = ""
    )]
    pub api_key: String,

    /// Directory holding machine records and keys [default: ~/.oneandone-machine]
    #[arg(long = "storage-path", env = "ONEANDONE_STORAGE_PATH", global = true)]
    pub storage_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new host
    Create {
        name: String,
        #[command(flatten)]
        options: CreateOptions,
    },
    /// Print the host's state
    State { name: String },
    /// Power the host on
    Start { name: String },
    /// Shut the host down gracefully
    Stop { name: String },
    /// Reboot the host
    Restart { name: String },
    /// Force the host off
    Kill { name: String },
    /// Delete the host and its local record
    #[command(alias = "remove")]
    Rm { name: String },
    /// Print the host's IP address
    Ip { name: String },
    /// Print the container engine URL
    Url { name: String },
    /// Print the stored record as JSON
    Inspect { name: String },
}

#[derive(Debug, Args)]
pub struct CreateOptions {
    /// 1&1 server root password
    #[arg(long = "oneandone-ssh-pass", env = "ONEANDONE_SSH_PASSWORD", hide_env_values = true)]
    pub ssh_password: Option<String>,

    /// 1&1 datacenter country code
    #[arg(long = "oneandone-datacenter", env = "ONEANDONE_DATACENTER", default_value = DEFAULT_DATACENTER)]
    pub datacenter: String,

    /// 1&1 cloud server size
    #[arg(long = "oneandone-size", env = "ONEANDONE_SIZE", default_value = DEFAULT_SIZE)]
    pub size: String,

    /// 1&1 server appliance (OS image) name
    #[arg(long = "oneandone-os", env = "ONEANDONE_OS", default_value = DEFAULT_APPLIANCE)]
    pub appliance: String,

    /// 1&1 firewall policy ID
    #[arg(long = "oneandone-firewall-id", env = "ONEANDONE_FIREWALL")]
    pub firewall_policy: Option<String>,

    /// 1&1 public IP address to assign
    #[arg(long = "oneandone-ip-address", env = "ONEANDONE_IP_ADDRESS")]
    pub ip_address: Option<String>,

    /// 1&1 load balancer ID
    #[arg(long = "oneandone-loadbalancer-id", env = "ONEANDONE_LOADBALANCER")]
    pub load_balancer: Option<String>,

    /// 1&1 monitoring policy ID
    #[arg(long = "oneandone-monitor-policy-id", env = "ONEANDONE_MONITOR_POLICY")]
    pub monitoring_policy: Option<String>,

    /// 1&1 cloud server description
    #[arg(
        long = "oneandone-server-description",
        env = "ONEANDONE_SERVER_DESCRIPTION",
        default_value = ""
    )]
    pub description: String,
}

impl CreateOptions {
    pub fn into_config(self, name: &str, api_key: &str, ssh_key_path: PathBuf) -> HostConfig {
        let mut config = HostConfig::new(name, api_key);
        config.description = self.description;
        config.appliance = self.appliance;
        config.datacenter = self.datacenter;
        config.size = self.size;
        config.firewall_policy = self.firewall_policy;
        config.ip_address = self.ip_address;
        config.load_balancer = self.load_balancer;
        config.monitoring_policy = self.monitoring_policy;
        config.ssh_password = self.ssh_password;
        config.ssh_key_path = ssh_key_path;
        config
    }
}
