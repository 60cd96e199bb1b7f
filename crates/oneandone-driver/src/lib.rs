//! Host driver for 1&1 Cloud Servers.
//!
//! Resolves user-facing names into provider IDs, provisions the shared
//! firewall policy, drives server creation to an SSH-reachable host and
//! exposes an idempotent start/stop/restart/kill/remove lifecycle on top of
//! a small canonical state vocabulary.

pub mod config;
pub mod create;
pub mod driver;
pub mod firewall;
pub mod lifecycle;
pub mod resolver;
pub mod ssh;
pub mod wait;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use oneandone_api::{
    CreateFirewallPolicyRequest, CreateServerRequest, Datacenter, FirewallPolicy,
    FixedInstanceSize, LoadBalancer, MonitoringPolicy, PublicIp, Server,
    ServerAppliance, ServerStatus,
};

pub use config::{HostConfig, Timeouts};
pub use oneandone_api::OneAndOneClient;
pub use create::{ServerHandle, SubmittedServer};
pub use driver::Driver;
pub use lifecycle::{CanonicalState, StateQuery};
pub use resolver::ResolvedIdentity;
pub use ssh::{KeyGenerator, SshKeygen};
pub use wait::WaitPolicy;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("1&1 api error: {0}")]
    Api(#[from] oneandone_api::Error),

    #[error("oneandone driver requires the --oneandone-api-key option")]
    MissingApiKey,

    #[error("1&1 server appliance '{0}' not found")]
    ApplianceNotFound(String),

    #[error("1&1 server appliance '{name}' is {family}; the driver supports only linux")]
    UnsupportedOsFamily { name: String, family: String },

    #[error("1&1 datacenter '{0}' could not be found")]
    DatacenterNotFound(String),

    #[error("1&1 cloud server size '{0}' is too small, use 'M' or larger")]
    SizeTooSmall(String),

    #[error("1&1 cloud server size '{0}' not available")]
    SizeNotFound(String),

    #[error("1&1 public IP '{0}' could not be found")]
    PublicIpNotFound(String),

    #[error("public IP '{address}' is already assigned to server {server}")]
    PublicIpAlreadyAssigned { address: String, server: String },

    #[error("load balancer with ID '{0}' could not be found")]
    LoadBalancerNotFound(String),

    #[error("monitoring policy with ID '{0}' could not be found")]
    MonitoringPolicyNotFound(String),

    #[error("firewall policy with ID '{0}' could not be found")]
    FirewallPolicyNotFound(String),

    #[error("{resource} '{id}' did not reach {target} after {attempts} attempts")]
    WaitBudgetExceeded {
        resource: &'static str,
        id: String,
        target: String,
        attempts: u32,
    },

    #[error("{0} has not been resolved; validate the host first")]
    Unresolved(&'static str),

    #[error("ssh key generation failed: {0}")]
    SshKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("host has not been created")]
    NotCreated,

    #[error("host is not running (state: {0})")]
    NotRunning(CanonicalState),

    #[error("host has no IP address yet")]
    NoIpAddress,
}

impl Error {
    /// Pre-check failures: raised before any remote mutation and never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey
                | Self::ApplianceNotFound(_)
                | Self::UnsupportedOsFamily { .. }
                | Self::DatacenterNotFound(_)
                | Self::SizeTooSmall(_)
                | Self::SizeNotFound(_)
                | Self::PublicIpNotFound(_)
                | Self::PublicIpAlreadyAssigned { .. }
                | Self::LoadBalancerNotFound(_)
                | Self::MonitoringPolicyNotFound(_)
                | Self::FirewallPolicyNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Turn a provider "not found" into the typed error built by `missing`;
/// anything else is passed through untouched.
pub(crate) fn not_found_as(err: oneandone_api::Error, missing: impl FnOnce() -> Error) -> Error {
    if err.is_not_found() {
        missing()
    } else {
        Error::Api(err)
    }
}

/// The slice of the 1&1 API the driver talks to.
///
/// Implemented by [`OneAndOneClient`]; tests substitute an in-memory cloud.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_server_appliances(&self, q: &str) -> oneandone_api::Result<Vec<ServerAppliance>>;

    async fn list_datacenters(&self) -> oneandone_api::Result<Vec<Datacenter>>;

    async fn list_fixed_instance_sizes(&self) -> oneandone_api::Result<Vec<FixedInstanceSize>>;

    async fn list_public_ips(&self, q: &str) -> oneandone_api::Result<Vec<PublicIp>>;

    async fn get_load_balancer(&self, id: &str) -> oneandone_api::Result<LoadBalancer>;

    async fn get_monitoring_policy(&self, id: &str) -> oneandone_api::Result<MonitoringPolicy>;

    async fn list_firewall_policies(&self, q: &str) -> oneandone_api::Result<Vec<FirewallPolicy>>;

    async fn get_firewall_policy(&self, id: &str) -> oneandone_api::Result<FirewallPolicy>;

    async fn create_firewall_policy(
        &self,
        req: &CreateFirewallPolicyRequest,
    ) -> oneandone_api::Result<FirewallPolicy>;

    async fn create_server(&self, req: &CreateServerRequest) -> oneandone_api::Result<Server>;

    async fn get_server(&self, id: &str) -> oneandone_api::Result<Server>;

    async fn get_server_status(&self, id: &str) -> oneandone_api::Result<ServerStatus>;

    async fn start_server(&self, id: &str) -> oneandone_api::Result<()>;

    async fn shutdown_server(&self, id: &str, hardware: bool) -> oneandone_api::Result<()>;

    async fn reboot_server(&self, id: &str, hardware: bool) -> oneandone_api::Result<()>;

    async fn delete_server(&self, id: &str, keep_ips: bool) -> oneandone_api::Result<()>;
}

#[async_trait]
impl CloudApi for OneAndOneClient {
    async fn list_server_appliances(&self, q: &str) -> oneandone_api::Result<Vec<ServerAppliance>> {
        OneAndOneClient::list_server_appliances(self, q).await
    }

    async fn list_datacenters(&self) -> oneandone_api::Result<Vec<Datacenter>> {
        OneAndOneClient::list_datacenters(self).await
    }

    async fn list_fixed_instance_sizes(&self) -> oneandone_api::Result<Vec<FixedInstanceSize>> {
        OneAndOneClient::list_fixed_instance_sizes(self).await
    }

    async fn list_public_ips(&self, q: &str) -> oneandone_api::Result<Vec<PublicIp>> {
        OneAndOneClient::list_public_ips(self, q).await
    }

    async fn get_load_balancer(&self, id: &str) -> oneandone_api::Result<LoadBalancer> {
        OneAndOneClient::get_load_balancer(self, id).await
    }

    async fn get_monitoring_policy(&self, id: &str) -> oneandone_api::Result<MonitoringPolicy> {
        OneAndOneClient::get_monitoring_policy(self, id).await
    }

    async fn list_firewall_policies(&self, q: &str) -> oneandone_api::Result<Vec<FirewallPolicy>> {
        OneAndOneClient::list_firewall_policies(self, q).await
    }

    async fn get_firewall_policy(&self, id: &str) -> oneandone_api::Result<FirewallPolicy> {
        OneAndOneClient::get_firewall_policy(self, id).await
    }

    async fn create_firewall_policy(
        &self,
        req: &CreateFirewallPolicyRequest,
    ) -> oneandone_api::Result<FirewallPolicy> {
        OneAndOneClient::create_firewall_policy(self, req).await
    }

    async fn create_server(&self, req: &CreateServerRequest) -> oneandone_api::Result<Server> {
        OneAndOneClient::create_server(self, req).await
    }

    async fn get_server(&self, id: &str) -> oneandone_api::Result<Server> {
        OneAndOneClient::get_server(self, id).await
    }

    async fn get_server_status(&self, id: &str) -> oneandone_api::Result<ServerStatus> {
        OneAndOneClient::get_server_status(self, id).await
    }

    async fn start_server(&self, id: &str) -> oneandone_api::Result<()> {
        OneAndOneClient::start_server(self, id).await.map(drop)
    }

    async fn shutdown_server(&self, id: &str, hardware: bool) -> oneandone_api::Result<()> {
        OneAndOneClient::shutdown_server(self, id, hardware)
            .await
            .map(drop)
    }

    async fn reboot_server(&self, id: &str, hardware: bool) -> oneandone_api::Result<()> {
        OneAndOneClient::reboot_server(self, id, hardware)
            .await
            .map(drop)
    }

    async fn delete_server(&self, id: &str, keep_ips: bool) -> oneandone_api::Result<()> {
        OneAndOneClient::delete_server(self, id, keep_ips).await
    }
}
