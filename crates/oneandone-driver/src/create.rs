//! Server creation, from firewall policy to a powered-on host with an address.

use oneandone_api::{CreateServerRequest, Server, ServerHardwareRequest};
use tracing::{debug, info};

use crate::config::{HostConfig, Timeouts};
use crate::firewall::FirewallProvisioner;
use crate::resolver::ResolvedIdentity;
use crate::ssh::KeyGenerator;
use crate::wait::{poll_until, wait_for_state};
use crate::{CloudApi, Error, Result};

const POWERED_ON: &str = "POWERED_ON";

/// A created server as the driver remembers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHandle {
    pub id: String,
    pub ips: Vec<String>,
    /// Caller supplied password, or the one the provider generated.
    pub password: Option<String>,
    pub status: String,
}

impl ServerHandle {
    pub fn ip(&self) -> Option<&str> {
        self.ips.first().map(String::as_str).filter(|ip| !ip.is_empty())
    }
}

/// A server the provider accepted but that may not be up yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedServer {
    pub id: String,
    pub password: Option<String>,
}

pub struct CreateWorkflow<'a, A: CloudApi + ?Sized, K: KeyGenerator + ?Sized> {
    api: &'a A,
    keys: &'a K,
    timeouts: Timeouts,
}

impl<'a, A, K> CreateWorkflow<'a, A, K>
where
    A: CloudApi + ?Sized,
    K: KeyGenerator + ?Sized,
{
    pub fn new(api: &'a A, keys: &'a K, timeouts: Timeouts) -> Self {
        Self {
            api,
            keys,
            timeouts,
        }
    }

    /// Create the host described by `config` and wait until it is up.
    pub async fn run(
        &self,
        config: &HostConfig,
        identity: &mut ResolvedIdentity,
    ) -> Result<ServerHandle> {
        let submitted = self.submit(config, identity).await?;
        self.await_ready(submitted).await
    }

    /// Everything up to and including the create call. Once this returns,
    /// a server exists at the provider whatever happens next.
    ///
    /// `identity` must come from a successful validation; the firewall
    /// policy ID is filled in here if validation left it open.
    pub async fn submit(
        &self,
        config: &HostConfig,
        identity: &mut ResolvedIdentity,
    ) -> Result<SubmittedServer> {
        let appliance_id = identity
            .appliance_id
            .clone()
            .ok_or(Error::Unresolved("server appliance"))?;
        let size_id = identity
            .size_id
            .clone()
            .ok_or(Error::Unresolved("server size"))?;

        let requested = identity
            .firewall_policy_id
            .as_deref()
            .or(config.firewall_policy());
        let policy_id = FirewallProvisioner::new(self.api, self.timeouts.firewall_active)
            .ensure(requested)
            .await?;
        identity.firewall_policy_id = Some(policy_id.clone());

        debug!(path = %config.ssh_key_path.display(), "creating ssh key");
        let public_key = self.keys.generate(&config.ssh_key_path).await?;

        info!(name = %config.machine_name, "creating 1&1 cloud server");

        let req = CreateServerRequest {
            name: config.machine_name.clone(),
            description: Some(config.description.clone()).filter(|d| !d.is_empty()),
            hardware: ServerHardwareRequest {
                fixed_instance_size_id: size_id,
            },
            appliance_id,
            password: config.ssh_password().map(str::to_string),
            power_on: true,
            firewall_policy_id: Some(policy_id),
            ip_id: identity.public_ip_id.clone(),
            load_balancer_id: config.load_balancer().map(str::to_string),
            monitoring_policy_id: config.monitoring_policy().map(str::to_string),
            datacenter_id: identity.datacenter_id.clone(),
            ssh_key: Some(public_key),
        };

        let created = self.api.create_server(&req).await?;

        Ok(SubmittedServer {
            id: created.id,
            password: req.password.or(created.first_password),
        })
    }

    /// Wait for the provider to assign an address and finish powering on.
    pub async fn await_ready(&self, submitted: SubmittedServer) -> Result<ServerHandle> {
        let SubmittedServer { id, password } = submitted;

        info!(server_id = %id, "waiting for IP address");
        let server = self.await_ip(&id).await?;

        info!(server_id = %server.id, "finishing configuration and starting server");
        self.await_power_on(&server.id).await?;

        let handle = ServerHandle {
            id: server.id,
            ips: server.ips.into_iter().map(|ip| ip.ip).collect(),
            password,
            status: POWERED_ON.to_string(),
        };

        info!(
            server_id = %handle.id,
            ip = handle.ip().unwrap_or_default(),
            "created 1&1 cloud server"
        );

        Ok(handle)
    }

    async fn await_ip(&self, id: &str) -> Result<Server> {
        let api = self.api;
        poll_until(
            "server",
            id,
            "an IP address",
            self.timeouts.ip_assignment,
            || async move {
                let server = api.get_server(id).await?;
                Ok(server.first_ip().is_some().then_some(server))
            },
        )
        .await
    }

    async fn await_power_on(&self, id: &str) -> Result<()> {
        let api = self.api;
        wait_for_state("server", id, POWERED_ON, self.timeouts.power_on, || async move {
            Ok(api.get_server_status(id).await?.state)
        })
        .await
    }
}
