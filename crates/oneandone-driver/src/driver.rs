//! The lifecycle contract a host-management layer drives.

use oneandone_api::OneAndOneClient;
use tracing::info;

use crate::config::{ENGINE_PORT, HostConfig, Timeouts};
use crate::create::{CreateWorkflow, ServerHandle};
use crate::firewall::FirewallProvisioner;
use crate::lifecycle::{CanonicalState, Lifecycle, StateQuery};
use crate::resolver::{ResolvedIdentity, Resolver};
use crate::ssh::{KeyGenerator, SshKeygen};
use crate::{CloudApi, Error, Result};

pub const DRIVER_NAME: &str = "oneandone";

/// One host on 1&1 Cloud Server.
///
/// Owns its API client; nothing is shared between driver instances.
pub struct Driver<A = OneAndOneClient, K = SshKeygen> {
    api: A,
    keys: K,
    config: HostConfig,
    identity: ResolvedIdentity,
    timeouts: Timeouts,
    server_id: Option<String>,
    ip_address: Option<String>,
    password: Option<String>,
}

impl Driver {
    /// Build a driver talking to the public 1&1 endpoint.
    pub fn new(config: HostConfig) -> Self {
        let api = OneAndOneClient::new(config.api_key.clone());
        Self::with_parts(api, SshKeygen, config)
    }
}

impl<A: CloudApi, K: KeyGenerator> Driver<A, K> {
    pub fn with_parts(api: A, keys: K, config: HostConfig) -> Self {
        let password = config.ssh_password().map(str::to_string);
        Self {
            api,
            keys,
            config,
            identity: ResolvedIdentity::default(),
            timeouts: Timeouts::default(),
            server_id: None,
            ip_address: None,
            password,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Attach the driver to a host created earlier.
    pub fn restore(mut self, server_id: impl Into<String>, ip_address: Option<String>) -> Self {
        self.server_id = Some(server_id.into());
        self.ip_address = ip_address.filter(|ip| !ip.is_empty());
        self
    }

    pub fn driver_name(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn identity(&self) -> &ResolvedIdentity {
        &self.identity
    }

    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    /// Effective first-boot password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Check every user-supplied name against the provider. Issues no
    /// mutating call.
    pub async fn validate(&mut self) -> Result<()> {
        info!(machine = %self.config.machine_name, "validating 1&1 cloud server parameters");

        if self.config.api_key.is_empty() {
            return Err(Error::MissingApiKey);
        }

        let firewall_policy_id =
            FirewallProvisioner::new(&self.api, self.timeouts.firewall_active)
                .find_existing(self.config.firewall_policy())
                .await?;

        let mut identity = Resolver::new(&self.api).resolve(&self.config).await?;
        identity.firewall_policy_id = firewall_policy_id;
        self.identity = identity;
        Ok(())
    }

    /// Create the host. [`validate`](Self::validate) must have succeeded.
    ///
    /// The server ID is kept as soon as the provider accepts the server, so
    /// a failed wait still leaves a host that can be removed.
    pub async fn create(&mut self) -> Result<ServerHandle> {
        let workflow = CreateWorkflow::new(&self.api, &self.keys, self.timeouts);

        let submitted = workflow.submit(&self.config, &mut self.identity).await?;
        self.server_id = Some(submitted.id.clone());
        self.password = submitted.password.clone();

        let handle = workflow.await_ready(submitted).await?;
        self.ip_address = handle.ip().map(str::to_string);
        Ok(handle)
    }

    fn lifecycle(&self) -> Result<Lifecycle<'_, A>> {
        let id = self.server_id.as_deref().ok_or(Error::NotCreated)?;
        Ok(Lifecycle::new(&self.api, id))
    }

    pub async fn state(&self) -> StateQuery {
        match self.lifecycle() {
            Ok(lifecycle) => lifecycle.state().await,
            Err(err) => StateQuery::from(Err::<CanonicalState, _>(err)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        self.lifecycle()?.start().await
    }

    pub async fn stop(&self) -> Result<()> {
        self.lifecycle()?.stop().await
    }

    pub async fn restart(&self) -> Result<()> {
        self.lifecycle()?.restart().await
    }

    pub async fn kill(&self) -> Result<()> {
        self.lifecycle()?.kill().await
    }

    pub async fn remove(&self) -> Result<()> {
        self.lifecycle()?.remove().await
    }

    pub fn ip(&self) -> Result<&str> {
        self.ip_address.as_deref().ok_or(Error::NoIpAddress)
    }

    pub fn ssh_hostname(&self) -> Result<&str> {
        self.ip()
    }

    pub fn ssh_user(&self) -> &str {
        &self.config.ssh_user
    }

    pub fn ssh_port(&self) -> u16 {
        self.config.ssh_port
    }

    /// Engine endpoint; only handed out while the host is running.
    pub async fn url(&self) -> Result<String> {
        let state = self.state().await.into_result()?;
        if state != CanonicalState::Running {
            return Err(Error::NotRunning(state));
        }
        Ok(format!("tcp://{}:{ENGINE_PORT}", self.ip()?))
    }
}
