//! The shared firewall policy every host is created behind.
//!
//! Policies created here carry a reserved name prefix so later runs can find
//! and reuse them instead of piling up duplicates.

use oneandone_api::{CreateFirewallPolicyRequest, FirewallPolicy, FirewallRuleRequest};
use rand::Rng;
use tracing::{debug, info};

use crate::wait::{WaitPolicy, wait_for_state};
use crate::{CloudApi, Error, Result, not_found_as};

pub const POLICY_PREFIX: &str = "Docker-Driver-Required-Policy_";

/// SSH, HTTP, then the engine and swarm ports (plain and TLS).
const SSH_PORT: u16 = 22;
const HTTP_PORT: u16 = 80;
const ENGINE_PORTS: [u16; 2] = [2375, 2376];
const SWARM_PORTS: [u16; 2] = [3375, 3376];

/// Whether a policy's rules open every port a host needs.
pub fn satisfies_coverage(policy: &FirewallPolicy) -> bool {
    let covered = |port: u16| policy.rules.iter().any(|r| r.covers(port));

    covered(SSH_PORT)
        && covered(HTTP_PORT)
        && ENGINE_PORTS.into_iter().any(covered)
        && SWARM_PORTS.into_iter().any(covered)
}

pub fn required_rules() -> Vec<FirewallRuleRequest> {
    vec![
        FirewallRuleRequest::tcp(SSH_PORT, SSH_PORT),
        FirewallRuleRequest::tcp(HTTP_PORT, HTTP_PORT),
        FirewallRuleRequest::tcp(ENGINE_PORTS[0], ENGINE_PORTS[1]),
        FirewallRuleRequest::tcp(SWARM_PORTS[0], SWARM_PORTS[1]),
    ]
}

/// A fresh reserved name with a random six digit suffix.
pub fn policy_name() -> String {
    let suffix: u32 = rand::rng().random_range(0..1_000_000);
    format!("{POLICY_PREFIX}{suffix:06}")
}

pub struct FirewallProvisioner<'a, A: CloudApi + ?Sized> {
    api: &'a A,
    wait: WaitPolicy,
}

impl<'a, A: CloudApi + ?Sized> FirewallProvisioner<'a, A> {
    pub fn new(api: &'a A, wait: WaitPolicy) -> Self {
        Self { api, wait }
    }

    /// Read-only half of [`ensure`](Self::ensure).
    ///
    /// A requested ID only has to exist. Without one, the first reserved
    /// policy that opens every required port is returned, if any.
    pub async fn find_existing(&self, requested: Option<&str>) -> Result<Option<String>> {
        if let Some(id) = requested {
            debug!(policy_id = id, "validating firewall policy");
            let policy = self
                .api
                .get_firewall_policy(id)
                .await
                .map_err(|e| not_found_as(e, || Error::FirewallPolicyNotFound(id.to_string())))?;
            return Ok(Some(policy.id));
        }

        let policies = self.api.list_firewall_policies(POLICY_PREFIX).await?;
        let reusable = policies
            .into_iter()
            .find(|p| p.name.starts_with(POLICY_PREFIX) && satisfies_coverage(p));

        if let Some(policy) = &reusable {
            info!(policy = %policy.name, policy_id = %policy.id, "reusing firewall policy");
        }

        Ok(reusable.map(|p| p.id))
    }

    /// Return a usable policy ID, creating a reserved policy when none fits.
    pub async fn ensure(&self, requested: Option<&str>) -> Result<String> {
        match self.find_existing(requested).await? {
            Some(id) => Ok(id),
            None => self.create().await,
        }
    }

    async fn create(&self) -> Result<String> {
        let req = CreateFirewallPolicyRequest {
            name: policy_name(),
            description: None,
            rules: required_rules(),
        };

        info!(policy = %req.name, "creating firewall policy");

        let policy = self.api.create_firewall_policy(&req).await?;

        debug!(policy_id = %policy.id, "waiting for firewall policy to become active");

        let api = self.api;
        let id = policy.id.as_str();
        wait_for_state("firewall policy", id, "ACTIVE", self.wait, || async move {
            Ok(api.get_firewall_policy(id).await?.state)
        })
        .await?;

        Ok(policy.id)
    }
}
