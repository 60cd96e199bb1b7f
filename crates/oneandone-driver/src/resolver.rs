//! Turns user-facing names into provider IDs before anything is created.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{DEFAULT_DATACENTER, HostConfig};
use crate::{CloudApi, Error, Result, not_found_as};

/// Size names too small to run a container engine host.
const DISALLOWED_SIZES: &[&str] = &["S"];

/// Provider IDs, each filled in only once its validation passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentity {
    pub appliance_id: Option<String>,
    /// `None` for the default datacenter, which the provider picks itself.
    pub datacenter_id: Option<String>,
    pub size_id: Option<String>,
    pub public_ip_id: Option<String>,
    pub firewall_policy_id: Option<String>,
}

pub struct Resolver<'a, A: CloudApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: CloudApi + ?Sized> Resolver<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Resolve everything except the firewall policy, which has its own
    /// provisioner. Fails on the first invalid field.
    pub async fn resolve(&self, config: &HostConfig) -> Result<ResolvedIdentity> {
        let size_id = self.size(&config.size).await?;
        let datacenter_id = self.datacenter(&config.datacenter).await?;
        let appliance_id = self.appliance(&config.appliance).await?;
        let public_ip_id = self.public_ip(config.ip_address()).await?;
        self.load_balancer(config.load_balancer()).await?;
        self.monitoring_policy(config.monitoring_policy()).await?;

        Ok(ResolvedIdentity {
            appliance_id: Some(appliance_id),
            datacenter_id,
            size_id: Some(size_id),
            public_ip_id,
            firewall_policy_id: None,
        })
    }

    pub async fn appliance(&self, name: &str) -> Result<String> {
        debug!(appliance = name, "validating server appliance");

        let appliances = self
            .api
            .list_server_appliances(name)
            .await
            .map_err(|e| not_found_as(e, || Error::ApplianceNotFound(name.to_string())))?;

        let appliance = appliances
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::ApplianceNotFound(name.to_string()))?;

        let family = appliance.os_family.unwrap_or_default();
        if !family.eq_ignore_ascii_case("linux") {
            return Err(Error::UnsupportedOsFamily {
                name: appliance.name,
                family: if family.is_empty() {
                    "unknown".into()
                } else {
                    family
                },
            });
        }

        Ok(appliance.id)
    }

    /// The default datacenter needs no lookup and stays unresolved.
    pub async fn datacenter(&self, code: &str) -> Result<Option<String>> {
        if code.is_empty() || code.eq_ignore_ascii_case(DEFAULT_DATACENTER) {
            return Ok(None);
        }

        debug!(datacenter = code, "validating datacenter");

        let datacenters = self
            .api
            .list_datacenters()
            .await
            .map_err(|e| not_found_as(e, || Error::DatacenterNotFound(code.to_string())))?;

        datacenters
            .into_iter()
            .find(|dc| dc.country_code.eq_ignore_ascii_case(code))
            .map(|dc| Some(dc.id))
            .ok_or_else(|| Error::DatacenterNotFound(code.to_string()))
    }

    pub async fn size(&self, name: &str) -> Result<String> {
        debug!(size = name, "validating server size");

        if DISALLOWED_SIZES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            return Err(Error::SizeTooSmall(name.to_string()));
        }

        let sizes = self
            .api
            .list_fixed_instance_sizes()
            .await
            .map_err(|e| not_found_as(e, || Error::SizeNotFound(name.to_string())))?;

        sizes
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.id)
            .ok_or_else(|| Error::SizeNotFound(name.to_string()))
    }

    pub async fn public_ip(&self, address: Option<&str>) -> Result<Option<String>> {
        let Some(address) = address else {
            return Ok(None);
        };

        debug!(address, "validating public IP");

        let ips = self
            .api
            .list_public_ips(address)
            .await
            .map_err(|e| not_found_as(e, || Error::PublicIpNotFound(address.to_string())))?;

        let ip = ips
            .into_iter()
            .find(|ip| ip.ip_address == address)
            .ok_or_else(|| Error::PublicIpNotFound(address.to_string()))?;

        if let Some(assigned) = ip.assigned_to {
            return Err(Error::PublicIpAlreadyAssigned {
                address: address.to_string(),
                server: assigned.name.unwrap_or(assigned.id),
            });
        }

        Ok(Some(ip.id))
    }

    pub async fn load_balancer(&self, id: Option<&str>) -> Result<()> {
        let Some(id) = id else {
            return Ok(());
        };

        debug!(load_balancer = id, "validating load balancer");

        self.api
            .get_load_balancer(id)
            .await
            .map_err(|e| not_found_as(e, || Error::LoadBalancerNotFound(id.to_string())))?;
        Ok(())
    }

    pub async fn monitoring_policy(&self, id: Option<&str>) -> Result<()> {
        let Some(id) = id else {
            return Ok(());
        };

        debug!(monitoring_policy = id, "validating monitoring policy");

        self.api
            .get_monitoring_policy(id)
            .await
            .map_err(|e| not_found_as(e, || Error::MonitoringPolicyNotFound(id.to_string())))?;
        Ok(())
    }
}
