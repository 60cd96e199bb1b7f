//! In-memory stand-in for the 1&1 API that records every call.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use oneandone_api::{
    AssignedTo, CreateFirewallPolicyRequest, CreateServerRequest, Datacenter, FirewallPolicy,
    FirewallPolicyRule, FixedInstanceSize, LoadBalancer, MonitoringPolicy, PublicIp, Server,
    ServerAppliance, ServerIp, ServerStatus, StatusCode,
};

use crate::{CloudApi, Timeouts, WaitPolicy};

const MUTATING: &[&str] = &[
    "create_firewall_policy",
    "create_server",
    "start_server",
    "shutdown_server",
    "reboot_server",
    "delete_server",
];

pub(crate) const SERVER_ID: &str = "SRV-1";

pub(crate) fn not_found(endpoint: &'static str) -> oneandone_api::Error {
    oneandone_api::Error::Api {
        endpoint,
        status: StatusCode::NOT_FOUND,
        body: r#"{"type":"NOT_FOUND","message":"not found"}"#.into(),
    }
}

pub(crate) fn server_error(endpoint: &'static str) -> oneandone_api::Error {
    oneandone_api::Error::Api {
        endpoint,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "internal error".into(),
    }
}

pub(crate) fn fast_timeouts() -> Timeouts {
    Timeouts {
        firewall_active: WaitPolicy::new(Duration::ZERO, 3),
        ip_assignment: WaitPolicy::new(Duration::ZERO, 5),
        power_on: WaitPolicy::new(Duration::ZERO, 3),
    }
}

pub(crate) fn policy(id: &str, name: &str, ports: &[(u16, u16)]) -> FirewallPolicy {
    FirewallPolicy {
        id: id.into(),
        name: name.into(),
        description: None,
        state: "ACTIVE".into(),
        rules: ports
            .iter()
            .map(|&(from, to)| FirewallPolicyRule {
                id: None,
                protocol: "TCP".into(),
                port_from: Some(from),
                port_to: Some(to),
                source: None,
            })
            .collect(),
        creation_date: None,
    }
}

pub(crate) fn public_ip(id: &str, address: &str, assigned_to: Option<&str>) -> PublicIp {
    PublicIp {
        id: id.into(),
        ip_address: address.into(),
        assigned_to: assigned_to.map(|server| AssignedTo {
            id: server.into(),
            name: None,
            kind: Some("SERVER".into()),
        }),
        state: Some("ACTIVE".into()),
        creation_date: None,
    }
}

pub(crate) struct Inner {
    pub appliances: Vec<ServerAppliance>,
    pub datacenters: Vec<Datacenter>,
    pub sizes: Vec<FixedInstanceSize>,
    pub public_ips: Vec<PublicIp>,
    pub load_balancers: Vec<String>,
    pub monitoring_policies: Vec<String>,
    pub firewall_policies: Vec<FirewallPolicy>,
    /// State a freshly created firewall policy reports.
    pub new_policy_state: String,
    /// `get_server` calls answered with an empty address before one shows up.
    pub ip_after: u32,
    pub ip: String,
    pub first_password: Option<String>,
    pub server_status: String,
    pub server_exists: bool,
    pub fail_status: bool,
    pub fail_delete: bool,
    pub hard_shutdowns: u32,
    pub created_servers: Vec<CreateServerRequest>,
    pub created_policies: Vec<CreateFirewallPolicyRequest>,
    pub calls: Vec<String>,
    get_server_calls: u32,
}

pub(crate) struct FakeCloud {
    inner: Mutex<Inner>,
}

impl FakeCloud {
    pub fn new() -> Self {
        let appliance = |id: &str, name: &str, family: &str| ServerAppliance {
            id: id.into(),
            name: name.into(),
            os_family: Some(family.into()),
            os: None,
            os_version: None,
            kind: Some("IMAGE".into()),
        };
        let datacenter = |id: &str, code: &str| Datacenter {
            id: id.into(),
            country_code: code.into(),
            location: None,
        };
        let size = |id: &str, name: &str| FixedInstanceSize {
            id: id.into(),
            name: name.into(),
            hardware: None,
        };

        Self {
            inner: Mutex::new(Inner {
                appliances: vec![
                    appliance("APP-UBUNTU", "ubuntu1404-64std", "Linux"),
                    appliance("APP-CENTOS", "centos7-64std", "Linux"),
                    appliance("APP-WIN", "w2012r2datacenter64std", "Windows"),
                ],
                datacenters: vec![
                    datacenter("DC-US", "US"),
                    datacenter("DC-DE", "DE"),
                    datacenter("DC-GB", "GB"),
                    datacenter("DC-ES", "ES"),
                ],
                sizes: vec![
                    size("SZ-S", "S"),
                    size("SZ-M", "M"),
                    size("SZ-L", "L"),
                    size("SZ-XL", "XL"),
                    size("SZ-XXL", "XXL"),
                ],
                public_ips: Vec::new(),
                load_balancers: Vec::new(),
                monitoring_policies: Vec::new(),
                firewall_policies: Vec::new(),
                new_policy_state: "ACTIVE".into(),
                ip_after: 0,
                ip: "82.165.10.20".into(),
                first_password: None,
                server_status: "POWERED_ON".into(),
                server_exists: false,
                fail_status: false,
                fail_delete: false,
                hard_shutdowns: 0,
                created_servers: Vec::new(),
                created_policies: Vec::new(),
                calls: Vec::new(),
                get_server_calls: 0,
            }),
        }
    }

    pub fn with(self, f: impl FnOnce(&mut Inner)) -> Self {
        f(&mut self.inner.lock().unwrap());
        self
    }

    pub fn update(&self, f: impl FnOnce(&mut Inner)) {
        f(&mut self.inner.lock().unwrap());
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&self.inner.lock().unwrap())
    }

    pub fn calls(&self) -> Vec<String> {
        self.inspect(|i| i.calls.clone())
    }

    pub fn count(&self, call: &str) -> usize {
        self.inspect(|i| i.calls.iter().filter(|c| c.as_str() == call).count())
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| MUTATING.contains(&c.as_str()))
            .collect()
    }

    fn record(&self, call: &str) -> std::sync::MutexGuard<'_, Inner> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call.to_string());
        inner
    }

    fn server(inner: &Inner, with_ip: bool) -> Server {
        Server {
            id: SERVER_ID.into(),
            name: "box".into(),
            description: None,
            first_password: inner.first_password.clone(),
            status: Some(ServerStatus {
                state: inner.server_status.clone(),
                percent: None,
            }),
            ips: vec![ServerIp {
                id: Some("IP-1".into()),
                ip: if with_ip { inner.ip.clone() } else { String::new() },
                kind: Some("IPV4".into()),
            }],
            creation_date: None,
        }
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_server_appliances(&self, q: &str) -> oneandone_api::Result<Vec<ServerAppliance>> {
        let inner = self.record("list_server_appliances");
        let q = q.to_lowercase();
        Ok(inner
            .appliances
            .iter()
            .filter(|a| a.name.to_lowercase().contains(&q))
            .cloned()
            .collect())
    }

    async fn list_datacenters(&self) -> oneandone_api::Result<Vec<Datacenter>> {
        Ok(self.record("list_datacenters").datacenters.clone())
    }

    async fn list_fixed_instance_sizes(&self) -> oneandone_api::Result<Vec<FixedInstanceSize>> {
        Ok(self.record("list_fixed_instance_sizes").sizes.clone())
    }

    async fn list_public_ips(&self, q: &str) -> oneandone_api::Result<Vec<PublicIp>> {
        let inner = self.record("list_public_ips");
        let matches: Vec<PublicIp> = inner
            .public_ips
            .iter()
            .filter(|ip| ip.ip_address.contains(q))
            .cloned()
            .collect();
        if matches.is_empty() {
            return Err(not_found("list public ips"));
        }
        Ok(matches)
    }

    async fn get_load_balancer(&self, id: &str) -> oneandone_api::Result<LoadBalancer> {
        let inner = self.record("get_load_balancer");
        if !inner.load_balancers.iter().any(|lb| lb == id) {
            return Err(not_found("get load balancer"));
        }
        Ok(LoadBalancer {
            id: id.into(),
            name: "lb".into(),
            state: Some("ACTIVE".into()),
            ip: None,
        })
    }

    async fn get_monitoring_policy(&self, id: &str) -> oneandone_api::Result<MonitoringPolicy> {
        let inner = self.record("get_monitoring_policy");
        if !inner.monitoring_policies.iter().any(|mp| mp == id) {
            return Err(not_found("get monitoring policy"));
        }
        Ok(MonitoringPolicy {
            id: id.into(),
            name: "mp".into(),
            state: Some("ACTIVE".into()),
        })
    }

    async fn list_firewall_policies(&self, q: &str) -> oneandone_api::Result<Vec<FirewallPolicy>> {
        let inner = self.record("list_firewall_policies");
        Ok(inner
            .firewall_policies
            .iter()
            .filter(|p| p.name.contains(q))
            .cloned()
            .collect())
    }

    async fn get_firewall_policy(&self, id: &str) -> oneandone_api::Result<FirewallPolicy> {
        let inner = self.record("get_firewall_policy");
        inner
            .firewall_policies
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("get firewall policy"))
    }

    async fn create_firewall_policy(
        &self,
        req: &CreateFirewallPolicyRequest,
    ) -> oneandone_api::Result<FirewallPolicy> {
        let mut inner = self.record("create_firewall_policy");
        inner.created_policies.push(req.clone());

        let id = format!("FW-NEW-{}", inner.created_policies.len());
        let ports: Vec<(u16, u16)> = req.rules.iter().map(|r| (r.port_from, r.port_to)).collect();
        let mut created = policy(&id, &req.name, &ports);
        created.state = inner.new_policy_state.clone();
        inner.firewall_policies.push(created.clone());
        created.state = "CONFIGURING".into();
        Ok(created)
    }

    async fn create_server(&self, req: &CreateServerRequest) -> oneandone_api::Result<Server> {
        let mut inner = self.record("create_server");
        inner.created_servers.push(req.clone());
        inner.server_exists = true;
        inner.server_status = "POWERED_ON".into();
        Ok(Self::server(&inner, false))
    }

    async fn get_server(&self, _id: &str) -> oneandone_api::Result<Server> {
        let mut inner = self.record("get_server");
        if !inner.server_exists {
            return Err(not_found("get server"));
        }
        inner.get_server_calls += 1;
        let with_ip = inner.get_server_calls > inner.ip_after;
        Ok(Self::server(&inner, with_ip))
    }

    async fn get_server_status(&self, _id: &str) -> oneandone_api::Result<ServerStatus> {
        let inner = self.record("get_server_status");
        if inner.fail_status {
            return Err(server_error("get server status"));
        }
        Ok(ServerStatus {
            state: inner.server_status.clone(),
            percent: None,
        })
    }

    async fn start_server(&self, _id: &str) -> oneandone_api::Result<()> {
        drop(self.record("start_server"));
        Ok(())
    }

    async fn shutdown_server(&self, _id: &str, hardware: bool) -> oneandone_api::Result<()> {
        let mut inner = self.record("shutdown_server");
        if hardware {
            inner.hard_shutdowns += 1;
        }
        Ok(())
    }

    async fn reboot_server(&self, _id: &str, _hardware: bool) -> oneandone_api::Result<()> {
        drop(self.record("reboot_server"));
        Ok(())
    }

    async fn delete_server(&self, _id: &str, _keep_ips: bool) -> oneandone_api::Result<()> {
        let mut inner = self.record("delete_server");
        if inner.fail_delete {
            return Err(server_error("delete server"));
        }
        if !inner.server_exists {
            return Err(not_found("delete server"));
        }
        inner.server_exists = false;
        Ok(())
    }
}
