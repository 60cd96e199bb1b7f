use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Catalogue ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServerAppliance {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub os_family: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Datacenter {
    pub id: String,
    pub country_code: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixedInstanceSize {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hardware: Option<SizeHardware>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizeHardware {
    #[serde(default)]
    pub vcore: Option<u32>,
    #[serde(default)]
    pub cores_per_processor: Option<u32>,
    #[serde(default)]
    pub ram: Option<f64>,
}

// ── Public IPs, load balancers, monitoring ───────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PublicIp {
    pub id: String,
    #[serde(rename = "ip")]
    pub ip_address: String,
    #[serde(default)]
    pub assigned_to: Option<AssignedTo>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignedTo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

// ── Firewall policies ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct FirewallPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub rules: Vec<FirewallPolicyRule>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirewallPolicyRule {
    #[serde(default)]
    pub id: Option<String>,
    pub protocol: String,
    #[serde(default)]
    pub port_from: Option<u16>,
    #[serde(default)]
    pub port_to: Option<u16>,
    #[serde(default)]
    pub source: Option<String>,
}

impl FirewallPolicyRule {
    /// Whether traffic to `port` is let through by this rule.
    ///
    /// A rule with only one bound set covers exactly that port.
    pub fn covers(&self, port: u16) -> bool {
        match (self.port_from, self.port_to) {
            (Some(from), Some(to)) => (from <= port && port <= to) || from == port || to == port,
            (Some(bound), None) | (None, Some(bound)) => bound == port,
            (None, None) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateFirewallPolicyRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rules: Vec<FirewallRuleRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRuleRequest {
    pub protocol: String,
    pub port_from: u16,
    pub port_to: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl FirewallRuleRequest {
    pub fn tcp(port_from: u16, port_to: u16) -> Self {
        Self {
            protocol: "TCP".into(),
            port_from,
            port_to,
            source: None,
        }
    }
}

// ── Servers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub first_password: Option<String>,
    #[serde(default)]
    pub status: Option<ServerStatus>,
    #[serde(default)]
    pub ips: Vec<ServerIp>,
    #[serde(default)]
    pub creation_date: Option<DateTime<Utc>>,
}

impl Server {
    /// The first assigned address, if the provider has filled one in yet.
    pub fn first_ip(&self) -> Option<&str> {
        self.ips
            .first()
            .map(|ip| ip.ip.as_str())
            .filter(|ip| !ip.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerIp {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatus {
    pub state: String,
    #[serde(default)]
    pub percent: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub hardware: ServerHardwareRequest,
    pub appliance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub power_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_policy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter_id: Option<String>,
    #[serde(rename = "rsa_key", skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerHardwareRequest {
    pub fixed_instance_size_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerAction {
    PowerOn,
    PowerOff,
    Reboot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionMethod {
    Software,
    Hardware,
}

impl ActionMethod {
    pub fn forced(hardware: bool) -> Self {
        if hardware { Self::Hardware } else { Self::Software }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerActionRequest {
    pub action: ServerAction,
    pub method: ActionMethod,
}
