//! Typed Rust client for the 1&1 Cloud Server REST API.
//!
//! Covers the subset needed to run a single host: catalogue lookups
//! (appliances, datacenters, fixed sizes), public IPs, load balancers,
//! monitoring policies, firewall policies and servers (create, get,
//! status, power actions, delete).

mod types;

pub use reqwest::StatusCode;
pub use types::*;

pub const BASE_URL: &str = "https://cloudpanel-api.1and1.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("1&1 api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("1&1 api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },
}

impl Error {
    /// Whether the provider reported the addressed resource as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, body, .. } => {
                *status == reqwest::StatusCode::NOT_FOUND || body.contains("NOT_FOUND")
            }
            Self::Request(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the 1&1 Cloud Server REST API.
#[derive(Clone)]
pub struct OneAndOneClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl OneAndOneClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        endpoint: &'static str,
    ) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .header("X-TOKEN", &self.token)
            .query(query)
            .send()
            .await?;

        Self::check(resp, endpoint)
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Catalogue ────────────────────────────────────────────────────

    /// List server appliances whose fields match `q`.
    pub async fn list_server_appliances(&self, q: &str) -> Result<Vec<ServerAppliance>> {
        self.get_json("/server_appliances", &[("q", q)], "list server appliances")
            .await
    }

    pub async fn list_datacenters(&self) -> Result<Vec<Datacenter>> {
        self.get_json("/datacenters", &[], "list datacenters").await
    }

    pub async fn list_fixed_instance_sizes(&self) -> Result<Vec<FixedInstanceSize>> {
        self.get_json(
            "/servers/fixed_instance_sizes",
            &[],
            "list fixed instance sizes",
        )
        .await
    }

    // ── Public IPs, load balancers, monitoring ───────────────────────

    pub async fn list_public_ips(&self, q: &str) -> Result<Vec<PublicIp>> {
        self.get_json("/public_ips", &[("q", q)], "list public ips")
            .await
    }

    pub async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer> {
        self.get_json(&format!("/load_balancers/{id}"), &[], "get load balancer")
            .await
    }

    pub async fn get_monitoring_policy(&self, id: &str) -> Result<MonitoringPolicy> {
        self.get_json(
            &format!("/monitoring_policies/{id}"),
            &[],
            "get monitoring policy",
        )
        .await
    }

    // ── Firewall policies ────────────────────────────────────────────

    pub async fn list_firewall_policies(&self, q: &str) -> Result<Vec<FirewallPolicy>> {
        self.get_json("/firewall_policies", &[("q", q)], "list firewall policies")
            .await
    }

    pub async fn get_firewall_policy(&self, id: &str) -> Result<FirewallPolicy> {
        self.get_json(
            &format!("/firewall_policies/{id}"),
            &[],
            "get firewall policy",
        )
        .await
    }

    pub async fn create_firewall_policy(
        &self,
        req: &CreateFirewallPolicyRequest,
    ) -> Result<FirewallPolicy> {
        let resp = self
            .http
            .post(self.url("/firewall_policies"))
            .header("X-TOKEN", &self.token)
            .json(req)
            .send()
            .await?;

        Self::check(resp, "create firewall policy")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    // ── Servers ──────────────────────────────────────────────────────

    pub async fn create_server(&self, req: &CreateServerRequest) -> Result<Server> {
        let resp = self
            .http
            .post(self.url("/servers"))
            .header("X-TOKEN", &self.token)
            .json(req)
            .send()
            .await?;

        Self::check(resp, "create server")
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn get_server(&self, id: &str) -> Result<Server> {
        self.get_json(&format!("/servers/{id}"), &[], "get server")
            .await
    }

    pub async fn get_server_status(&self, id: &str) -> Result<ServerStatus> {
        self.get_json(&format!("/servers/{id}/status"), &[], "get server status")
            .await
    }

    async fn server_action(
        &self,
        id: &str,
        req: &ServerActionRequest,
        endpoint: &'static str,
    ) -> Result<Server> {
        let resp = self
            .http
            .put(self.url(&format!("/servers/{id}/status/action")))
            .header("X-TOKEN", &self.token)
            .json(req)
            .send()
            .await?;

        Self::check(resp, endpoint)
            .await?
            .json()
            .await
            .map_err(Error::from)
    }

    pub async fn start_server(&self, id: &str) -> Result<Server> {
        let req = ServerActionRequest {
            action: ServerAction::PowerOn,
            method: ActionMethod::Software,
        };
        self.server_action(id, &req, "start server").await
    }

    /// Power the server off; `hardware` forces it instead of asking the guest.
    pub async fn shutdown_server(&self, id: &str, hardware: bool) -> Result<Server> {
        let req = ServerActionRequest {
            action: ServerAction::PowerOff,
            method: ActionMethod::forced(hardware),
        };
        self.server_action(id, &req, "shutdown server").await
    }

    pub async fn reboot_server(&self, id: &str, hardware: bool) -> Result<Server> {
        let req = ServerActionRequest {
            action: ServerAction::Reboot,
            method: ActionMethod::forced(hardware),
        };
        self.server_action(id, &req, "reboot server").await
    }

    /// Delete a server. A missing server surfaces as a not-found `Api` error;
    /// callers decide whether that counts as success.
    pub async fn delete_server(&self, id: &str, keep_ips: bool) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/servers/{id}")))
            .header("X-TOKEN", &self.token)
            .query(&[("keep_ips", keep_ips)])
            .send()
            .await?;

        Self::check(resp, "delete server").await?;
        Ok(())
    }
}
