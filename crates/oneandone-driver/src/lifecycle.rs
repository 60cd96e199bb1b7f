use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::{CloudApi, Error, Result};

/// The state vocabulary reported upward, independent of the provider's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CanonicalState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
    Unknown,
}

impl CanonicalState {
    pub fn from_provider(status: &str) -> Self {
        match status {
            "POWERING_ON" => Self::Starting,
            "POWERED_ON" => Self::Running,
            "POWERING_OFF" => Self::Stopping,
            "POWERED_OFF" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CanonicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Result of a state query. A failed query still reports a state
/// ([`CanonicalState::Error`]) next to the underlying error.
#[derive(Debug)]
pub struct StateQuery {
    pub state: CanonicalState,
    pub error: Option<Error>,
}

impl StateQuery {
    pub fn into_result(self) -> Result<CanonicalState> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.state),
        }
    }
}

impl From<Result<CanonicalState>> for StateQuery {
    fn from(result: Result<CanonicalState>) -> Self {
        match result {
            Ok(state) => Self { state, error: None },
            Err(err) => Self {
                state: CanonicalState::Error,
                error: Some(err),
            },
        }
    }
}

/// State-guarded power operations on one existing server.
///
/// Every transition queries the current state first and turns into a logged
/// no-op when the server is already where it was asked to go.
pub struct Lifecycle<'a, A: CloudApi + ?Sized> {
    api: &'a A,
    server_id: &'a str,
}

impl<'a, A: CloudApi + ?Sized> Lifecycle<'a, A> {
    pub fn new(api: &'a A, server_id: &'a str) -> Self {
        Self { api, server_id }
    }

    pub async fn state(&self) -> StateQuery {
        let result = self
            .api
            .get_server_status(self.server_id)
            .await
            .map(|status| CanonicalState::from_provider(&status.state))
            .map_err(Error::from);
        result.into()
    }

    async fn current(&self) -> Result<CanonicalState> {
        self.state().await.into_result()
    }

    pub async fn start(&self) -> Result<()> {
        let state = self.current().await?;
        if matches!(state, CanonicalState::Running | CanonicalState::Starting) {
            info!(server_id = self.server_id, %state, "host is already running or starting");
            return Ok(());
        }

        debug!(server_id = self.server_id, "starting server");
        self.api.start_server(self.server_id).await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if self.current().await? == CanonicalState::Stopped {
            info!(server_id = self.server_id, "host is already stopped");
            return Ok(());
        }

        debug!(server_id = self.server_id, "stopping server");
        self.api.shutdown_server(self.server_id, false).await?;
        Ok(())
    }

    pub async fn restart(&self) -> Result<()> {
        if self.current().await? == CanonicalState::Stopped {
            info!(
                server_id = self.server_id,
                "host is already stopped, use start to run it"
            );
            return Ok(());
        }

        debug!(server_id = self.server_id, "restarting server");
        self.api.reboot_server(self.server_id, false).await?;
        Ok(())
    }

    /// Hardware power-off.
    pub async fn kill(&self) -> Result<()> {
        if self.current().await? == CanonicalState::Stopped {
            info!(server_id = self.server_id, "host is already stopped");
            return Ok(());
        }

        debug!(server_id = self.server_id, "killing server");
        self.api.shutdown_server(self.server_id, true).await?;
        Ok(())
    }

    /// Delete the server and release its IPs. A server the provider no
    /// longer knows counts as removed.
    pub async fn remove(&self) -> Result<()> {
        debug!(server_id = self.server_id, "removing server");

        match self.api.delete_server(self.server_id, false).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!(
                    server_id = self.server_id,
                    "server doesn't exist, assuming it is already deleted"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
