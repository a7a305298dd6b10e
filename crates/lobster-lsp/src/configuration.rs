//! Editor-backed settings source and the background compiler probe.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tower_lsp::Client;
use tower_lsp::lsp_types::{ConfigurationItem, MessageType, Url};

use lobster_lsp_core::settings::CONFIGURATION_SECTION;
use lobster_lsp_core::{
    CompilerRunner, ConfigError, ConfigurationSource, ServerErrorState, SettingsOverride,
    probe_executable,
};

/// Fetches the `lobster` section through `workspace/configuration`.
pub struct ClientConfiguration {
    client: Client,
}

impl ClientConfiguration {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[tower_lsp::async_trait]
impl ConfigurationSource for ClientConfiguration {
    async fn fetch(&self, uri: &str) -> Result<Option<SettingsOverride>, ConfigError> {
        let item = ConfigurationItem {
            scope_uri: Url::parse(uri).ok(),
            section: Some(CONFIGURATION_SECTION.to_string()),
        };
        let values = self
            .client
            .configuration(vec![item])
            .await
            .map_err(|err| ConfigError::Request(err.to_string()))?;

        match values.into_iter().next() {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }
}

/// Probes executables and records the verdict in the shared error state.
#[derive(Clone)]
pub struct Prober {
    client: Client,
    runner: Arc<dyn CompilerRunner>,
    error_state: Arc<RwLock<ServerErrorState>>,
    timeout: Duration,
}

impl Prober {
    pub fn new(
        client: Client,
        runner: Arc<dyn CompilerRunner>,
        error_state: Arc<RwLock<ServerErrorState>>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            runner,
            error_state,
            timeout,
        }
    }

    /// Probe `executable`, telling the user the first time it turns out invalid.
    pub async fn probe(&self, executable: &str) {
        let verdict = probe_executable(self.runner.as_ref(), executable, self.timeout).await;

        let transition = {
            let mut state = self.error_state.write().await;
            let transition = state.after_probe(&verdict);
            *state = transition.state.clone();
            transition
        };

        if let Some(message) = transition.notify {
            self.client.show_message(MessageType::ERROR, message).await;
        }
    }

    /// Serve probe requests until every sender is gone.
    pub async fn run(self, mut requests: mpsc::UnboundedReceiver<String>) {
        while let Some(executable) = requests.recv().await {
            self.probe(&executable).await;
        }
        tracing::debug!("probe worker stopped");
    }
}
