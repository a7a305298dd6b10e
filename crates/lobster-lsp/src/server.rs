//! LSP server implementation using tower-lsp.

use std::sync::{Arc, Mutex, PoisonError};

use tempfile::TempDir;
use tokio::sync::{RwLock, mpsc};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use lobster_lsp_core::document::{Completion, Document as CoreDocument, DocumentStore};
use lobster_lsp_core::settings::CONFIGURATION_SECTION;
use lobster_lsp_core::{
    CompilerRunner, ProcessRunner, ProduceContext, ServerErrorState, SettingsOverride,
    SettingsResolver, produce, synthesize,
};

use crate::capabilities::{server_capabilities, supports_configuration};
use crate::config::ServerConfig;
use crate::configuration::{ClientConfiguration, Prober};
use crate::convert;

/// The Lobster language server.
pub struct LobsterLanguageServer {
    /// The LSP client for sending notifications.
    client: Client,
    /// Document store for managing open documents.
    documents: Arc<RwLock<DocumentStore>>,
    settings: Arc<SettingsResolver>,
    error_state: Arc<RwLock<ServerErrorState>>,
    runner: Arc<dyn CompilerRunner>,
    prober: Prober,
    /// Taken by the probe worker once the client is initialized.
    probe_requests: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    config: ServerConfig,
    scratch: TempDir,
}

impl LobsterLanguageServer {
    /// Create a new language server instance.
    pub fn new(
        client: Client,
        config: ServerConfig,
        runner: Arc<dyn CompilerRunner>,
        scratch: TempDir,
    ) -> Self {
        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        let error_state = Arc::new(RwLock::new(ServerErrorState::None));
        let settings = SettingsResolver::new(
            Arc::new(ClientConfiguration::new(client.clone())),
            config.defaults.clone(),
            probe_tx,
        );
        let prober = Prober::new(
            client.clone(),
            Arc::clone(&runner),
            Arc::clone(&error_state),
            config.probe_timeout,
        );

        Self {
            client,
            documents: Arc::new(RwLock::new(DocumentStore::new())),
            settings: Arc::new(settings),
            error_state,
            runner,
            prober,
            probe_requests: Mutex::new(Some(probe_rx)),
            config,
            scratch,
        }
    }

    /// Validate a document and publish the result when it changes what the
    /// editor shows.
    async fn validate(&self, uri: &Url) {
        let begun = self.documents.write().await.begin_validation(uri.as_str());
        let (ticket, snapshot) = match begun {
            Ok(begun) => begun,
            Err(err) => {
                tracing::warn!(error = %err, "cannot validate");
                return;
            }
        };

        // Configuration pushes swap the global settings before resetting the
        // error state, so a state read first never pairs with stale settings.
        let state = self.error_state.read().await.clone();
        let settings = self
            .settings
            .resolve(uri.as_str(), snapshot.directory())
            .await;
        let ctx = ProduceContext {
            runner: self.runner.as_ref(),
            scratch_dir: self.scratch.path(),
            timeout: self.config.compile_timeout,
        };
        let diagnostics = produce(&ctx, &snapshot, &settings, &state).await;

        let completion = self
            .documents
            .write()
            .await
            .complete_validation(&ticket, diagnostics.clone());

        match completion {
            Ok(Completion::Settled { publish: true, .. }) => {
                let diagnostics = diagnostics.iter().map(convert::diagnostic_to_lsp).collect();
                self.client
                    .publish_diagnostics(uri.clone(), diagnostics, Some(ticket.version))
                    .await;
            }
            Ok(Completion::Settled { publish: false, .. }) => {
                tracing::debug!(%uri, "nothing new to publish");
            }
            Ok(Completion::Stale) => {}
            Err(err) => tracing::debug!(error = %err, "document closed while validating"),
        }
    }

    async fn validate_all(&self) {
        let uris: Vec<Url> = {
            let documents = self.documents.read().await;
            documents
                .uris()
                .filter_map(|uri| Url::parse(uri).ok())
                .collect()
        };
        for uri in uris {
            self.validate(&uri).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LobsterLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let has_configuration = supports_configuration(&params.capabilities);
        self.settings.set_configuration_capability(has_configuration);
        tracing::info!(has_configuration, "initializing");

        Ok(InitializeResult {
            capabilities: server_capabilities(),
            server_info: Some(ServerInfo {
                name: "lobster-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let requests = self
            .probe_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(requests) = requests {
            tokio::spawn(self.prober.clone().run(requests));
        }

        // Without per-document configuration nothing else would ever probe
        // the global executable.
        if !self.settings.has_configuration_capability() {
            let global = self.settings.global();
            self.settings.request_probe(&global.executable);
        }

        self.client
            .log_message(MessageType::INFO, "Lobster LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut document = CoreDocument::new(
            uri.as_str(),
            params.text_document.text,
            params.text_document.version,
        );
        if let Ok(path) = uri.to_file_path() {
            document = document.with_path(path);
        }

        self.documents.write().await.open(document);
        self.validate(&uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let changes = params
            .content_changes
            .into_iter()
            .map(convert::change_from_lsp);

        let changed = self
            .documents
            .write()
            .await
            .change(uri.as_str(), changes, params.text_document.version);
        if let Err(err) = changed {
            tracing::warn!(error = %err, "ignoring change");
            return;
        }

        self.validate(&uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        self.documents.write().await.close(uri.as_str());
        self.settings.forget(uri.as_str());

        // Clear diagnostics for closed document
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if let Some(section) = params.settings.get(CONFIGURATION_SECTION) {
            match serde_json::from_value::<SettingsOverride>(section.clone()) {
                Ok(over) => {
                    let global = self.config.defaults.overridden_by(&over);
                    tracing::info!(executable = %global.executable, "global settings changed");
                    self.settings.set_global(global);
                }
                Err(err) => tracing::warn!(error = %err, "ignoring malformed settings"),
            }
        }

        *self.error_state.write().await = ServerErrorState::reset();
        let executable = self.settings.global().executable;
        self.prober.probe(&executable).await;

        self.validate_all().await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;

        let state = self.error_state.read().await.clone();
        if state.is_errored() {
            tracing::debug!(
                reason = state.message().unwrap_or_default(),
                "server is errored; no code actions"
            );
            return Ok(Some(Vec::new()));
        }

        let documents = self.documents.read().await;
        let document = documents
            .require(uri.as_str())
            .map_err(|err| Error::invalid_params(err.to_string()))?;

        let diagnostics: Vec<_> = params
            .context
            .diagnostics
            .iter()
            .map(convert::diagnostic_from_lsp)
            .collect();
        let actions = synthesize(document, &diagnostics, &state)
            .iter()
            .map(|action| CodeActionOrCommand::CodeAction(convert::code_action_to_lsp(action, &uri)))
            .collect();

        Ok(Some(actions))
    }
}

/// Create the scratch directory compiled copies of documents live in.
pub fn scratch_dir() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix("lobster-lsp-").tempdir()
}

/// Run the LSP server over stdio.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let scratch = scratch_dir()?;
    tracing::info!(scratch = %scratch.path().display(), "starting Lobster language server");
    serve(config, scratch, tokio::io::stdin(), tokio::io::stdout()).await;
    Ok(())
}

/// Serve the protocol on arbitrary streams.
pub async fn serve<I, O>(config: ServerConfig, scratch: TempDir, input: I, output: O)
where
    I: tokio::io::AsyncRead + Unpin,
    O: tokio::io::AsyncWrite + Unpin,
{
    let runner: Arc<dyn CompilerRunner> = Arc::new(ProcessRunner);
    let (service, socket) = LspService::new(move |client| {
        LobsterLanguageServer::new(client, config, runner, scratch)
    });
    Server::new(input, output, socket).serve(service).await;
}
