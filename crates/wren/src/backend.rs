//
// backend.rs
//
// LanguageServer implementation: notification bookkeeping and request
// delegation to `handlers`
//

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::checker::parse_checker_output;
use crate::config::parse_config;
use crate::error::ConfigError;
use crate::handlers;
use crate::state::WorldState;

pub const OPEN_INCLUDE_COMMAND: &str = "wren.openInclude";
pub const INSERT_HEADER_COMMAND: &str = "wren.insertHeader";

/// Parameters for the wren/checkerOutput notification
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckerOutputParams {
    uri: Url,
    output: String,
}

/// `[uri, line]` arguments shared by both commands
fn command_target(arguments: &[Value]) -> Option<(Url, u32)> {
    let uri = Url::parse(arguments.first()?.as_str()?).ok()?;
    let line = u32::try_from(arguments.get(1)?.as_u64()?).ok()?;
    Some((uri, line))
}

pub struct Backend {
    client: Client,
    state: Arc<RwLock<WorldState>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(WorldState::default())),
        }
    }

    async fn report_config_errors(&self, errors: Vec<ConfigError>) {
        for error in errors {
            log::warn!("{}", error);
            self.client
                .show_message(MessageType::WARNING, error.to_string())
                .await;
        }
    }

    async fn apply_settings(&self, settings: &Value) {
        let (config, errors) = parse_config(settings);
        let fresh = {
            let mut state = self.state.write().await;
            state.apply_config(config, errors)
        };
        self.report_config_errors(fresh).await;
    }

    async fn open_include(&self, arguments: &[Value]) -> Option<Value> {
        let Some((uri, line)) = command_target(arguments) else {
            log::warn!("{}: expected [uri, line] arguments", OPEN_INCLUDE_COMMAND);
            return None;
        };
        let result = {
            let state = self.state.read().await;
            handlers::open_include(&state, &uri, line)
        };
        match result {
            Ok(target) => serde_json::to_value(target).ok(),
            Err(e) => {
                log::trace!("{}: {}", OPEN_INCLUDE_COMMAND, e);
                self.client.show_message(MessageType::ERROR, e.to_string()).await;
                None
            }
        }
    }

    async fn insert_header(&self, arguments: &[Value]) -> Option<Value> {
        let Some((uri, line)) = command_target(arguments) else {
            log::warn!("{}: expected [uri, line] arguments", INSERT_HEADER_COMMAND);
            return None;
        };
        let edit = {
            let state = self.state.read().await;
            handlers::insert_header(&state, &uri, line)
        }?;
        match self.client.apply_edit(edit).await {
            Ok(response) if !response.applied => {
                log::warn!(
                    "Header edit rejected: {}",
                    response.failure_reason.unwrap_or_default()
                );
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to apply header edit: {}", e),
        }
        None
    }

    /// Handle the wren/checkerOutput notification
    async fn handle_checker_output(&self, params: CheckerOutputParams) {
        log::trace!("Received checker output for {}", params.uri);
        let report = parse_checker_output(&params.output);

        let publish = {
            let mut state = self.state.write().await;
            let publish = handlers::checker_diagnostics(&report, &state.checker_published);
            state.checker_published = publish
                .iter()
                .filter(|(_, diagnostics)| !diagnostics.is_empty())
                .map(|(uri, _)| uri.clone())
                .collect();
            publish
        };

        for (uri, diagnostics) in publish {
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing wren");

        let mut folders = Vec::new();
        if let Some(workspace_folders) = params.workspace_folders {
            for folder in workspace_folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                folders.push(folder.uri);
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            folders.push(root_uri);
        }
        self.state.write().await.set_workspace_folders(folders);

        if let Some(options) = &params.initialization_options {
            self.apply_settings(options).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                        ..Default::default()
                    },
                )),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![String::from("$"), String::from("@")]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec![String::from("("), String::from(",")]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        OPEN_INCLUDE_COMMAND.to_string(),
                        INSERT_HEADER_COMMAND.to_string(),
                    ],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("wren"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("wren initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("wren shutting down");
        crate::perf::log_metrics_summary();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        log::trace!("Opened {}", doc.uri);
        let mut state = self.state.write().await;
        state.open_document(doc.uri, &doc.text, Some(doc.version));
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut state = self.state.write().await;
        for change in params.content_changes {
            state.apply_change(&uri, change);
        }
        if let Some(doc) = state.documents.get_mut(&uri) {
            doc.version = Some(params.text_document.version);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let mut state = self.state.write().await;
        state.close_document(&params.text_document.uri);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Ok(path) = params.text_document.uri.to_file_path() else {
            return;
        };
        let state = self.state.read().await;
        state.on_file_changed_on_disk(&path, FileChangeType::CHANGED);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        log::trace!(
            "Received watched files change: {} changes",
            params.changes.len()
        );
        let state = self.state.read().await;
        for change in &params.changes {
            match change.uri.to_file_path() {
                Ok(path) => state.on_file_changed_on_disk(&path, change.typ),
                Err(()) => log::trace!("Ignoring non-file change: {}", change.uri),
            }
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");
        self.apply_settings(&params.settings).await;
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        match params.command.as_str() {
            OPEN_INCLUDE_COMMAND => Ok(self.open_include(&params.arguments).await),
            INSERT_HEADER_COMMAND => Ok(self.insert_header(&params.arguments).await),
            other => {
                log::warn!("Unknown command: {}", other);
                Ok(None)
            }
        }
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let state = self.state.read().await;
        Ok(handlers::document_symbol(&state, &params.text_document.uri))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        // Build outside the lock
        let (index, file_cache, config, roots) = {
            let state = self.state.read().await;
            (
                state.workspace_symbols.clone(),
                state.file_cache.clone(),
                state.config.clone(),
                state.workspace_roots(),
            )
        };

        let entries =
            tokio::task::spawn_blocking(move || index.build(&roots, &config, &file_cache))
                .await
                .unwrap_or_default();
        Ok(Some(handlers::workspace_symbol_results(
            &entries,
            &params.query,
        )))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let state = self.state.read().await;
        Ok(handlers::completion(
            &state,
            &params.text_document_position.text_document.uri,
            params.text_document_position.position,
        ))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let state = self.state.read().await;
        Ok(handlers::hover(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let state = self.state.read().await;
        Ok(handlers::signature_help(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let state = self.state.read().await;
        Ok(handlers::goto_definition(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method("wren/checkerOutput", Backend::handle_checker_output)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
