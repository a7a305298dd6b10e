//! LSP capability negotiation.

use tower_lsp::lsp_types::{
    ClientCapabilities, CodeActionKind, CodeActionOptions, CodeActionProviderCapability,
    ServerCapabilities, TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
};

/// Get the server capabilities to report to the client.
pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::INCREMENTAL),
                will_save: None,
                will_save_wait_until: None,
                save: None,
            },
        )),

        code_action_provider: Some(CodeActionProviderCapability::Options(CodeActionOptions {
            code_action_kinds: Some(vec![CodeActionKind::QUICKFIX]),
            work_done_progress_options: Default::default(),
            resolve_provider: None,
        })),

        ..Default::default()
    }
}

/// Whether the client answers `workspace/configuration` requests.
pub fn supports_configuration(client: &ClientCapabilities) -> bool {
    client
        .workspace
        .as_ref()
        .and_then(|workspace| workspace.configuration)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::WorkspaceClientCapabilities;

    #[test]
    fn capabilities_include_incremental_sync() {
        let caps = server_capabilities();
        let Some(TextDocumentSyncCapability::Options(options)) = caps.text_document_sync else {
            panic!("expected sync options");
        };
        assert_eq!(options.change, Some(TextDocumentSyncKind::INCREMENTAL));
        assert_eq!(options.open_close, Some(true));
    }

    #[test]
    fn capabilities_include_quick_fixes() {
        let caps = server_capabilities();
        let Some(CodeActionProviderCapability::Options(options)) = caps.code_action_provider else {
            panic!("expected code action options");
        };
        assert_eq!(options.code_action_kinds, Some(vec![CodeActionKind::QUICKFIX]));
    }

    #[test]
    fn configuration_support_detection() {
        assert!(!supports_configuration(&ClientCapabilities::default()));

        let client = ClientCapabilities {
            workspace: Some(WorkspaceClientCapabilities {
                configuration: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(supports_configuration(&client));
    }
}
