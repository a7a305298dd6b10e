//! Transport-agnostic validation logic for Lobster documents.
//!
//! This crate holds everything the language server does besides speaking the
//! protocol: settings resolution, the compiler probe, the per-document
//! validation state machine, compiler invocation and quick-fix synthesis.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        lobster-lsp-core                          │
//! │                                                                  │
//! │  settings ──(first fetch)──► probe ──► state (ServerErrorState)  │
//! │      │                                        │                  │
//! │      ▼                                        ▼                  │
//! │  document (lifecycle) ◄──── diagnostics ◄── runner (subprocess)  │
//! │      │                                                           │
//! │      ▼                                                           │
//! │  quickfix (code table → edits)                                   │
//! └──────────────────────────────────────────────────────────────────┘
//!             │
//!             ▼
//! ┌───────────────────────┐
//! │      lobster-lsp      │
//! │  (tower-lsp server)   │
//! └───────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use lobster_lsp_core::{Document, DocumentStore, ProduceContext, produce, synthesize};
//!
//! let mut store = DocumentStore::new();
//! store.open(Document::new(uri, text, 1));
//! let (ticket, snapshot) = store.begin_validation(uri)?;
//! let diagnostics = produce(&ctx, &snapshot, &settings, &state).await;
//! let completion = store.complete_validation(&ticket, diagnostics)?;
//! ```

pub mod diagnostics;
pub mod document;
pub mod error;
pub mod probe;
pub mod quickfix;
pub mod runner;
pub mod settings;
pub mod state;
pub mod types;

// Re-export main types and functions for convenience
pub use diagnostics::{ProduceContext, produce};
pub use document::{
    Completion, ContentChange, Document, DocumentState, DocumentStore, ValidationTicket,
};
pub use error::{ConfigError, DocumentError, RunError};
pub use probe::{ProbeVerdict, probe_executable};
pub use quickfix::synthesize;
pub use runner::{CommandOutput, CompilerRunner, ProcessRunner};
pub use settings::{ConfigurationSource, LobsterSettings, SettingsOverride, SettingsResolver};
pub use state::{ErrorKind, ServerErrorState, Transition};
pub use types::{CodeAction, Diagnostic, DiagnosticSeverity, Position, Range, TextEdit};
