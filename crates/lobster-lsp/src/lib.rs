//! Lobster Language Server Protocol implementation.
//!
//! This crate provides the LSP server for Lobster source files, wrapping
//! `lobster-lsp-core` with the tower-lsp framework.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                          lobster-lsp                            │
//! │        tower-lsp wrapper, JSON-RPC/stdio, probe worker          │
//! │                                                                 │
//! │  ┌──────────────┐ ┌─────────────┐ ┌──────────────────────────┐  │
//! │  │  server.rs   │ │ convert.rs  │ │ capabilities.rs          │  │
//! │  │LanguageServer│ │ Core ↔ LSP  │ │ configuration.rs         │  │
//! │  └──────┬───────┘ └──────┬──────┘ └──────────────────────────┘  │
//! │         └────────────────┴─────────────────┐                    │
//! │  ┌─────────────────────────────────────────▼─────────────────┐  │
//! │  │                     lobster-lsp-core                       │  │
//! │  │   settings, probing, documents, diagnostics, quick fixes   │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! The server is started by the `lobster-ls` binary:
//!
//! ```bash
//! lobster-ls --stdio --executable /opt/lobster/bin/lobster
//! ```
//!
//! Or programmatically:
//!
//! ```rust,ignore
//! lobster_lsp::run_server(lobster_lsp::ServerConfig::default()).await?;
//! ```

pub mod capabilities;
pub mod config;
pub mod configuration;
pub mod convert;
pub mod server;

pub use config::ServerConfig;
pub use server::run_server;
