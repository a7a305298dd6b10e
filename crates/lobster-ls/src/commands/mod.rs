//! Command implementations for the Lobster language server binary.

pub mod lsp;
