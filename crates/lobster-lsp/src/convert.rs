//! Conversion between lobster-lsp-core types and tower_lsp::lsp_types.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    CodeAction as LspCodeAction, CodeActionKind, Diagnostic as LspDiagnostic,
    DiagnosticSeverity as LspSeverity, NumberOrString, Position as LspPosition, Range as LspRange,
    TextDocumentContentChangeEvent, TextEdit as LspTextEdit, Url, WorkspaceEdit,
};

use lobster_lsp_core::document::ContentChange;
use lobster_lsp_core::types::{
    CodeAction, Diagnostic, DiagnosticSeverity, Position, Range, TextEdit,
};

/// Convert a lobster-lsp-core Position to an lsp-types Position.
pub fn position_to_lsp(pos: &Position) -> LspPosition {
    LspPosition {
        line: pos.line,
        character: pos.character,
    }
}

/// Convert a lobster-lsp-core Range to an lsp-types Range.
pub fn range_to_lsp(range: &Range) -> LspRange {
    LspRange {
        start: position_to_lsp(&range.start),
        end: position_to_lsp(&range.end),
    }
}

pub fn position_from_lsp(pos: &LspPosition) -> Position {
    Position::new(pos.line, pos.character)
}

pub fn range_from_lsp(range: &LspRange) -> Range {
    Range::new(position_from_lsp(&range.start), position_from_lsp(&range.end))
}

/// Convert a lobster-lsp-core DiagnosticSeverity to an lsp-types DiagnosticSeverity.
pub fn severity_to_lsp(severity: &DiagnosticSeverity) -> LspSeverity {
    match severity {
        DiagnosticSeverity::Error => LspSeverity::ERROR,
        DiagnosticSeverity::Warning => LspSeverity::WARNING,
        DiagnosticSeverity::Information => LspSeverity::INFORMATION,
        DiagnosticSeverity::Hint => LspSeverity::HINT,
    }
}

/// Severity of a diagnostic sent by the client. Missing or unknown
/// severities count as errors.
pub fn severity_from_lsp(severity: Option<LspSeverity>) -> DiagnosticSeverity {
    match severity {
        Some(LspSeverity::WARNING) => DiagnosticSeverity::Warning,
        Some(LspSeverity::INFORMATION) => DiagnosticSeverity::Information,
        Some(LspSeverity::HINT) => DiagnosticSeverity::Hint,
        _ => DiagnosticSeverity::Error,
    }
}

/// Convert a lobster-lsp-core Diagnostic to an lsp-types Diagnostic.
pub fn diagnostic_to_lsp(diag: &Diagnostic) -> LspDiagnostic {
    LspDiagnostic {
        range: range_to_lsp(&diag.range),
        severity: Some(severity_to_lsp(&diag.severity)),
        code: diag.code.clone().map(NumberOrString::String),
        code_description: None,
        source: diag.source.clone(),
        message: diag.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert a diagnostic from a code-action request back to the core type.
pub fn diagnostic_from_lsp(diag: &LspDiagnostic) -> Diagnostic {
    Diagnostic {
        range: range_from_lsp(&diag.range),
        severity: severity_from_lsp(diag.severity),
        code: diag.code.as_ref().map(|code| match code {
            NumberOrString::String(s) => s.clone(),
            NumberOrString::Number(n) => n.to_string(),
        }),
        source: diag.source.clone(),
        message: diag.message.clone(),
    }
}

pub fn change_from_lsp(change: TextDocumentContentChangeEvent) -> ContentChange {
    match change.range {
        Some(range) => ContentChange::incremental(range_from_lsp(&range), change.text),
        None => ContentChange::full(change.text),
    }
}

pub fn text_edit_to_lsp(edit: &TextEdit) -> LspTextEdit {
    LspTextEdit::new(range_to_lsp(&edit.range), edit.new_text.clone())
}

/// Convert a quick fix into an lsp-types CodeAction editing `uri`.
pub fn code_action_to_lsp(action: &CodeAction, uri: &Url) -> LspCodeAction {
    let edits = action.edits.iter().map(text_edit_to_lsp).collect();
    LspCodeAction {
        title: action.title.clone(),
        kind: Some(CodeActionKind::QUICKFIX),
        diagnostics: Some(action.diagnostics.iter().map(diagnostic_to_lsp).collect()),
        edit: Some(WorkspaceEdit::new(HashMap::from([(uri.clone(), edits)]))),
        command: None,
        is_preferred: Some(action.is_preferred),
        disabled: None,
        data: None,
    }
}
