//! Open documents and their validation lifecycle.
//!
//! Each open document moves through
//! `Unvalidated -> Validating -> HasErrors | NoErrors`, going back through
//! `Validating` on every edit. A validation pass is identified by a
//! store-wide generation stamp taken when it starts; only the most recently
//! started pass for a document may settle it. Results from superseded passes,
//! or for a document closed (and possibly reopened) in the meantime, are
//! discarded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::DocumentError;
use crate::types::{Diagnostic, DiagnosticSeverity, Position, Range};

/// Validation status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentState {
    Unvalidated,
    Validating,
    HasErrors,
    NoErrors,
}

/// One content change sent by the editor.
///
/// `range: None` replaces the whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub range: Option<Range>,
    pub text: String,
}

impl ContentChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn incremental(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }
}

/// An open document.
#[derive(Debug, Clone)]
pub struct Document {
    /// The document's URI.
    uri: String,
    /// Filesystem location, when the URI is a `file:` URI.
    path: Option<PathBuf>,
    /// The document content.
    content: String,
    /// Version number supplied by the editor.
    version: i32,
    state: DocumentState,
    /// Diagnostics from the last completed validation pass.
    diagnostics: Vec<Diagnostic>,
    /// Stamp of the latest open or validation start.
    generation: u64,
}

impl Document {
    /// Create a new, unvalidated document.
    pub fn new(uri: impl Into<String>, content: impl Into<String>, version: i32) -> Self {
        Self {
            uri: uri.into(),
            path: None,
            content: content.into(),
            version,
            state: DocumentState::Unvalidated,
            diagnostics: Vec::new(),
            generation: 0,
        }
    }

    /// Attach the document's filesystem path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Get the document's URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Directory containing the document, if it lives on disk.
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Get the document's content.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the filename from the URI (for display purposes).
    pub fn filename(&self) -> &str {
        self.uri.rsplit(['/', '\\']).next().unwrap_or(&self.uri)
    }

    /// True when the last pass reported at least one error, as opposed to
    /// warnings only. Quick fixes are not offered for such documents.
    pub fn has_structural_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == DiagnosticSeverity::Error)
    }

    /// Apply editor changes in order and move to `version`.
    pub fn apply_changes(&mut self, changes: impl IntoIterator<Item = ContentChange>, version: i32) {
        for change in changes {
            match change.range {
                None => self.content = change.text,
                Some(range) => {
                    let start = self.offset_at(range.start);
                    let end = self.offset_at(range.end).max(start);
                    self.content.replace_range(start..end, &change.text);
                }
            }
        }
        self.version = version;
    }

    /// Byte offset of `pos`, clamped to the end of its line (or the document).
    pub fn offset_at(&self, pos: Position) -> usize {
        let mut line_start = 0;
        for _ in 0..pos.line {
            match self.content[line_start..].find('\n') {
                Some(i) => line_start += i + 1,
                None => return self.content.len(),
            }
        }

        let line_end = self.content[line_start..]
            .find('\n')
            .map_or(self.content.len(), |i| line_start + i);

        let mut units = 0;
        for (i, ch) in self.content[line_start..line_end].char_indices() {
            if units >= pos.character {
                return line_start + i;
            }
            units += ch.len_utf16() as u32;
        }
        line_end
    }

    /// Position of the byte offset `offset`, which must be a char boundary.
    pub fn position_at(&self, offset: usize) -> Position {
        let before = &self.content[..offset.min(self.content.len())];
        let line = before.matches('\n').count() as u32;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let character = before[line_start..].encode_utf16().count() as u32;
        Position::new(line, character)
    }

    /// Text covered by `range`.
    pub fn text_in_range(&self, range: Range) -> &str {
        let start = self.offset_at(range.start);
        let end = self.offset_at(range.end).max(start);
        &self.content[start..end]
    }

    /// Range covering the text of `line` without its line terminator.
    ///
    /// Lines past the end of the document map to an empty range at the end.
    pub fn line_range(&self, line: u32) -> Range {
        let start = self.offset_at(Position::new(line, 0));
        let rest = &self.content[start..];
        let len = rest.find('\n').unwrap_or(rest.len());
        let text = rest[..len].trim_end_matches('\r');
        let start_pos = self.position_at(start);
        Range::new(
            start_pos,
            Position::new(
                start_pos.line,
                start_pos.character + text.encode_utf16().count() as u32,
            ),
        )
    }
}

/// Handle for an in-flight validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub uri: String,
    /// Document version the pass compiles, reported with its diagnostics.
    pub version: i32,
    generation: u64,
}

/// What to do with a finished validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The result was stored; publish it when `publish` is true.
    Settled {
        state: DocumentState,
        publish: bool,
    },
    /// A newer pass started, or the document was reopened, while
    /// validating; the result was dropped.
    Stale,
}

/// A document store for managing multiple documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Document>,
    /// Last generation handed out. Never reused, even across close and reopen.
    generation: u64,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace a document.
    pub fn open(&mut self, mut document: Document) {
        document.generation = self.next_generation();
        self.documents.insert(document.uri.clone(), document);
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Apply content changes to an open document.
    pub fn change(
        &mut self,
        uri: &str,
        changes: impl IntoIterator<Item = ContentChange>,
        version: i32,
    ) -> Result<(), DocumentError> {
        self.get_mut(uri)?.apply_changes(changes, version);
        Ok(())
    }

    /// Close a document (remove from store).
    pub fn close(&mut self, uri: &str) -> Option<Document> {
        self.documents.remove(uri)
    }

    /// Get a document by URI.
    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    /// Get a document by URI, failing for unknown URIs.
    pub fn require(&self, uri: &str) -> Result<&Document, DocumentError> {
        self.documents
            .get(uri)
            .ok_or_else(|| DocumentError::NotOpen(uri.to_string()))
    }

    fn get_mut(&mut self, uri: &str) -> Result<&mut Document, DocumentError> {
        self.documents
            .get_mut(uri)
            .ok_or_else(|| DocumentError::NotOpen(uri.to_string()))
    }

    /// Mark a document as validating and return a snapshot to validate.
    pub fn begin_validation(
        &mut self,
        uri: &str,
    ) -> Result<(ValidationTicket, Document), DocumentError> {
        let generation = self.next_generation();
        let doc = self.get_mut(uri)?;
        doc.state = DocumentState::Validating;
        doc.generation = generation;
        tracing::debug!(uri, version = doc.version, generation, "validation started");
        let ticket = ValidationTicket {
            uri: uri.to_string(),
            version: doc.version,
            generation,
        };
        Ok((ticket, doc.clone()))
    }

    /// Store the result of a validation pass.
    ///
    /// State and diagnostics change together. An empty result is only worth
    /// publishing when the editor is still showing diagnostics from an
    /// earlier pass.
    pub fn complete_validation(
        &mut self,
        ticket: &ValidationTicket,
        diagnostics: Vec<Diagnostic>,
    ) -> Result<Completion, DocumentError> {
        let doc = self.get_mut(&ticket.uri)?;
        if doc.generation != ticket.generation || doc.version != ticket.version {
            tracing::debug!(
                uri = %ticket.uri,
                stale = ticket.generation,
                current = doc.generation,
                "dropping stale validation result"
            );
            return Ok(Completion::Stale);
        }

        let had_diagnostics = !doc.diagnostics.is_empty();
        let publish = had_diagnostics || !diagnostics.is_empty();
        doc.state = if diagnostics.is_empty() {
            DocumentState::NoErrors
        } else {
            DocumentState::HasErrors
        };
        doc.diagnostics = diagnostics;

        tracing::debug!(uri = %ticket.uri, state = ?doc.state, publish, "validation settled");
        Ok(Completion::Settled {
            state: doc.state,
            publish,
        })
    }

    /// Get all document URIs.
    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "file:///work/game.lobster";

    fn error_at(line: u32) -> Diagnostic {
        Diagnostic::new(
            Range::point(Position::new(line, 0)),
            DiagnosticSeverity::Error,
            "unknown identifier: y",
        )
    }

    fn store_with(text: &str) -> DocumentStore {
        let mut store = DocumentStore::new();
        store.open(Document::new(URI, text, 1).with_path("/work/game.lobster"));
        store
    }

    #[test]
    fn document_creation() {
        let doc = Document::new(URI, "var x = 1", 1).with_path("/work/game.lobster");
        assert_eq!(doc.filename(), "game.lobster");
        assert_eq!(doc.directory(), Some(Path::new("/work")));
        assert_eq!(doc.state(), DocumentState::Unvalidated);
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn full_and_incremental_changes() {
        let mut doc = Document::new(URI, "var x = 1\nprint(x)\n", 1);
        doc.apply_changes(
            [ContentChange::incremental(
                Range::new(Position::new(0, 0), Position::new(0, 3)),
                "let",
            )],
            2,
        );
        assert_eq!(doc.content(), "let x = 1\nprint(x)\n");
        assert_eq!(doc.version(), 2);

        doc.apply_changes([ContentChange::full("print(1)")], 3);
        assert_eq!(doc.content(), "print(1)");
    }

    #[test]
    fn utf16_positions() {
        // 'é' is one UTF-16 unit but two bytes; '𝄞' is two units and four bytes.
        let doc = Document::new(URI, "é𝄞x\nvar", 1);
        assert_eq!(doc.offset_at(Position::new(0, 1)), 2);
        assert_eq!(doc.offset_at(Position::new(0, 3)), 6);
        assert_eq!(doc.position_at(6), Position::new(0, 3));
        assert_eq!(doc.position_at(doc.content().len()), Position::new(1, 3));
        // Past the end of a line clamps to the line end.
        assert_eq!(doc.offset_at(Position::new(0, 99)), 7);
        // Past the last line clamps to the document end.
        assert_eq!(doc.offset_at(Position::new(9, 0)), doc.content().len());
    }

    #[test]
    fn line_range_excludes_terminator() {
        let doc = Document::new(URI, "a = 1\r\nvar x = 1\n", 1);
        assert_eq!(
            doc.line_range(0),
            Range::new(Position::new(0, 0), Position::new(0, 5))
        );
        assert_eq!(doc.text_in_range(doc.line_range(1)), "var x = 1");
    }

    #[test]
    fn validation_settles_to_has_errors_then_no_errors() {
        let mut store = store_with("x = y");

        let (ticket, _) = store.begin_validation(URI).unwrap();
        assert_eq!(store.get(URI).unwrap().state(), DocumentState::Validating);
        assert_eq!(
            store.complete_validation(&ticket, vec![error_at(0)]).unwrap(),
            Completion::Settled {
                state: DocumentState::HasErrors,
                publish: true
            }
        );

        store
            .change(URI, [ContentChange::full("x = 1")], 2)
            .unwrap();
        let (ticket, _) = store.begin_validation(URI).unwrap();
        // Old diagnostics stay attached until the new pass completes.
        assert_eq!(store.get(URI).unwrap().diagnostics().len(), 1);
        assert_eq!(
            store.complete_validation(&ticket, Vec::new()).unwrap(),
            Completion::Settled {
                state: DocumentState::NoErrors,
                publish: true
            }
        );
        assert!(store.get(URI).unwrap().diagnostics().is_empty());
    }

    #[test]
    fn clean_first_validation_is_not_published() {
        let mut store = store_with("x = 1");
        let (ticket, _) = store.begin_validation(URI).unwrap();
        assert_eq!(
            store.complete_validation(&ticket, Vec::new()).unwrap(),
            Completion::Settled {
                state: DocumentState::NoErrors,
                publish: false
            }
        );
    }

    #[test]
    fn stale_result_is_dropped() {
        let mut store = store_with("x = y");
        let (old, _) = store.begin_validation(URI).unwrap();
        store
            .change(URI, [ContentChange::full("x = 1")], 2)
            .unwrap();
        let (new, _) = store.begin_validation(URI).unwrap();

        assert_eq!(
            store.complete_validation(&old, vec![error_at(0)]).unwrap(),
            Completion::Stale
        );
        assert_eq!(store.get(URI).unwrap().state(), DocumentState::Validating);

        store.complete_validation(&new, Vec::new()).unwrap();
        assert_eq!(store.get(URI).unwrap().state(), DocumentState::NoErrors);
    }

    #[test]
    fn overlapping_passes_at_the_same_version_keep_the_newest() {
        let mut store = store_with("x = y");
        let (older, _) = store.begin_validation(URI).unwrap();
        // Revalidation of an unchanged document, e.g. after a settings push.
        let (newer, _) = store.begin_validation(URI).unwrap();
        assert_eq!(older.version, newer.version);

        assert_eq!(
            store.complete_validation(&newer, Vec::new()).unwrap(),
            Completion::Settled {
                state: DocumentState::NoErrors,
                publish: false
            }
        );
        assert_eq!(
            store.complete_validation(&older, vec![error_at(0)]).unwrap(),
            Completion::Stale
        );
        let doc = store.get(URI).unwrap();
        assert_eq!(doc.state(), DocumentState::NoErrors);
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn result_from_before_reopen_is_dropped() {
        let mut store = store_with("x = y");
        let (ticket, _) = store.begin_validation(URI).unwrap();
        store.close(URI);
        store.open(Document::new(URI, "x = 1", 1));

        assert_eq!(
            store.complete_validation(&ticket, vec![error_at(0)]).unwrap(),
            Completion::Stale
        );
        let doc = store.get(URI).unwrap();
        assert_eq!(doc.state(), DocumentState::Unvalidated);
        assert!(doc.diagnostics().is_empty());
    }

    #[test]
    fn result_for_closed_document_is_rejected() {
        let mut store = store_with("x = y");
        let (ticket, _) = store.begin_validation(URI).unwrap();
        assert!(store.close(URI).is_some());
        assert_eq!(
            store.complete_validation(&ticket, Vec::new()),
            Err(DocumentError::NotOpen(URI.to_string()))
        );
        assert!(store.get(URI).is_none());
    }

    #[test]
    fn structural_errors_ignore_warnings() {
        let mut store = store_with("var x = 1");
        let (ticket, _) = store.begin_validation(URI).unwrap();
        let warning = Diagnostic::new(
            Range::point(Position::new(0, 0)),
            DiagnosticSeverity::Warning,
            "use `let` to declare: x",
        );
        store.complete_validation(&ticket, vec![warning]).unwrap();
        let doc = store.get(URI).unwrap();
        assert_eq!(doc.state(), DocumentState::HasErrors);
        assert!(!doc.has_structural_errors());
    }
}
