//! Quick fixes for compiler diagnostics.
//!
//! Fixes are looked up by diagnostic code in [`QUICK_FIXES`]. Diagnostics that
//! reach us without one of our codes (for example when the editor sends back
//! a diagnostic it stored) are classified from their message text with the
//! same table.

use crate::document::Document;
use crate::state::ServerErrorState;
use crate::types::{CodeAction, Diagnostic, Range, TextEdit};

/// Diagnostic codes attached by the diagnostic producer.
pub mod codes {
    /// A `var` that is never reassigned.
    pub const PREFER_LET: &str = "prefer-let";
    /// Any other compiler diagnostic.
    pub const COMPILER: &str = "lobster";
    /// The compiler could not be run or crashed.
    pub const COMPILER_FAILURE: &str = "compiler-failure";
}

struct QuickFix {
    code: &'static str,
    message_prefix: &'static str,
    title: &'static str,
    edits: fn(&Document, &Diagnostic) -> Option<Vec<TextEdit>>,
}

static QUICK_FIXES: &[QuickFix] = &[QuickFix {
    code: codes::PREFER_LET,
    message_prefix: "use `let` to declare",
    title: "Make variable constant",
    edits: var_to_let,
}];

/// Code for a known fixable message, if any.
pub fn classify(message: &str) -> Option<&'static str> {
    QUICK_FIXES
        .iter()
        .find(|fix| message.starts_with(fix.message_prefix))
        .map(|fix| fix.code)
}

fn lookup(diagnostic: &Diagnostic) -> Option<&'static QuickFix> {
    let by_code = diagnostic
        .code
        .as_deref()
        .and_then(|code| QUICK_FIXES.iter().find(|fix| fix.code == code));
    by_code.or_else(|| {
        QUICK_FIXES
            .iter()
            .find(|fix| diagnostic.message.starts_with(fix.message_prefix))
    })
}

/// Propose fixes for `diagnostics` in `doc`.
///
/// Nothing is proposed while the server is errored or while the document's
/// last validation reported errors.
pub fn synthesize(
    doc: &Document,
    diagnostics: &[Diagnostic],
    state: &ServerErrorState,
) -> Vec<CodeAction> {
    if state.is_errored() {
        tracing::debug!(
            uri = doc.uri(),
            reason = state.message().unwrap_or_default(),
            "server is errored; no code actions"
        );
        return Vec::new();
    }
    if doc.has_structural_errors() {
        tracing::debug!(uri = doc.uri(), "document has errors; no code actions");
        return Vec::new();
    }

    diagnostics
        .iter()
        .filter_map(|diagnostic| {
            let fix = lookup(diagnostic)?;
            let Some(edits) = (fix.edits)(doc, diagnostic) else {
                tracing::debug!(uri = doc.uri(), code = fix.code, "fix does not apply");
                return None;
            };
            Some(CodeAction {
                title: fix.title.to_string(),
                uri: doc.uri().to_string(),
                edits,
                is_preferred: true,
                diagnostics: vec![diagnostic.clone()],
            })
        })
        .collect()
}

/// Replace the first `var` inside the diagnostic's range with `let`.
fn var_to_let(doc: &Document, diagnostic: &Diagnostic) -> Option<Vec<TextEdit>> {
    let text = doc.text_in_range(diagnostic.range);
    let start = doc.offset_at(diagnostic.range.start) + text.find("var")?;
    let range = Range::new(doc.position_at(start), doc.position_at(start + "var".len()));
    Some(vec![TextEdit::new(range, "let")])
}
