//! Diagnostic extraction from Lobster documents.
//!
//! The document is written to a scratch file and compiled with
//! `lobster --compile-only`. Compiler output lines of the form
//! `file(line): severity: message` become diagnostics; any other failure of
//! the run becomes a single synthetic diagnostic so validation always settles.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::document::Document;
use crate::error::RunError;
use crate::quickfix::{self, codes};
use crate::runner::{CommandOutput, CompilerRunner};
use crate::settings::LobsterSettings;
use crate::state::ServerErrorState;
use crate::types::{Diagnostic, DiagnosticSeverity, Position, Range};

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+?)\((?P<line>\d+)\): (?P<severity>error|warning|note): (?P<message>.*)$")
        .expect("diagnostic line pattern is valid")
});

/// What `produce` needs besides the document and its settings.
pub struct ProduceContext<'a> {
    pub runner: &'a dyn CompilerRunner,
    /// Directory the server owns for scratch copies of documents.
    pub scratch_dir: &'a Path,
    pub timeout: Duration,
}

/// Compile `doc` and return its diagnostics.
///
/// Returns nothing, without running the compiler, while the server is in an
/// error state.
pub async fn produce(
    ctx: &ProduceContext<'_>,
    doc: &Document,
    settings: &LobsterSettings,
    state: &ServerErrorState,
) -> Vec<Diagnostic> {
    if state.is_errored() {
        tracing::debug!(uri = doc.uri(), "server is errored; skipping compile");
        return Vec::new();
    }

    let relative = scratch_relative_path(doc);
    let scratch_file = ctx.scratch_dir.join(&relative);
    if let Err(err) = write_scratch(&scratch_file, doc.content()).await {
        tracing::warn!(uri = doc.uri(), error = %err, "could not write scratch copy");
        return vec![failure_diagnostic(format!(
            "Could not prepare document for the Lobster compiler: {err}"
        ))];
    }

    let args = compile_args(settings, doc.directory(), &scratch_file);
    match ctx
        .runner
        .run(&settings.executable, &args, ctx.timeout)
        .await
    {
        Ok(output) => diagnostics_from_output(doc, &relative, &output),
        Err(err) => {
            tracing::warn!(uri = doc.uri(), error = %err, "compiler invocation failed");
            vec![failure_diagnostic(format!(
                "Lobster compiler invocation failed: {err}"
            ))]
        }
    }
}

/// Arguments for a compile-only run of `file`.
///
/// The document's own directory is added as the last import path when it is
/// not configured already, since the compiled file lives elsewhere.
pub fn compile_args(
    settings: &LobsterSettings,
    document_dir: Option<&Path>,
    file: &Path,
) -> Vec<String> {
    let mut imports = settings.imports.clone();
    if let Some(dir) = document_dir {
        let dir = dir.to_string_lossy().into_owned();
        if !imports.contains(&dir) {
            imports.push(dir);
        }
    }

    let mut args = vec!["--compile-only".to_string()];
    for import in imports {
        args.push("--import".to_string());
        args.push(import);
    }
    args.push(file.to_string_lossy().into_owned());
    args
}

/// Scratch location of a document, relative to the scratch directory.
///
/// Documents get a directory per URI so equally named files do not clash.
fn scratch_relative_path(doc: &Document) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    doc.uri().hash(&mut hasher);
    PathBuf::from(format!("{:016x}", hasher.finish())).join(doc.filename())
}

async fn write_scratch(path: &Path, content: &str) -> Result<(), RunError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    Ok(())
}

/// Turn a finished compiler run into diagnostics.
pub fn diagnostics_from_output(
    doc: &Document,
    scratch_file: &Path,
    output: &CommandOutput,
) -> Vec<Diagnostic> {
    let mut text = output.stdout_string();
    let stderr = output.stderr_string();
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }

    let diagnostics = parse_compiler_output(doc, scratch_file, &text);
    if diagnostics.is_empty() && !output.success() {
        let detail = text.trim();
        let message = if detail.is_empty() {
            format!("Lobster compiler exited with code {}", output.code)
        } else {
            format!("Lobster compiler exited with code {}: {detail}", output.code)
        };
        return vec![failure_diagnostic(message)];
    }
    diagnostics
}

/// Parse compiler output. `scratch_file` is matched as a path suffix of the
/// reported file name; diagnostics for other files are pinned to the start of
/// the document.
pub fn parse_compiler_output(doc: &Document, scratch_file: &Path, text: &str) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut continuing = false;

    for line in text.lines() {
        let Some(caps) = DIAGNOSTIC_LINE.captures(line) else {
            // Indented or free-form lines extend the previous diagnostic.
            match diagnostics.last_mut() {
                Some(last) if continuing && !line.trim().is_empty() => {
                    last.message.push('\n');
                    last.message.push_str(line.trim_end());
                }
                _ => continuing = false,
            }
            continue;
        };

        let file = &caps["file"];
        let line_number: u32 = caps["line"].parse().unwrap_or(1);
        let severity = DiagnosticSeverity::from_compiler_word(&caps["severity"]);
        let message = caps["message"].trim_end();

        let (range, message) = if Path::new(file).ends_with(scratch_file) {
            (doc.line_range(line_number.saturating_sub(1)), message.to_string())
        } else {
            (
                Range::point(Position::default()),
                format!("{file}({line_number}): {message}"),
            )
        };

        let code = quickfix::classify(&message).unwrap_or(codes::COMPILER);
        diagnostics.push(Diagnostic::new(range, severity, message).with_code(code));
        continuing = true;
    }

    diagnostics
}

fn failure_diagnostic(message: String) -> Diagnostic {
    Diagnostic::new(
        Range::point(Position::default()),
        DiagnosticSeverity::Error,
        message,
    )
    .with_code(codes::COMPILER_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;

    const URI: &str = "file:///work/game.lobster";
    const TIMEOUT: Duration = Duration::from_secs(1);

    fn doc(text: &str) -> Document {
        Document::new(URI, text, 1).with_path("/work/game.lobster")
    }

    fn scratch_name() -> PathBuf {
        scratch_relative_path(&doc(""))
    }

    #[test]
    fn parses_errors_and_warnings_on_document_lines() {
        let doc = doc("import std\nvar x = 1\nprint(y)\n");
        let file = format!("/tmp/scratch/{}", scratch_name().display());
        let output = format!(
            "{file}(2): warning: use `let` to declare: x\n{file}(3): error: unknown identifier: y\n"
        );

        let diags = parse_compiler_output(&doc, &scratch_name(), &output);
        assert_eq!(diags.len(), 2);

        assert_eq!(diags[0].severity, DiagnosticSeverity::Warning);
        assert_eq!(diags[0].code.as_deref(), Some(codes::PREFER_LET));
        assert_eq!(doc.text_in_range(diags[0].range), "var x = 1");

        assert_eq!(diags[1].severity, DiagnosticSeverity::Error);
        assert_eq!(diags[1].code.as_deref(), Some(codes::COMPILER));
        assert_eq!(diags[1].message, "unknown identifier: y");
        assert_eq!(diags[1].range.start, Position::new(2, 0));
    }

    #[test]
    fn diagnostics_in_imports_are_pinned_to_document_start() {
        let doc = doc("import helpers\n");
        let diags = parse_compiler_output(
            &doc,
            &scratch_name(),
            "/work/helpers.lobster(7): error: type mismatch\n  in call to: f\n",
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range, Range::point(Position::default()));
        insta::assert_snapshot!(diags[0].message, @r"
        /work/helpers.lobster(7): type mismatch
          in call to: f
        ");
    }

    #[test]
    fn compile_args_add_document_dir_once() {
        let settings = LobsterSettings {
            imports: vec!["/libs".to_string(), "/work".to_string()],
            ..Default::default()
        };
        let args = compile_args(&settings, Some(Path::new("/work")), Path::new("/s/game.lobster"));
        assert_eq!(
            args,
            vec![
                "--compile-only",
                "--import",
                "/libs",
                "--import",
                "/work",
                "/s/game.lobster"
            ]
        );

        let args = compile_args(
            &LobsterSettings::default(),
            Some(Path::new("/work")),
            Path::new("/s/game.lobster"),
        );
        assert_eq!(args[1..3], ["--import".to_string(), "/work".to_string()]);
    }

    #[test]
    fn nonzero_exit_without_diagnostics_is_synthetic() {
        let output = CommandOutput {
            code: 3,
            stdout: Vec::new(),
            stderr: b"segmentation fault".to_vec(),
        };
        let diags = diagnostics_from_output(&doc("x"), &scratch_name(), &output);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.as_deref(), Some(codes::COMPILER_FAILURE));
        assert!(diags[0].message.contains("segmentation fault"));
    }

    #[test]
    fn clean_run_has_no_diagnostics() {
        let diags = diagnostics_from_output(&doc("x"), &scratch_name(), &CommandOutput::default());
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn produce_runs_compiler_on_scratch_copy() {
        let scratch = tempfile::tempdir().unwrap();
        let file = scratch.path().join(scratch_name());
        let reply = format!("{}(1): error: unknown identifier: y\n", file.display());
        let runner = ScriptedRunner::replying(1, &reply, "");
        let ctx = ProduceContext {
            runner: &runner,
            scratch_dir: scratch.path(),
            timeout: TIMEOUT,
        };

        let diags = produce(
            &ctx,
            &doc("print(y)\n"),
            &LobsterSettings::default(),
            &ServerErrorState::None,
        )
        .await;

        assert_eq!(runner.calls(), 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "unknown identifier: y");
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "print(y)\n");
        let args = runner.last_args.lock().unwrap().clone();
        assert_eq!(args.last().map(PathBuf::from), Some(file));
    }

    #[tokio::test]
    async fn produce_turns_run_errors_into_a_diagnostic() {
        let scratch = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::with(|| {
            Err(RunError::Timeout {
                executable: "lobster".to_string(),
                timeout: TIMEOUT,
            })
        });
        let ctx = ProduceContext {
            runner: &runner,
            scratch_dir: scratch.path(),
            timeout: TIMEOUT,
        };

        let diags = produce(
            &ctx,
            &doc("x"),
            &LobsterSettings::default(),
            &ServerErrorState::None,
        )
        .await;
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, DiagnosticSeverity::Error);
        assert!(diags[0].message.contains("did not finish"));
    }
}
