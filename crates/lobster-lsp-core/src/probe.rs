//! Compiler executable probe.
//!
//! Before a configured executable is trusted it is run once without arguments.
//! A Lobster binary prints its usage banner and exits with 0 or 1; anything
//! else marks the executable invalid.

use std::time::Duration;

use crate::runner::{CommandOutput, CompilerRunner};

/// Prefix every genuine Lobster banner starts with.
pub const EXPECTED_BANNER: &str = "Lobster programming language";

/// Outcome of probing an executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    Valid,
    /// Carries the message shown to the user.
    Invalid(String),
}

/// Probe `executable` through `runner`.
pub async fn probe_executable(
    runner: &dyn CompilerRunner,
    executable: &str,
    timeout: Duration,
) -> ProbeVerdict {
    if executable.is_empty() {
        return ProbeVerdict::Invalid("Lobster executable path is not set.".to_string());
    }

    let verdict = match runner.run(executable, &[], timeout).await {
        Ok(output) => evaluate_output(executable, &output),
        Err(err) => ProbeVerdict::Invalid(format!(
            "Lobster ({executable}) failed to execute: {err}"
        )),
    };

    match &verdict {
        ProbeVerdict::Valid => tracing::info!(executable, "compiler probe succeeded"),
        ProbeVerdict::Invalid(message) => {
            tracing::error!(executable, reason = %message, "compiler probe failed")
        }
    }
    verdict
}

/// Judge the output of a no-argument run.
///
/// Exit code 1 is how the compiler reports "printed usage", so it counts as
/// success.
pub fn evaluate_output(executable: &str, output: &CommandOutput) -> ProbeVerdict {
    let stderr = output.stderr_string();
    if !stderr.is_empty() {
        return ProbeVerdict::Invalid(format!(
            "Lobster ({executable}) returned with output: {stderr}"
        ));
    }

    if output.code != 0 && output.code != 1 {
        return ProbeVerdict::Invalid(format!(
            "Lobster ({executable}) failed to execute: exit code {}",
            output.code
        ));
    }

    let stdout = output.stdout_string();
    if !stdout.starts_with(EXPECTED_BANNER) {
        return ProbeVerdict::Invalid(format!(
            "Lobster ({executable}) returned with unexpected output (is this a lobster binary?): {stdout}"
        ));
    }

    ProbeVerdict::Valid
}
