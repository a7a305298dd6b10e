//! Lobster language server - main entry point

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use lobster_lsp::ServerConfig;
use lobster_lsp_core::LobsterSettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lobster-ls")]
#[command(version)]
#[command(about = "Language server for the Lobster programming language", long_about = None)]
struct Cli {
    /// Communicate over stdin/stdout (the only transport; accepted for editors that pass it)
    #[arg(long)]
    stdio: bool,

    /// Lobster compiler executable
    #[arg(long, default_value = lobster_lsp_core::settings::DEFAULT_EXECUTABLE)]
    executable: String,

    /// Import search path passed to the compiler (repeatable)
    #[arg(long = "import", value_name = "DIR")]
    imports: Vec<String>,

    /// Seconds a compile-only run may take
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    compile_timeout: u64,

    /// Seconds the executable probe may take
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    probe_timeout: u64,

    /// Turn off experimental language features by default
    #[arg(long)]
    no_experimental: bool,
}

impl Cli {
    fn server_config(self) -> ServerConfig {
        ServerConfig {
            defaults: LobsterSettings {
                executable: self.executable,
                imports: self.imports,
                experimental: !self.no_experimental,
            },
            compile_timeout: Duration::from_secs(self.compile_timeout),
            probe_timeout: Duration::from_secs(self.probe_timeout),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging. Stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lobster_lsp=info,lobster_lsp_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!(stdio = cli.stdio, "parsed command line");
    commands::lsp::execute(cli.server_config())
}
