//! Sai - chat with local Ollama models from the terminal.
//!
//! This is the entry point for the `sai` binary.

mod app;
mod assets;
mod commands;
mod markdown;
mod prompt;
mod ui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sai_store::{RoleCatalog, SettingsStore, TomlRoleStore};

use app::App;
use prompt::Prompter;

/// Log filter used with `--debug` when `RUST_LOG` is not set.
const DEBUG_FILTER: &str = "sai_cli=debug,sai_client=debug,sai_store=debug,warn";

/// Sai - chat with local LLM models through Ollama.
#[derive(Parser, Debug)]
#[command(name = "sai")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging on stderr.
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // A missing .env file is not an error.
    dotenvy::dotenv().ok();

    if args.debug {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEBUG_FILTER));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let settings = SettingsStore::open_default()?;
    let roles = RoleCatalog::load(TomlRoleStore::open_default()?)?;
    let prompter = Prompter::new()?;

    let mut app = App::new(settings, roles, prompter)?;
    app.run().await
}
