/// Workflow compiler CLI
///
/// Renders the bundled workflows and validates migration configuration
/// documents.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use workflow_compiler::cli::{self, Cli};
use workflow_compiler::config::CompilerConfig;

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match CompilerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run(cli, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
