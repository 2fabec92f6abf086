use std::path::PathBuf;

use clap::Parser;
use tessera_server::TesseraServer;
use tessera_server::config::loader::load_config;

#[derive(Debug, Parser)]
#[command(name = "tessera-server", version, about = "Tessera OAuth 2.0 / OIDC server")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "TESSERA_CONFIG", default_value = "tessera.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    tessera_server::observability::init_tracing();

    let cli = Cli::parse();
    let cfg = match load_config(Some(cli.config.as_path())) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT"),
        "Starting Tessera"
    );
    tracing::info!(
        path = %cli.config.display(),
        exists = cli.config.exists(),
        "Configuration loaded"
    );
    tessera_server::observability::apply_logging_level(&cfg.logging.level);

    let server = TesseraServer::build(&cfg).await?;
    server.run().await
}
