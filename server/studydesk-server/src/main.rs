use clap::Parser;
use colored::*;
use database_layer::mask_url;
use error_common::{Result, StudyDeskError};
use logger_redacted::init_tracing;
use tracing::info;

use studydesk_server::{create_app, Settings, StudyDeskServer};

/// StudyDesk HTTP Server
#[derive(Parser, Debug)]
#[command(name = "studydesk-server")]
#[command(about = "Research form data collection HTTP API server")]
struct Args {
    /// Server bind address (overrides the configuration)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides the configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path (YAML or TOML)
    #[arg(short, long, env = "STUDYDESK_CONFIG")]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Apply pending database migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if args.migrate {
        settings.database.run_migrations = true;
    }

    init_tracing(
        &settings.logging,
        &["studydesk_server", "database_layer", "form_integrity"],
        args.verbose,
    )
    .map_err(|e| StudyDeskError::LoggingError(e.to_string()))?;

    print_startup_banner();

    let bind = format!("{}:{}", settings.server.host, settings.server.port);
    info!("{}", "Starting StudyDesk HTTP Server".bright_cyan());
    info!("Version: {}", env!("CARGO_PKG_VERSION").bright_white());
    info!("Bind address: {}", bind.bright_yellow());
    info!("Database: {}", mask_url(&settings.database.url));

    let server = StudyDeskServer::new(settings).await?;
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(bind.as_str())
        .await
        .map_err(|e| StudyDeskError::NetworkError(format!("Failed to bind to {}: {}", bind, e)))?;
    let addr = listener
        .local_addr()
        .map_err(|e| StudyDeskError::NetworkError(e.to_string()))?;

    info!("{}", format!("StudyDesk server running on http://{}", addr).bright_green());
    info!("{}", format!("Health check available at: http://{}/health", addr).bright_blue());
    info!("{}", format!("API v1 available at: http://{}/api/v1", addr).bright_blue());
    info!("{}", format!("API docs available at: http://{}/swagger-ui", addr).bright_blue());

    axum::serve(listener, app)
        .await
        .map_err(|e| StudyDeskError::ServerError(format!("HTTP server error: {}", e)))?;

    Ok(())
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                          STUDYDESK                           ║".bright_cyan());
    println!("{}", "║              Research Form Data Collection API               ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
