use clap::Parser;
use repodoc::{
    api::{handlers::AppState, routes},
    cli::{commands, Cli, Commands},
    config::Settings,
    pipeline::Pipeline,
    Error, Result,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional .env file; absence is fine
    let _ = dotenvy::dotenv();

    // Set up tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,repodoc=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    // Handle commands
    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Run {
            owner,
            repo,
            branch,
        } => {
            commands::run_once(&settings, &owner, &repo, &branch).await?;
        }
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // CLI flags win over environment settings
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting Repodoc server");
    info!("Server: {}:{}", settings.server.host, settings.server.port);
    info!(
        "Run directory root: {}",
        settings.pipeline.workdir.display()
    );

    tokio::fs::create_dir_all(&settings.pipeline.workdir).await?;

    // Build the pipeline and its service clients once, shared across requests
    let pipeline = Arc::new(Pipeline::from_settings(&settings)?);
    info!("Pipeline initialized");

    let state = AppState {
        pipeline,
        settings: settings.clone(),
    };
    let app = routes::create_router(state, &settings);

    // Start server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("\n========================================");
    println!("Repodoc Server");
    println!("========================================");
    println!("Status: Running");
    println!("Address: http://{addr}");
    println!("Wiki page: {}", repodoc::pipeline::WIKI_PAGE_ID);
    println!("\nEndpoints:");
    println!("  POST /saas/github/webhook");
    println!("  GET  /health");
    println!("\nPress Ctrl+C to stop");
    println!("========================================\n");

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}
