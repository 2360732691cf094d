use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use nextevents_core::init_tracing;
use nextevents_server::{AppConfig, AppState, Args, ServerResult, build_router, shutdown_signal};
use nextevents_store::CredentialStore;

#[tokio::main]
async fn main() -> ExitCode {
    // Must run before parsing so .env values act as environment fallbacks.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    if let Err(e) = init_tracing(args.tracing_config()) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    match dotenv {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("ignoring .env: {}", e),
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> ServerResult<()> {
    let config = AppConfig::from_args(&args)?;

    let store = CredentialStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let addr = config.bind_addr()?;
    let redirect_uri = config.google.redirect_uri.clone();
    let state = AppState::new(config, store)?;

    let listener = TcpListener::bind(addr).await?;
    info!("listening on http://{}", listener.local_addr()?);
    info!("OAuth redirect URI: {}", redirect_uri);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
