use options_advisor::advisor::Advisor;
use options_advisor::config::AppConfig;
use options_advisor::errors::EngineResult;
use options_advisor::feeds::file::read_snapshot;
use options_advisor::server;
use options_advisor::state::AppState;
use std::path::Path;

#[tokio::main]
async fn main() {
    // Structured logging to stderr so stdout stays clean for one-shot JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // `options_advisor <snapshot.json>` analyzes one file and exits.
    if let Some(path) = std::env::args().nth(1) {
        if let Err(e) = run_once(&cfg, Path::new(&path)).await {
            tracing::error!(path = %path, "analysis failed: {e}");
            std::process::exit(1);
        }
        return;
    }

    tracing::info!(data_dir = %cfg.data_dir.display(), "options advisor starting");

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

async fn run_once(cfg: &AppConfig, path: &Path) -> EngineResult<()> {
    let snapshot = read_snapshot(path).await?;
    let input = snapshot.validate(&cfg.analytics.pricing)?;
    let report = Advisor::new(&cfg.analytics).analyze(&input);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
