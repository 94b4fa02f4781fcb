mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use signage_api::auth::{AppState, AppStateInner};
use signage_api::rotation::Rotation;
use signage_feeds::FeedClient;
use signage_store::{GoogleSheets, MemoryBackend, ServiceAccountKey, SheetsBackend, TableStore};

use crate::config::{Backend, Config, KeySource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signage=debug,signage_store=info,tower_http=debug".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    // Spreadsheet backend
    let backend = open_backend(&config.backend)?;
    let store = TableStore::new(backend).with_cache_ttl(config.cache_ttl);
    let feeds = FeedClient::new(config.endpoints.clone())?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        store,
        feeds,
        jwt_secret: config.jwt_secret.clone(),
        session_days: config.session_days,
        news_rotation_secs: config.news_rotation_secs,
        rotation: Rotation::new(),
    });

    let app = signage_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Signage server listening on {}", addr);
    info!(
        "Cache TTL {}s, news rotation {}s",
        config.cache_ttl.as_secs(),
        config.news_rotation_secs
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn open_backend(backend: &Backend) -> anyhow::Result<Arc<dyn SheetsBackend>> {
    match backend {
        Backend::Memory => {
            warn!("Using the in-memory backend; nothing will be persisted");
            Ok(Arc::new(MemoryBackend::with_worksheets(
                signage_store::schema::KNOWN_TABLES,
            )))
        }
        Backend::Google {
            spreadsheet_id,
            key,
            api_base,
        } => {
            let key = match key {
                KeySource::File(path) => ServiceAccountKey::from_file(path)?,
                KeySource::Inline(json) => ServiceAccountKey::from_json(json)?,
            };
            info!(
                "Using spreadsheet {} as {} (project {})",
                spreadsheet_id, key.client_email, key.project_id
            );
            let mut sheets = GoogleSheets::new(key, spreadsheet_id.clone())?;
            if let Some(base) = api_base {
                info!("Sheets API base overridden: {}", base);
                sheets = sheets.with_api_base(base);
            }
            Ok(Arc::new(sheets))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
