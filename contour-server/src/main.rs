// contour-server/src/main.rs
// ============================================================================
// Module: Contour Server Entry Point
// Description: Command-line entry point for the resolution server.
// Purpose: Assemble capabilities, load persisted specifications, and serve.
// Dependencies: contour-core, contour-providers, contour-store-fs, axum, clap, tokio
// ============================================================================

//! ## Overview
//! The binary wires the file-backed specification store, the pattern
//! user-agent parser, and the configured geolocation backend into the HTTP
//! server. Persisted specifications are loaded once at boot; durability is
//! write-through on every admin mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use contour_core::GeoLocator;
use contour_core::InMemorySpecStore;
use contour_core::NoopSpecPersistence;
use contour_core::PersistError;
use contour_core::Resolver;
use contour_core::SpecPersistence;
use contour_core::StoreError;
use contour_providers::GeoProviderError;
use contour_providers::HttpGeoConfig;
use contour_providers::HttpGeoLocator;
use contour_providers::NullGeoLocator;
use contour_providers::PatternUserAgentParser;
use contour_providers::TableGeoLocator;
use contour_server::ApiMetrics;
use contour_server::AppState;
use contour_server::ConfigError;
use contour_server::NoopMetrics;
use contour_server::ServerConfig;
use contour_server::StderrMetrics;
use contour_server::build_router;
use contour_store_fs::FsSpecStore;
use thiserror::Error;

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Context-aware configuration resolution server.
#[derive(Debug, Parser)]
#[command(name = "contour-server", version)]
struct Cli {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    /// Directory of persisted specification documents.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Geolocation CIDR table (JSON file).
    #[arg(long)]
    geo_table: Option<PathBuf>,
    /// Geolocation HTTP lookup endpoint.
    #[arg(long)]
    geo_url: Option<String>,
    /// Emit one JSON log line per request to stderr.
    #[arg(long)]
    log_requests: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal startup and serve errors.
#[derive(Debug, Error)]
enum ServeError {
    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Persisted specifications could not be loaded.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The in-memory store failed during boot.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Geolocation backend construction failed.
    #[error(transparent)]
    Geo(#[from] GeoProviderError),
    /// Listener binding or serving failed.
    #[error("server io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = ServerConfig {
        listen: cli.listen,
        data_dir: cli.data_dir,
        geo_table: cli.geo_table,
        geo_url: cli.geo_url,
        log_requests: cli.log_requests,
    };
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("contour-server: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Assembles collaborators and serves until the listener fails.
async fn run(config: ServerConfig) -> Result<(), ServeError> {
    config.validate()?;

    let persistence: Arc<dyn SpecPersistence + Send + Sync> = match &config.data_dir {
        Some(root) => Arc::new(FsSpecStore::new(root.clone())),
        None => Arc::new(NoopSpecPersistence),
    };

    let store = InMemorySpecStore::new();
    for spec in persistence.load_all()? {
        // Re-stamping with the stored value keeps updated_at stable across boots.
        let stamped_at = spec.updated_at;
        store.save(spec, stamped_at)?;
    }

    let geo: Arc<dyn GeoLocator + Send + Sync> = if let Some(path) = &config.geo_table {
        Arc::new(TableGeoLocator::from_path(path)?)
    } else if let Some(url) = &config.geo_url {
        Arc::new(HttpGeoLocator::new(HttpGeoConfig {
            base_url: url.clone(),
            ..HttpGeoConfig::default()
        })?)
    } else {
        Arc::new(NullGeoLocator)
    };

    let metrics: Arc<dyn ApiMetrics> = if config.log_requests {
        Arc::new(StderrMetrics)
    } else {
        Arc::new(NoopMetrics)
    };

    let state = AppState::new(
        Arc::new(Resolver::new(store)),
        persistence,
        Arc::new(PatternUserAgentParser::new()),
        geo,
        metrics,
    );

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(|err| ServeError::Io(err.to_string()))?;
    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|err| ServeError::Io(err.to_string()))
}
