//! Road tile server - serves routing data as GeoJSON and vector tiles.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roadtile_server::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    instance::{load_instances, InstanceRegistry},
    server::{create_router, RouterConfig},
    tile::TileService,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("roadtile-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Data directory: {}", config.data_dir.display());
    info!("  MVT lock: {}", config.mvt_lock);
    if config.strict_not_found {
        info!("  Unknown instances: 404 for all formats");
    } else {
        info!("  Unknown instances: 204 for GeoJSON, 404 for MVT");
    }

    // Load instances
    let registry = match load_instances(&config.data_dir).await {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to load instances: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let names = registry.names().await;
    if names.is_empty() {
        warn!(
            "No instances found in {}; every tile request will miss",
            config.data_dir.display()
        );
    } else {
        info!("  Instances: {}", names.join(", "));
    }

    // Create tile service
    let tile_service = TileService::new(registry).with_mvt_lock(config.mvt_lock);

    // Create router
    let router = create_router(tile_service, build_router_config(&config));

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/instances", addr);
    if let Some(name) = names.first() {
        info!("    curl http://{}/{}/tiles/14/8300/5371.geojson", addr, name);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "roadtile_server=debug,tower_http=debug"
    } else {
        "roadtile_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new().with_strict_not_found(config.strict_not_found);

    // Apply CORS origins
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    // Apply tracing setting
    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("Road Tile Server Data Check");
    println!("═════════════════════════════════");
    println!();
    println!("Data directory: {}", config.data_dir.display());
    print!("Loading instances... ");

    let registry = match load_instances(&config.data_dir).await {
        Ok(registry) => {
            println!("✓ success");
            registry
        }
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!();
    println!("Instances:");
    println!("─────────────────");

    let instances = registry.list().await;
    let selected: Vec<_> = instances
        .iter()
        .filter(|i| config.instance.as_deref().map_or(true, |name| i.name() == name))
        .collect();

    if selected.is_empty() {
        match config.instance {
            Some(ref name) => {
                println!("  ✗ instance '{}' not found", name);
                return ExitCode::FAILURE;
            }
            None => println!("  (no instances found)"),
        }
    } else {
        for instance in &selected {
            println!(
                "  ✓ {} ({} segments)",
                instance.name(),
                instance.segment_count().await
            );
        }
        println!();
        println!("Total: {} instance(s)", selected.len());
    }

    println!();
    println!("═════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
