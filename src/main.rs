//! mbtilesrv binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mbtilesrv::config::Config;
use mbtilesrv::server::{create_router, RouterConfig};
use mbtilesrv::store::TileStore;

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "mbtilesrv=debug,tower_http=debug"
    } else {
        "mbtilesrv=info,tower_http=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(err) = config.validate() {
        error!("invalid configuration: {err}");
        return ExitCode::FAILURE;
    }

    let store = match TileStore::open(&config.file) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!(path = %config.file.display(), "cannot open archive: {err}");
            return ExitCode::FAILURE;
        }
    };

    let metadata = match store.metadata() {
        Ok(metadata) => metadata,
        Err(err) => {
            error!("cannot read archive metadata: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        name = %metadata.name,
        min_zoom = metadata.min_zoom,
        max_zoom = metadata.max_zoom,
        "serving archive {}",
        config.file.display()
    );
    for parse_error in &metadata.errors {
        warn!("metadata: {parse_error}");
    }

    store.set_auto_reload(config.auto_reload);
    if config.auto_reload {
        info!("auto-reload enabled");
    }

    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);
    if let Some(origins) = config.cors_origins.clone() {
        router_config = router_config.with_cors_origins(origins);
    }

    let app = create_router(Arc::clone(&store), router_config);

    let addr = match config.bind_address() {
        Ok(addr) => addr,
        Err(err) => {
            error!(host = %config.host, port = config.port, "invalid bind address: {err}");
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, "cannot bind listener: {err}");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, "listening");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }

    store.close();
    ExitCode::SUCCESS
}
