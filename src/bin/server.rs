//! ghostwire server binary.
//!
//! Wires configuration, logging, the browser engine, the wire router and
//! the optional grid-hub registration together, then serves until
//! `/shutdown` or Ctrl-C.

use anyhow::Result;
use log::{error, info};
use std::process;
use std::sync::Arc;
use tokio::net::TcpListener;

use ghostwire::config::Config;
use ghostwire::engine::{ChromeEngine, EngineOptions};
use ghostwire::handlers::AppContext;
use ghostwire::server::{self, ServerState};
use ghostwire::hub;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::init(std::env::args().skip(1));
    info!(
        "ghostwire v{} starting on {}:{}",
        config.driver_version, config.ip, config.port
    );

    let engine = match ChromeEngine::launch(EngineOptions::new()) {
        Ok(engine) => engine,
        Err(e) => {
            error!("browser engine launch failed: {e}");
            process::exit(1);
        }
    };

    let state = ServerState {
        ctx: Arc::new(AppContext::new(config.clone(), Arc::new(engine))),
        router: Arc::new(server::build_router()),
    };

    // Bind before registering so the hub never sees a node that cannot
    // accept; both failures are process-fatal.
    let listener = match TcpListener::bind((config.ip.as_str(), config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("cannot bind {}:{}: {e}", config.ip, config.port);
            process::exit(1);
        }
    };

    if let Some(hub_url) = &config.hub {
        if let Err(e) = hub::register(
            &config.ip,
            config.port,
            hub_url,
            &config.proxy_class,
            config.driver_version,
        )
        .await
        {
            process::exit(hub::report_fatal(hub_url, &e));
        }
    }

    info!("ghostwire ready at http://{}:{}", config.ip, config.port);
    server::serve(listener, state).await?;
    info!("server stopped");
    Ok(())
}
