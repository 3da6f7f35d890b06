//! Session-relay binary entry point.

use std::sync::Arc;

use tracing::info;

use session_relay::api::{self, AppState, ServerConfig};
use session_relay::broker::{reaper, Broker};
use session_relay::worker::EchoWorkerFactory;
use session_relay::{cli, logging, Config};

fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    };

    if args.help {
        cli::print_help();
        return;
    }
    if args.version {
        cli::print_version();
        return;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    };

    let server_config = match config.server_config() {
        Ok(server_config) => server_config,
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(2);
        }
    };

    logging::init(config.log_filter());

    // The HTTP worker pool is the runtime's thread pool.
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if config.server.worker_threads > 0 {
        builder.worker_threads(config.server.worker_threads);
    }
    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(config, server_config)) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

async fn run(config: Config, server_config: ServerConfig) -> session_relay::Result<()> {
    info!("session-relay v{}", env!("CARGO_PKG_VERSION"));

    let broker = Arc::new(Broker::new(
        config.broker_config(),
        Arc::new(EchoWorkerFactory),
    ));
    let sweeper = reaper::spawn(
        broker.registry(),
        config.reaper_interval(),
        config.max_idle(),
    );

    let state = AppState::new(Arc::clone(&broker), config.relay.max_body_bytes);
    api::serve(server_config, state).await?;

    // In-memory only: remaining sessions are discarded, workers asked to stop.
    sweeper.abort();
    broker.shutdown();
    info!("session-relay stopped");

    Ok(())
}
