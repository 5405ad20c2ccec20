mod campus;
mod config;
mod error;
mod messages;
mod models;
mod routes;
mod schedule;
mod seed;
mod server;
mod session;
mod validation;

use clap::Parser;
use log::{info, warn};
use warp::Filter;

use campus::CampusState;
use config::Config;
use server::Server;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let state = if config.no_seed {
        CampusState::default()
    } else {
        seed::demo_campus()
    };
    info!(
        "campus loaded with {} students and {} faculty",
        state.students().len(),
        state.faculty().len()
    );

    let server = Server::new(state, config.admin_credentials());

    let routes = routes::routes(server).with(
        warp::cors()
            .allow_any_origin()
            .allow_methods(["GET", "POST", "PATCH", "PUT"])
            .allow_headers(["authorization", "content-type"]),
    );

    if config.load_tls_config().is_some() {
        info!("Starting secure server (HTTPS/WSS) on {}...", config.bind);
        warp::serve(routes)
            .tls()
            .cert_path(&config.tls_cert)
            .key_path(&config.tls_key)
            .run(config.bind)
            .await;
    } else {
        warn!(
            "TLS material unavailable, falling back to HTTP/WS on {}...",
            config.bind
        );
        warp::serve(routes).run(config.bind).await;
    }
}
