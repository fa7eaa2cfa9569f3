use std::{env, fs, sync::Arc};

use clap::Parser;
use log::{error, info};

mod academy;
mod analytics;
mod args;
mod auth;
mod backend;
mod center;
mod coach;
mod config;
mod leave;
mod period;
mod record;
mod routes;
mod session;
mod time;
mod user;
mod validate;

use academy::Academy;
use args::Args;
use backend::Backend;

pub use crate::time::Timestamp;

const LOG_ENV: &str = "RUST_LOG";

#[tokio::main]
async fn main() {
    if env::var_os(LOG_ENV).is_none() {
        env::set_var(LOG_ENV, "info");
    }
    pretty_env_logger::init_custom_env(LOG_ENV);

    let args = Args::parse();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid address: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = fs::create_dir_all(args.data_dir()) {
        error!("couldn't create {}: {e}", args.data_dir().display());
        std::process::exit(1);
    }

    let config = match args.config() {
        Ok(config) => config,
        Err(e) => {
            error!("couldn't load the secret key: {e}");
            std::process::exit(1);
        }
    };

    let backend = match Backend::new(args.data_dir()).await {
        Ok(backend) => backend,
        Err(e) => {
            error!("couldn't open the database: {e}");
            std::process::exit(1);
        }
    };

    let academy = Arc::new(Academy::new(backend, config));
    if let Err(e) = academy.seed().await {
        error!("couldn't seed the database: {e}");
        std::process::exit(1);
    }

    let routes = routes::routes(academy, args.secure());

    info!("listening on {addr}");
    warp::serve(routes).run(addr).await;
}
