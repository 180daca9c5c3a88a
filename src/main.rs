mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod notify;
mod routes;
mod state;
mod stores;
mod structs;
mod utils;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::notify::AzureEmailNotifier;
use crate::state::app_state::AppState;
use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use routes::init_routes;
use stores::build_store;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Open the record store selected by STORE_BACKEND
    let store = match build_store(&config.store).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening the record store: {:#}", e);
            std::process::exit(1);
        }
    };

    if config.email.connection_string.is_none()
        || config.email.sender_address.is_none()
        || config.email.recipients.is_empty()
    {
        warn!("Email settings are incomplete; alerts will be stored but not delivered");
    }

    // Create shared state
    let app_state = web::Data::new(AppState {
        store,
        notifier: Arc::new(AzureEmailNotifier::new(&config.email)),
        email: config.email.clone(),
        trust_proxy_headers: config.trust_proxy_headers,
        expose_error_details: config.expose_error_details,
    });

    let allowed_origins = config.cors_allowed_origins.clone();
    info!("Listening on {}:{}", config.bind_address, config.port);

    // Start the Actix Web server
    HttpServer::new(move || {
        // Create a logger with a custom format instead
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        App::new()
            .wrap(logger)
            .wrap(cors(&allowed_origins))
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}

/// Allow the listed origins, or any origin when none are configured.
fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET"])
        .allowed_header(http::header::ACCEPT)
        .allowed_header(http::header::CONTENT_TYPE)
        .max_age(3600);

    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}
