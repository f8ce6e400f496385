use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use explore_service::config::{LoggingSettings, Settings, StoreBackend};
use explore_service::routes::{self, handle_json_payload_error, AppState};
use explore_service::services::{DecisionStore, InMemoryStore, PostgresClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match logging.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    init_logging(&settings.logging);

    info!("Starting explore service...");

    let store: Arc<dyn DecisionStore> = match settings.store.backend {
        StoreBackend::Postgres => {
            match PostgresClient::connect(&settings.database, settings.decisions.policy).await {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    error!("Failed to connect to PostgreSQL: {}", e);
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
                }
            }
        }
        StoreBackend::Memory => Arc::new(InMemoryStore::new(settings.decisions.policy)),
    };

    info!(
        "Decision store '{}' ready (policy: {:?}, page size: {})",
        store.name(),
        settings.decisions.policy,
        settings.pagination.page_size
    );

    let app_state = AppState::new(store, settings.pagination.page_size);

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
