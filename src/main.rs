use actix_web::{middleware::Logger, web, App, HttpServer};
use equinox_server::{AppState, Settings, AppError};
use dotenv::dotenv;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> equinox_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully ({} environment)", config.environment);

    // Fails here, before binding, if production has no signing secret
    let state = AppState::new(config.clone())?;
    let state = web::Data::new(state);

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!(
        "Equinox Notes server listening on http://{}:{}",
        config.server.host, config.server.port
    );

    let workers = config.server.workers as usize;
    let cors_config = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            // Last wrap runs first: log, then headers, then CORS preflight
            .wrap(equinox_server::cors(&cors_config))
            .wrap(equinox_server::security_headers())
            .wrap(Logger::new("%r -> %s (%D ms)"))
            .app_data(state.clone())
            .configure(equinox_server::configure_routes)
            .default_service(web::route().to(equinox_server::not_found))
    })
    .listen(listener)?
    .workers(workers)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
