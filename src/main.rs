use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::time::Duration;

mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::analytics::client::AnalyticsClient;
use crate::auth::{handlers::ensure_bootstrap_admin, session::SessionStore};
use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::qr_filter;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance tracker is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;
    error::set_debug(config.debug);

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("failed to connect to the database")?;

    if let Some((username, password)) = &config.bootstrap_admin {
        if let Err(e) = ensure_bootstrap_admin(&pool, username, password).await {
            warn!(error = %e, "Failed to seed bootstrap admin");
        }
    }

    let pool_for_filter_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = qr_filter::warmup_qr_filter(&pool_for_filter_warmup, 500).await {
            log::error!("Failed to warmup QR filter: {:?}", e);
        }
    });

    let sessions = Data::new(SessionStore::new(Duration::from_secs(config.session_ttl)));
    let analytics_client = Data::new(AnalyticsClient::new(
        &config.analytics_url,
        Duration::from_secs(config.analytics_timeout_secs),
    )?);
    let limiters = Limiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);
    let pool_data = Data::new(pool);

    HttpServer::new(move || {
        let routes_config = config_data.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the UI's JS/CSS files match
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(sessions.clone())
            .app_data(analytics_client.clone())
            .service(index)
            .configure(move |cfg| routes::configure(cfg, &routes_config, limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
