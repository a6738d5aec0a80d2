//! Heart Risk API - Main Entry Point
//!
//! Loads the classifier artifact once at startup and serves the upload form
//! and prediction endpoint over HTTP.

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use heart_risk_api::{
    config::AppConfig,
    model::{Predictor, RiskModel},
    server::{routes, AppState},
};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                format!("heart_risk_api={}", config.logging.level).parse()?,
            ),
        )
        .init();

    info!("Starting Heart Risk API");

    // Load the model once; a missing or malformed artifact is fatal
    let model = RiskModel::load(&config.model.path, config.model.onnx_threads)?;
    info!(
        path = %config.model.path,
        features = model.feature_names().len(),
        "Model loaded"
    );

    let state = web::Data::new(AppState::new(Arc::new(model))?);

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Listening for upload requests"
    );

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
        .bind((config.server.host.as_str(), config.server.port))?
        .run()
        .await?;

    Ok(())
}
