//! HTTP surface: the upload form and the prediction endpoint.
//!
//! Both routes render the same page. Validation and runtime failures are
//! caught here and re-rendered into the form with an error message and a
//! success status code; a bad upload never produces a raw server error.

use crate::batch::PatientBatch;
use crate::error::UploadError;
use crate::features;
use crate::model::Predictor;
use crate::results::Predictions;
use actix_multipart::form::{bytes::Bytes, MultipartForm};
use actix_web::{get, post, web, HttpResponse, Responder};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared per-process state: the loaded model and the page template.
pub struct AppState {
    predictor: Arc<dyn Predictor>,
    templates: tera::Tera,
    features: Vec<FeatureRow>,
}

/// One feature row on the upload form.
#[derive(Debug, Clone, Serialize)]
struct FeatureRow {
    name: String,
    description: &'static str,
}

impl AppState {
    /// Build the state around a loaded predictor.
    pub fn new(predictor: Arc<dyn Predictor>) -> Result<Self> {
        let mut templates = tera::Tera::default();
        templates
            .add_raw_template("index.html", include_str!("../templates/index.html"))
            .context("Failed to compile page template")?;

        let features = predictor
            .feature_names()
            .iter()
            .map(|name| FeatureRow {
                name: name.clone(),
                description: features::description(name).unwrap_or(""),
            })
            .collect();

        Ok(Self {
            predictor,
            templates,
            features,
        })
    }

    fn base_context(&self) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("features", &self.features);
        context
    }

    fn render(&self, context: &tera::Context) -> HttpResponse {
        match self.templates.render("index.html", context) {
            Ok(body) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(body),
            Err(e) => {
                error!(error = %e, "Template rendering failed");
                HttpResponse::InternalServerError().body("Template rendering failed")
            }
        }
    }

    fn render_form(&self) -> HttpResponse {
        self.render(&self.base_context())
    }

    fn render_error(&self, message: &str) -> HttpResponse {
        let mut context = self.base_context();
        context.insert("error", message);
        self.render(&context)
    }

    fn render_results(&self, results: &Predictions) -> HttpResponse {
        let rendered = match self.format_results(results) {
            Ok(rendered) => rendered,
            Err(e) => return self.render_error(&format!("Prediction failed: {e}")),
        };

        let mut context = self.base_context();
        context.insert("results", results.entries());
        context.insert("results_json", &rendered.json);
        context.insert("results_csv", &rendered.csv);
        self.render(&context)
    }

    fn format_results(&self, results: &Predictions) -> Result<RenderedResults> {
        Ok(RenderedResults {
            json: results.to_json()?,
            csv: results.to_csv()?,
        })
    }
}

struct RenderedResults {
    json: String,
    csv: String,
}

/// Multipart form carrying the uploaded patient CSV.
#[derive(MultipartForm)]
pub struct UploadForm {
    file: Bytes,
}

/// Register the service routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(predict);
}

/// Upload form with the expected feature schema.
#[get("/")]
async fn index(state: web::Data<AppState>) -> impl Responder {
    state.render_form()
}

/// Accept a patient CSV and render per-record risk probabilities.
#[post("/")]
async fn predict(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> impl Responder {
    let filename = form.file.file_name.clone().unwrap_or_default();

    match run_prediction(&state, &filename, &form.file.data) {
        Ok(results) => {
            info!(
                file = %filename,
                records = results.len(),
                "Prediction request served"
            );
            state.render_results(&results)
        }
        Err(err) => {
            warn!(file = %filename, error = %err, "Upload rejected");
            state.render_error(&err.to_string())
        }
    }
}

/// Single linear pass: validate, infer, zip identifiers with probabilities.
fn run_prediction(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<Predictions, UploadError> {
    let schema = state.predictor.feature_names();
    let batch = PatientBatch::parse(filename, bytes, schema)?;

    let probabilities = state.predictor.predict_batch(batch.rows())?;

    Ok(Predictions::from_pairs(
        batch.ids().iter().cloned().zip(probabilities),
    ))
}
