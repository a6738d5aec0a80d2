//! Integration tests for the HTTP surface, using a deterministic stub
//! predictor so no model artifact is needed.

use actix_web::http::header;
use actix_web::{test, web, App};
use anyhow::Result;
use heart_risk_api::{server::routes, AppState, Predictor};
use std::sync::Arc;

/// Deterministic predictor: logistic of the feature sum, always in (0, 1).
struct StubModel {
    names: Vec<String>,
}

impl StubModel {
    fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

impl Predictor for StubModel {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        Ok(rows
            .iter()
            .map(|row| {
                let sum: f32 = row.iter().sum();
                1.0 / (1.0 + (-f64::from(sum)).exp())
            })
            .collect())
    }
}

fn stub_state() -> web::Data<AppState> {
    let predictor = Arc::new(StubModel::new(&["age", "cholesterol"]));
    web::Data::new(AppState::new(predictor).expect("state should build"))
}

/// Predictor whose inference always fails after validation has passed.
struct BrokenModel {
    names: Vec<String>,
}

impl Predictor for BrokenModel {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict_batch(&self, _rows: &[Vec<f32>]) -> Result<Vec<f64>> {
        anyhow::bail!("model backend unavailable")
    }
}

fn broken_state() -> web::Data<AppState> {
    let predictor = Arc::new(BrokenModel {
        names: vec!["age".to_string(), "cholesterol".to_string()],
    });
    web::Data::new(AppState::new(predictor).expect("state should build"))
}

/// Build a multipart/form-data body with a single `file` field.
fn multipart_payload(filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----heartriskboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

async fn post_upload(filename: &str, content: &[u8]) -> String {
    post_upload_with(stub_state(), filename, content).await
}

async fn post_upload_with(
    state: web::Data<AppState>,
    filename: &str,
    content: &[u8],
) -> String {
    let app = test::init_service(App::new().app_data(state).configure(routes)).await;

    let (content_type, body) = multipart_payload(filename, content);
    let req = test::TestRequest::post()
        .uri("/")
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert!(
        resp.status().is_success(),
        "expected success status, got {}",
        resp.status()
    );

    let bytes = test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).expect("response body should be UTF-8")
}

/// Pull the pretty-printed JSON results out of the rendered page.
fn extract_results_json(page: &str) -> serde_json::Value {
    let start = page
        .find("id=\"results-json\"")
        .expect("page should embed JSON results");
    let open = page[start..].find('>').unwrap() + start + 1;
    let close = page[open..].find("</textarea>").unwrap() + open;
    let escaped = &page[open..close];
    let raw = escaped
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    serde_json::from_str(&raw).expect("embedded results should be valid JSON")
}

#[actix_rt::test]
async fn form_page_lists_feature_schema() {
    let app = test::init_service(
        App::new().app_data(stub_state()).configure(routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("age"));
    assert!(body.contains("cholesterol"));
    assert!(body.contains("multipart/form-data"));
}

#[actix_rt::test]
async fn valid_upload_renders_all_three_result_forms() {
    let page = post_upload("patients.csv", b"id,age,cholesterol\n1,0.5,0.7\n2,0.3,0.9\n").await;

    // HTML table rows
    assert!(page.contains("<td>1</td>"));
    assert!(page.contains("<td>2</td>"));

    // JSON mapping with probabilities in range
    let json = extract_results_json(&page);
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);
    for id in ["1", "2"] {
        let prob = object[id].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&prob), "probability {prob} out of range");
    }

    // CSV download payload
    assert!(page.contains("id,prediction"));
}

#[actix_rt::test]
async fn csv_and_json_renderings_agree() {
    let page = post_upload("patients.csv", b"id,age,cholesterol\n7,0.1,0.2\n8,0.9,0.4\n").await;

    let json = extract_results_json(&page);

    let start = page.find("id=\"results-csv\"").unwrap();
    let open = page[start..].find('>').unwrap() + start + 1;
    let close = page[open..].find("</textarea>").unwrap() + open;
    let csv_text = page[open..close].replace("&quot;", "\"");

    let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        let id = record.get(0).unwrap();
        let prob: f64 = record.get(1).unwrap().parse().unwrap();
        assert_eq!(json[id].as_f64().unwrap(), prob);
        rows += 1;
    }
    assert_eq!(rows, json.as_object().unwrap().len());
}

#[actix_rt::test]
async fn duplicate_ids_keep_last_probability_in_first_position() {
    let page = post_upload("patients.csv", b"id,age,cholesterol\n1,0.5,0.7\n2,0.3,0.9\n1,5.0,5.0\n").await;

    let json = extract_results_json(&page);
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);

    // First key is still "1" (first-seen order)
    assert_eq!(object.keys().next().unwrap(), "1");

    // Probability comes from the second occurrence: logistic(10.0)
    let expected = 1.0 / (1.0 + (-10.0f64).exp());
    let actual = object["1"].as_f64().unwrap();
    assert!((actual - expected).abs() < 1e-9);
}

#[actix_rt::test]
async fn non_csv_extension_is_rejected() {
    let page = post_upload("patients.txt", b"id,age,cholesterol\n1,0.5,0.7\n").await;
    assert!(page.contains("Invalid file format"));
    assert!(!page.contains("id=\"results-json\""));
}

#[actix_rt::test]
async fn missing_id_column_is_rejected() {
    let page = post_upload("patients.csv", b"age,cholesterol\n0.5,0.7\n").await;
    assert!(page.contains("Missing &#x27;id&#x27; column") || page.contains("Missing 'id' column"));
    assert!(!page.contains("id=\"results-json\""));
}

#[actix_rt::test]
async fn non_utf8_content_yields_decode_error() {
    let page = post_upload("patients.csv", &[0x69, 0x64, 0x0a, 0xff, 0xfe]).await;
    assert!(page.contains("not valid UTF-8"));
}

#[actix_rt::test]
async fn inference_failure_is_rendered_into_the_form() {
    // Validation passes; the model itself fails. post_upload_with already
    // asserts the success status, so a raw server error would fail here.
    let page = post_upload_with(
        broken_state(),
        "patients.csv",
        b"id,age,cholesterol\n1,0.5,0.7\n",
    )
    .await;

    assert!(page.contains("Prediction failed"));
    assert!(page.contains("model backend unavailable"));
    assert!(!page.contains("id=\"results-json\""));
}

#[actix_rt::test]
async fn duplicated_feature_column_is_rejected() {
    let page = post_upload("patients.csv", b"id,age,age,cholesterol\n1,0.5,9.9,0.7\n").await;
    assert!(
        page.contains("Duplicate column &#x27;age&#x27;") || page.contains("Duplicate column 'age'")
    );
    assert!(!page.contains("id=\"results-json\""));
}

#[actix_rt::test]
async fn schema_mismatch_names_offending_columns() {
    let page = post_upload("patients.csv", b"id,age,height\n1,0.5,180\n").await;
    assert!(
        page.contains("missing: cholesterol"),
        "missing column should be named"
    );
    assert!(
        page.contains("unexpected: height"),
        "unexpected column should be named"
    );
}
