use crate::error::WorkflowError;
use crate::export::{ResultExport, RESULTS_FILE_NAME};
use crate::model::{
    ClientConfig, FillMethod, ModelType, PipelineStep, PreprocessOptions, TrainOptions, UploadFile,
};
use crate::orchestrator::WorkflowController;
use crate::transport::{AnalyticsBackend, HttpBackend};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const PEOPLE_CSV: &str = "\
id,age,income,years,score,city
1,25,30000,1,52,Lisbon
2,32,42000,5,61,Porto
3,47,58000,12,70,Lisbon
4,51,61000,20,74,Braga
5,23,28000,1,49,Porto
6,38,47000,9,66,Lisbon
7,29,35000,3,55,Braga
8,44,52000,15,69,Porto
9,36,45000,8,63,Lisbon
10,58,70000,25,80,Braga
";

/// Parsed upload held by the mock service between calls.
#[derive(Default)]
struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    fn parse(text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let columns = lines
            .next()
            .map(|h| h.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|l| {
                l.split(',')
                    .map(|cell| match cell.parse::<f64>() {
                        Ok(n) => json!(n),
                        Err(_) => json!(cell),
                    })
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    fn preview(&self, limit: usize) -> Value {
        json!({
            "columns": self.columns,
            "data": self.rows.iter().take(limit).collect::<Vec<_>>(),
            "shape": [self.rows.len(), self.columns.len()],
        })
    }
}

#[derive(Clone, Default)]
struct ServiceState {
    data: Arc<Mutex<Dataset>>,
    upload_fields: Arc<Mutex<Vec<(String, Option<String>)>>>,
    last_predict: Arc<Mutex<Option<Value>>>,
}

async fn upload_csv(State(state): State<ServiceState>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    while let Some(field) = multipart.next_field().await.expect("multipart") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        state
            .upload_fields
            .lock()
            .expect("lock")
            .push((name.clone(), file_name));
        if name == "file" {
            let text = field.text().await.expect("text");
            let dataset = Dataset::parse(&text);
            let preview = dataset.preview(5);
            *state.data.lock().expect("lock") = dataset;
            return (StatusCode::OK, Json(preview));
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({"detail": "No file uploaded"})))
}

async fn data_info(State(state): State<ServiceState>) -> Json<Value> {
    let data = state.data.lock().expect("lock");
    let dtypes: serde_json::Map<String, Value> = data
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let numeric = data.rows.iter().all(|r| r[i].is_number());
            (c.clone(), json!(if numeric { "float64" } else { "object" }))
        })
        .collect();
    let missing: serde_json::Map<String, Value> =
        data.columns.iter().map(|c| (c.clone(), json!(0))).collect();
    Json(json!({
        "shape": [data.rows.len(), data.columns.len()],
        "columns": data.columns,
        "dtypes": dtypes,
        "missing_values": missing,
        "numeric_columns": ["id", "age", "income", "years", "score"],
        "categorical_columns": ["city"],
    }))
}

async fn preprocess(State(state): State<ServiceState>, Json(body): Json<Value>) -> Json<Value> {
    let data = state.data.lock().expect("lock");
    let drop: Vec<&str> = body["drop_columns"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let keep: Vec<usize> = (0..data.columns.len())
        .filter(|i| !drop.contains(&data.columns[*i].as_str()))
        .collect();
    let processed = Dataset {
        columns: keep.iter().map(|i| data.columns[*i].clone()).collect(),
        rows: data
            .rows
            .iter()
            .map(|r| keep.iter().map(|i| r[*i].clone()).collect())
            .collect(),
    };

    let mut steps = Vec::new();
    if !drop.is_empty() {
        steps.push(format!("Dropped columns: {}", drop.join(", ")));
    }
    if let Some(method) = body["fill_na_method"].as_str() {
        steps.push(format!("Filled missing values using {method}"));
    }
    if body["normalize"].as_bool() == Some(true) {
        steps.push("Applied normalization to numeric columns".to_string());
    }

    let mut out = processed.preview(10);
    out["preprocessing_steps"] = json!(steps);
    Json(out)
}

async fn generate_eda() -> Json<Value> {
    // PNG signature plus an IHDR chunk for a 4×2 image.
    Json(json!({
        "histograms": "iVBORw0KGgoAAAANSUhEUgAAAAQAAAACCAYAAAB/qH1jAAAA",
        "correlation_matrix": "iVBORw0KGgoAAAANSUhEUgAAAAQAAAACCAYAAAB/qH1jAAAA",
    }))
}

async fn predict(State(state): State<ServiceState>, Json(body): Json<Value>) -> Json<Value> {
    *state.last_predict.lock().expect("lock") = Some(body.clone());
    Json(json!({
        "predictions": [51.8, 62.3, 70.1],
        "metrics": {
            "mse": 1.92, "rmse": 1.3856, "mae": 1.1, "r2": 0.97,
            "folds": [{"mse": 1.8, "r2": 0.96}, {"mse": 2.04, "r2": 0.98}],
        },
        "model_info": {
            "type": "regression",
            "target": body["target_column"],
            "features": body["feature_columns"],
            "intercept": 12.5,
            "coefficients": {"age": 0.41, "income": 0.0006},
        },
        "model_filename": "model_regression.joblib",
    }))
}

async fn download_results(State(state): State<ServiceState>) -> Json<Value> {
    let data = state.data.lock().expect("lock");
    let mut csv = data.columns.join(",");
    csv.push('\n');
    for row in &data.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
            .collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    Json(json!({ "csv_content": csv }))
}

async fn spawn_service() -> (String, ServiceState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServiceState::default();
    let app = Router::new()
        .route("/upload-csv/", post(upload_csv))
        .route("/data-info/", get(data_info))
        .route("/preprocess/", post(preprocess))
        .route("/generate-eda/", get(generate_eda))
        .route("/predict/", post(predict))
        .route("/download-results/", get(download_results))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

/// Every route fails in a different way.
async fn spawn_failing_service() -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route(
            "/upload-csv/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "Only CSV files are accepted"})),
                )
            }),
        )
        .route(
            "/preprocess/",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"detail": [
                        {"loc": ["body", "fill_na_value"], "msg": "field required"},
                        {"loc": ["body", "outlier_threshold"], "msg": "value is not a valid float"},
                    ]})),
                )
            }),
        )
        .route(
            "/predict/",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
        )
        .route("/generate-eda/", get(|| async { "{\"histograms\": " }))
        .route(
            "/download-results/",
            get(|| async { (StatusCode::BAD_REQUEST, Json(json!({"detail": "   "}))) }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn config(base_url: &str, export_dir: &Path) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
        user_agent: "tabular-wizard-tests".into(),
        export_dir: export_dir.to_path_buf(),
    }
}

fn people() -> UploadFile {
    UploadFile::new("people.csv", Some("text/csv"), PEOPLE_CSV.as_bytes().to_vec())
}

#[tokio::test]
async fn detail_message_is_surfaced_verbatim() {
    let url = spawn_failing_service().await;
    let backend = HttpBackend::new(&config(&url, Path::new("."))).expect("backend");

    let err = backend.upload(&people()).await.expect_err("400");
    assert!(matches!(
        &err,
        WorkflowError::Transport { status: Some(400), message } if message == "Only CSV files are accepted"
    ));
}

#[tokio::test]
async fn validation_detail_list_is_joined() {
    let url = spawn_failing_service().await;
    let backend = HttpBackend::new(&config(&url, Path::new("."))).expect("backend");

    let err = backend
        .preprocess(&PreprocessOptions::default())
        .await
        .expect_err("422");
    assert_eq!(
        err.to_string(),
        "field required; value is not a valid float"
    );
}

#[tokio::test]
async fn missing_detail_falls_back_to_a_generic_message() {
    let url = spawn_failing_service().await;
    let backend = HttpBackend::new(&config(&url, Path::new("."))).expect("backend");

    let opts = TrainOptions {
        model_type: ModelType::Regression,
        target: "score".into(),
        features: vec!["age".into()],
    };
    let err = backend.train(&opts).await.expect_err("500");
    assert!(matches!(err, WorkflowError::Transport { status: Some(500), .. }));
    assert_eq!(err.to_string(), "Failed to train the model");

    let err = backend.download_results().await.expect_err("blank detail");
    assert_eq!(err.to_string(), "Failed to download the results");
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let url = spawn_failing_service().await;
    let backend = HttpBackend::new(&config(&url, Path::new("."))).expect("backend");

    let err = backend.generate_eda().await.expect_err("truncated json");
    assert!(matches!(err, WorkflowError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_reports_no_status() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let backend =
        HttpBackend::new(&config(&format!("http://{addr}/"), Path::new("."))).expect("backend");
    assert_eq!(backend.base_url(), format!("http://{addr}"));

    let err = backend.data_info().await.expect_err("refused");
    assert!(matches!(err, WorkflowError::Transport { status: None, .. }));
    assert_eq!(err.to_string(), "Failed to load dataset information");
}

#[test]
fn invalid_base_url_is_rejected_up_front() {
    assert!(HttpBackend::new(&config("not a url", Path::new("."))).is_err());
}

#[tokio::test]
async fn upload_preprocess_train_and_download_against_a_live_service() {
    let (url, service) = spawn_service().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = config(&url, dir.path());
    let backend = HttpBackend::new(&cfg).expect("backend");
    let mut controller =
        WorkflowController::new(backend, cfg.request_timeout, ResultExport::new(dir.path()));

    let original = controller.upload(&people()).await.expect("upload");
    assert_eq!(original.total_rows(), 10);
    assert_eq!(original.column_count(), 6);
    assert_eq!(original.row_count(), 5);
    assert!(original.is_preview());
    {
        let fields = service.upload_fields.lock().expect("lock");
        assert_eq!(
            fields.as_slice(),
            &[("file".to_string(), Some("people.csv".to_string()))]
        );
    }

    let info = controller.refresh_data_info().await.expect("data info");
    assert_eq!(info.shape, (10, 6));
    assert_eq!(info.dtypes.get("city").map(String::as_str), Some("object"));

    let opts = PreprocessOptions {
        drop_columns: ["city".to_string()].into_iter().collect(),
        fill_method: FillMethod::Mean,
        normalize: true,
        ..Default::default()
    };
    let processed = controller.preprocess(&opts).await.expect("preprocess");
    assert_eq!(processed.table.shape(), (10, 5));
    assert!(!processed.table.has_column("city"));
    let steps = &processed.preprocessing_steps;
    let mean = steps.iter().position(|s| s.contains("mean")).expect("fill step");
    let norm = steps
        .iter()
        .position(|s| s.contains("normalization"))
        .expect("normalize step");
    assert!(mean < norm);

    let eda = controller.generate_eda().await.expect("eda");
    assert_eq!(eda.charts().len(), 2);
    assert!(eda.boxplots.is_none());
    assert_eq!(controller.state().active_step, PipelineStep::Explore);

    let train = TrainOptions {
        model_type: ModelType::Regression,
        target: "score".into(),
        features: vec!["age".into(), "income".into()],
    };
    let result = controller.train(&train).await.expect("train");
    for name in ["mse", "rmse", "mae", "r2"] {
        assert!(result.metric(name).is_some(), "missing {name}");
    }
    assert_eq!(result.folds.len(), 2);
    assert_eq!(result.next_prediction, Some(70.1));
    assert_eq!(controller.state().active_step, PipelineStep::Results);
    {
        let sent = service.last_predict.lock().expect("lock");
        let sent = sent.as_ref().expect("predict body");
        assert_eq!(sent["model_type"], "regression");
        assert_eq!(sent["target_column"], "score");
        assert_eq!(sent["feature_columns"], json!(["age", "income"]));
    }

    let file = controller.download_results().await.expect("download");
    assert_eq!(file.path, dir.path().join(RESULTS_FILE_NAME));
    let written = std::fs::read_to_string(&file.path).expect("read export");
    assert!(written.starts_with("id,age,income,years,score,city\n"));
    assert_eq!(written.lines().count(), 11);
    assert_eq!(controller.state().active_step, PipelineStep::Results);
    assert!(controller.state().error.is_none());
}
