//! JSON shapes of the analytics service and their conversion into the
//! client's artifact types.

use crate::error::WorkflowError;
use crate::model::{
    CellValue, ClassificationMetrics, DatasetRevision, EdaArtifact, FillMethod, ModelFamily,
    ModelResult, ModelType, PreprocessOptions, ProcessedArtifact, RegressionMetrics,
    TabularArtifact, TrainOptions,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewDto {
    pub columns: Vec<String>,
    pub data: Vec<Vec<CellValue>>,
    pub shape: (usize, usize),
    #[serde(default)]
    pub preprocessing_steps: Option<Vec<String>>,
}

impl PreviewDto {
    pub fn into_table(self) -> Result<TabularArtifact, WorkflowError> {
        let (total_rows, total_cols) = self.shape;
        if total_cols != self.columns.len() {
            return Err(WorkflowError::Decode(format!(
                "shape reports {total_cols} columns but {} were sent",
                self.columns.len()
            )));
        }
        TabularArtifact::new(self.columns, self.data, Some(total_rows))
    }

    pub fn into_processed(self) -> Result<ProcessedArtifact, WorkflowError> {
        let steps = self.preprocessing_steps.clone().ok_or_else(|| {
            WorkflowError::Decode("preprocessing response lacks preprocessing_steps".into())
        })?;
        Ok(ProcessedArtifact {
            table: self.into_table()?,
            preprocessing_steps: steps,
            derived_from: DatasetRevision::default(),
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PreprocessRequest<'a> {
    pub drop_columns: Vec<&'a str>,
    pub fill_na_method: FillMethod,
    pub fill_na_value: Option<f64>,
    pub normalize: bool,
    pub remove_outliers: bool,
    pub outlier_threshold: f64,
}

impl<'a> From<&'a PreprocessOptions> for PreprocessRequest<'a> {
    fn from(o: &'a PreprocessOptions) -> Self {
        Self {
            drop_columns: o.drop_columns.iter().map(String::as_str).collect(),
            fill_na_method: o.fill_method,
            fill_na_value: match o.fill_method {
                FillMethod::FixedValue => o.fill_value,
                _ => None,
            },
            normalize: o.normalize,
            remove_outliers: o.remove_outliers,
            outlier_threshold: o.outlier_threshold,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest<'a> {
    pub model_type: ModelType,
    pub target_column: &'a str,
    pub feature_columns: &'a [String],
}

impl<'a> From<&'a TrainOptions> for PredictRequest<'a> {
    fn from(o: &'a TrainOptions) -> Self {
        Self {
            model_type: o.model_type,
            target_column: &o.target,
            feature_columns: &o.features,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EdaDto {
    pub histograms: Option<String>,
    pub correlation_matrix: Option<String>,
    pub boxplots: Option<String>,
}

impl EdaDto {
    pub fn into_artifact(self) -> Result<EdaArtifact, WorkflowError> {
        Ok(EdaArtifact {
            histograms: decode_image("histograms", self.histograms)?,
            correlation_matrix: decode_image("correlation_matrix", self.correlation_matrix)?,
            boxplots: decode_image("boxplots", self.boxplots)?,
            generated_against: DatasetRevision::default(),
        })
    }
}

fn decode_image(field: &str, b64: Option<String>) -> Result<Option<Vec<u8>>, WorkflowError> {
    b64.map(|s| {
        STANDARD
            .decode(s.trim())
            .map_err(|e| WorkflowError::Decode(format!("{field} is not valid base64: {e}")))
    })
    .transpose()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadDto {
    pub csv_content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelInfoDto {
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub target: String,
    pub features: Vec<String>,
    #[serde(default)]
    pub intercept: Option<f64>,
    #[serde(default)]
    pub coefficients: BTreeMap<String, f64>,
    #[serde(default)]
    pub classes: Vec<CellValue>,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictDto {
    #[serde(default)]
    pub prediction: Option<f64>,
    #[serde(default)]
    pub predictions: Vec<f64>,
    pub metrics: serde_json::Map<String, serde_json::Value>,
    pub model_info: ModelInfoDto,
    #[serde(default)]
    pub model_filename: Option<String>,
}

impl PredictDto {
    pub fn into_result(self) -> Result<ModelResult, WorkflowError> {
        let info = self.model_info;
        let m = &self.metrics;
        let family = match info.model_type {
            ModelType::Regression => ModelFamily::Regression {
                metrics: RegressionMetrics {
                    mse: metric(m, "mse")?,
                    rmse: metric(m, "rmse")?,
                    mae: metric(m, "mae")?,
                    r2: metric(m, "r2")?,
                },
                intercept: info.intercept,
                coefficients: info.coefficients,
            },
            ModelType::Classification => ModelFamily::Classification {
                metrics: classification_metrics(m)?,
                classes: info.classes,
            },
            ModelType::RandomForest => {
                let features: HashSet<&str> = info.features.iter().map(String::as_str).collect();
                if let Some((name, v)) = info
                    .feature_importance
                    .iter()
                    .find(|(k, v)| !features.contains(k.as_str()) || !(0.0..=1.0).contains(*v))
                {
                    return Err(WorkflowError::Decode(format!(
                        "invalid importance {v} for feature '{name}'"
                    )));
                }
                ModelFamily::RandomForest {
                    metrics: classification_metrics(m)?,
                    classes: info.classes,
                    feature_importance: info.feature_importance,
                }
            }
        };
        Ok(ModelResult {
            target: info.target,
            features: info.features,
            family,
            folds: folds(m),
            next_prediction: self
                .prediction
                .or_else(|| self.predictions.last().copied()),
            predictions: self.predictions,
            model_filename: self.model_filename,
        })
    }
}

fn classification_metrics(
    m: &serde_json::Map<String, serde_json::Value>,
) -> Result<ClassificationMetrics, WorkflowError> {
    Ok(ClassificationMetrics {
        accuracy: metric(m, "accuracy")?,
        precision: metric(m, "precision")?,
        recall: metric(m, "recall")?,
        f1: metric(m, "f1")?,
    })
}

/// Older backends report cross-validated metrics as `average_<name>`.
fn metric(m: &serde_json::Map<String, serde_json::Value>, name: &str) -> Result<f64, WorkflowError> {
    m.get(name)
        .or_else(|| m.get(&format!("average_{name}")))
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| WorkflowError::Decode(format!("metric '{name}' missing or not a number")))
}

fn folds(m: &serde_json::Map<String, serde_json::Value>) -> Vec<BTreeMap<String, f64>> {
    let Some(serde_json::Value::Array(folds)) = m.get("folds") else {
        return Vec::new();
    };
    folds
        .iter()
        .filter_map(serde_json::Value::as_object)
        .map(|fold| {
            fold.iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        })
        .collect()
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI sends `{"detail": "..."}` for raised errors and
/// `{"detail": [{"msg": "..."}, ...]}` for request validation failures.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(body).ok()?;
    match v.get("detail")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let msgs: Vec<String> = items
                .iter()
                .filter_map(|i| match i {
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => other.get("msg")?.as_str().map(str::to_string),
                })
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        serde_json::Value::Object(o) => o.get("msg")?.as_str().map(str::to_string),
        _ => None,
    }
}
