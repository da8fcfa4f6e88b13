use crate::error::{EmptyStateError, WorkflowError};
use bytes::Bytes;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub export_dir: PathBuf,
}

/// Wizard steps in workflow order. The index drives step gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PipelineStep {
    #[default]
    Upload,
    View,
    Preprocess,
    Explore,
    Train,
    Results,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 6] = [
        PipelineStep::Upload,
        PipelineStep::View,
        PipelineStep::Preprocess,
        PipelineStep::Explore,
        PipelineStep::Train,
        PipelineStep::Results,
    ];

    pub fn index(self) -> usize {
        match self {
            PipelineStep::Upload => 0,
            PipelineStep::View => 1,
            PipelineStep::Preprocess => 2,
            PipelineStep::Explore => 3,
            PipelineStep::Train => 4,
            PipelineStep::Results => 5,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            PipelineStep::Upload => "Upload",
            PipelineStep::View => "Data Preview",
            PipelineStep::Preprocess => "Preprocessing",
            PipelineStep::Explore => "Exploratory Analysis",
            PipelineStep::Train => "Model Training",
            PipelineStep::Results => "Results",
        }
    }
}

/// A single table cell as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(CellValue::Null),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .ok_or_else(|| de::Error::custom(format!("number out of range: {n}"))),
            serde_json::Value::String(s) => Ok(CellValue::Text(s)),
            // pandas emits booleans for bool columns; the table only knows text.
            serde_json::Value::Bool(b) => Ok(CellValue::Text(b.to_string())),
            other => Err(de::Error::custom(format!("unsupported cell value: {other}"))),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => f.write_str("N/A"),
        }
    }
}

/// Columnar artifact: ordered unique columns plus a row matrix.
///
/// `shape` always equals `(rows.len(), columns.len())`. The backend only
/// ships a preview of the first rows, so the size of the full server-side
/// dataset is kept separately in `total_rows`.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularArtifact {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
    shape: (usize, usize),
    total_rows: usize,
}

impl TabularArtifact {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
        total_rows: Option<usize>,
    ) -> Result<Self, WorkflowError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(WorkflowError::Decode(format!("duplicate column '{c}'")));
            }
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(WorkflowError::Decode(format!(
                "row {i} has {} cells but there are {} columns",
                row.len(),
                columns.len()
            )));
        }
        let shape = (rows.len(), columns.len());
        let total_rows = total_rows.unwrap_or(rows.len()).max(rows.len());
        Ok(Self {
            columns,
            rows,
            shape,
            total_rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn row_count(&self) -> usize {
        self.shape.0
    }

    pub fn column_count(&self) -> usize {
        self.shape.1
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// True when the server holds more rows than were shipped.
    pub fn is_preview(&self) -> bool {
        self.total_rows > self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Counter stamped on every successful upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DatasetRevision(pub u64);

impl DatasetRevision {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedArtifact {
    pub table: TabularArtifact,
    /// Human-readable transforms, in application order.
    pub preprocessing_steps: Vec<String>,
    pub derived_from: DatasetRevision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdaChart {
    Histograms,
    CorrelationMatrix,
    Boxplots,
}

impl EdaChart {
    pub const ALL: [EdaChart; 3] = [
        EdaChart::Histograms,
        EdaChart::CorrelationMatrix,
        EdaChart::Boxplots,
    ];

    pub fn title(self) -> &'static str {
        match self {
            EdaChart::Histograms => "Variable distributions",
            EdaChart::CorrelationMatrix => "Correlation matrix",
            EdaChart::Boxplots => "Boxplots (outlier detection)",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            EdaChart::Histograms => "histograms",
            EdaChart::CorrelationMatrix => "correlation_matrix",
            EdaChart::Boxplots => "boxplots",
        }
    }
}

/// Decoded PNG charts. `None` means the backend did not generate that chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdaArtifact {
    pub histograms: Option<Vec<u8>>,
    pub correlation_matrix: Option<Vec<u8>>,
    pub boxplots: Option<Vec<u8>>,
    pub generated_against: DatasetRevision,
}

impl EdaArtifact {
    pub fn chart(&self, chart: EdaChart) -> Option<&[u8]> {
        match chart {
            EdaChart::Histograms => self.histograms.as_deref(),
            EdaChart::CorrelationMatrix => self.correlation_matrix.as_deref(),
            EdaChart::Boxplots => self.boxplots.as_deref(),
        }
    }

    pub fn charts(&self) -> Vec<(EdaChart, &[u8])> {
        EdaChart::ALL
            .into_iter()
            .filter_map(|c| self.chart(c).map(|bytes| (c, bytes)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.charts().is_empty()
    }
}

/// Response of `/data-info/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataInfo {
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    #[serde(default)]
    pub dtypes: BTreeMap<String, String>,
    #[serde(default)]
    pub missing_values: BTreeMap<String, u64>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
}

impl DataInfo {
    pub fn total_missing(&self) -> u64 {
        self.missing_values.values().sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillMethod {
    #[default]
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "median")]
    Median,
    #[serde(rename = "mode")]
    Mode,
    #[serde(rename = "value")]
    FixedValue,
    #[serde(rename = "drop")]
    DropRows,
}

impl FillMethod {
    pub const ALL: [FillMethod; 5] = [
        FillMethod::Mean,
        FillMethod::Median,
        FillMethod::Mode,
        FillMethod::FixedValue,
        FillMethod::DropRows,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FillMethod::Mean => "Fill with mean",
            FillMethod::Median => "Fill with median",
            FillMethod::Mode => "Fill with mode",
            FillMethod::FixedValue => "Fill with a fixed value",
            FillMethod::DropRows => "Drop rows with missing values",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    pub drop_columns: BTreeSet<String>,
    pub fill_method: FillMethod,
    /// Required iff `fill_method` is `FixedValue`.
    pub fill_value: Option<f64>,
    pub normalize: bool,
    pub remove_outliers: bool,
    /// IQR multiplier; only meaningful with `remove_outliers`.
    pub outlier_threshold: f64,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            drop_columns: BTreeSet::new(),
            fill_method: FillMethod::Mean,
            fill_value: None,
            normalize: true,
            remove_outliers: false,
            outlier_threshold: 1.5,
        }
    }
}

impl PreprocessOptions {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        match (self.fill_method, self.fill_value) {
            (FillMethod::FixedValue, None) => {
                return Err(WorkflowError::validation(
                    "a fill value is required when filling with a fixed value",
                ))
            }
            (FillMethod::FixedValue, Some(v)) if !v.is_finite() => {
                return Err(WorkflowError::validation("the fill value must be a finite number"))
            }
            (m, Some(_)) if m != FillMethod::FixedValue => {
                return Err(WorkflowError::validation(
                    "a fill value is only accepted when filling with a fixed value",
                ))
            }
            _ => {}
        }
        if self.remove_outliers
            && !(self.outlier_threshold.is_finite() && self.outlier_threshold > 0.0)
        {
            return Err(WorkflowError::validation(
                "the IQR outlier threshold must be a positive number",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Regression,
    Classification,
    RandomForest,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [
        ModelType::Regression,
        ModelType::Classification,
        ModelType::RandomForest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ModelType::Regression => "Linear regression",
            ModelType::Classification => "Logistic regression",
            ModelType::RandomForest => "Random forest classifier",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModelType::Regression => "Predicts continuous numeric values.",
            ModelType::Classification => "Suited to binary (0/1) classification.",
            ModelType::RandomForest => "Robust classifier that also reports feature importance.",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainOptions {
    pub model_type: ModelType,
    pub target: String,
    /// Ordered; never contains `target`.
    pub features: Vec<String>,
}

impl TrainOptions {
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.target.trim().is_empty() {
            return Err(WorkflowError::validation("select a target column"));
        }
        if self.features.is_empty() {
            return Err(WorkflowError::validation("select at least one feature column"));
        }
        if self.features.iter().any(|f| f == &self.target) {
            return Err(WorkflowError::validation(
                "the target column cannot also be used as a feature",
            ));
        }
        let mut seen = HashSet::with_capacity(self.features.len());
        if let Some(dup) = self.features.iter().find(|f| !seen.insert(f.as_str())) {
            return Err(WorkflowError::validation(format!(
                "feature '{dup}' is selected more than once"
            )));
        }
        Ok(())
    }

    /// Target and features must name columns of the dataset being trained on.
    pub fn ensure_columns_in(&self, table: &TabularArtifact) -> Result<(), WorkflowError> {
        std::iter::once(&self.target)
            .chain(self.features.iter())
            .find(|c| !table.has_column(c))
            .map_or(Ok(()), |missing| {
                Err(WorkflowError::validation(format!(
                    "column '{missing}' is not present in the processed data"
                )))
            })
    }
}

/// File selected for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub media_type: Option<String>,
    pub content: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, media_type: Option<&str>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            content: content.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, WorkflowError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WorkflowError::validation(format!("not a file: {}", path.display())))?
            .to_string();
        let content = tokio::fs::read(path).await.map_err(|e| {
            WorkflowError::validation(format!("cannot read {}: {e}", path.display()))
        })?;
        let media_type = has_csv_suffix(&name).then_some("text/csv");
        Ok(Self::new(name, media_type, content))
    }

    /// CSV by declared media type or by `.csv` suffix.
    pub fn is_csv(&self) -> bool {
        let declared = self
            .media_type
            .as_deref()
            .and_then(|m| m.split(';').next())
            .is_some_and(|m| m.trim().eq_ignore_ascii_case("text/csv"));
        declared || has_csv_suffix(&self.name)
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.is_csv() {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!(
                "only CSV files can be uploaded ('{}' is not CSV)",
                self.name
            )))
        }
    }
}

fn has_csv_suffix(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Family-specific part of a training result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelFamily {
    Regression {
        metrics: RegressionMetrics,
        intercept: Option<f64>,
        coefficients: BTreeMap<String, f64>,
    },
    Classification {
        metrics: ClassificationMetrics,
        classes: Vec<CellValue>,
    },
    RandomForest {
        metrics: ClassificationMetrics,
        classes: Vec<CellValue>,
        /// Importance per feature, each in `[0, 1]`.
        feature_importance: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    pub target: String,
    pub features: Vec<String>,
    pub family: ModelFamily,
    /// Per cross-validation fold metric maps.
    pub folds: Vec<BTreeMap<String, f64>>,
    pub predictions: Vec<f64>,
    pub next_prediction: Option<f64>,
    pub model_filename: Option<String>,
}

impl ModelResult {
    pub fn model_type(&self) -> ModelType {
        match self.family {
            ModelFamily::Regression { .. } => ModelType::Regression,
            ModelFamily::Classification { .. } => ModelType::Classification,
            ModelFamily::RandomForest { .. } => ModelType::RandomForest,
        }
    }

    /// Metric name to value, in display order for the model family.
    pub fn metrics(&self) -> Vec<(&'static str, f64)> {
        match &self.family {
            ModelFamily::Regression { metrics: m, .. } => {
                vec![("mse", m.mse), ("rmse", m.rmse), ("mae", m.mae), ("r2", m.r2)]
            }
            ModelFamily::Classification { metrics: m, .. }
            | ModelFamily::RandomForest { metrics: m, .. } => vec![
                ("accuracy", m.accuracy),
                ("precision", m.precision),
                ("recall", m.recall),
                ("f1", m.f1),
            ],
        }
    }

    #[cfg(test)]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics()
            .into_iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    pub fn classes(&self) -> Option<&[CellValue]> {
        match &self.family {
            ModelFamily::Regression { .. } => None,
            ModelFamily::Classification { classes, .. }
            | ModelFamily::RandomForest { classes, .. } => Some(classes),
        }
    }

    /// Feature importance sorted from most to least important.
    pub fn ranked_importance(&self) -> Vec<(&str, f64)> {
        let ModelFamily::RandomForest {
            feature_importance, ..
        } = &self.family
        else {
            return Vec::new();
        };
        let mut ranked: Vec<(&str, f64)> = feature_importance
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Everything the wizard knows. Owned and written only by the workflow
/// controller; presentation layers receive clones.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub active_step: PipelineStep,
    pub original: Option<TabularArtifact>,
    pub processed: Option<ProcessedArtifact>,
    pub eda: Option<EdaArtifact>,
    pub results: Option<ModelResult>,
    pub data_info: Option<DataInfo>,
    pub dataset_revision: DatasetRevision,
    pub loading: bool,
    pub error: Option<String>,
}

impl PipelineState {
    /// Why `step` cannot render yet, if its prerequisite artifact is missing.
    pub fn missing_prerequisite(&self, step: PipelineStep) -> Option<EmptyStateError> {
        let (present, guidance, back_to) = match step {
            PipelineStep::Upload => return None,
            PipelineStep::View | PipelineStep::Preprocess => (
                self.original.is_some(),
                "No data available. Upload a CSV file first.",
                PipelineStep::Upload,
            ),
            PipelineStep::Explore => (
                self.eda.is_some(),
                "No charts available. Generate the EDA charts first.",
                PipelineStep::View,
            ),
            PipelineStep::Train => (
                self.processed.is_some(),
                "No processed data available. Preprocess your data first.",
                PipelineStep::Preprocess,
            ),
            PipelineStep::Results => (
                self.results.is_some(),
                "No results available. Train a model first.",
                PipelineStep::Train,
            ),
        };
        (!present).then_some(EmptyStateError {
            step,
            guidance,
            back_to,
        })
    }

    /// Processed data derived from an earlier upload than the current one.
    pub fn processed_is_stale(&self) -> bool {
        self.processed
            .as_ref()
            .is_some_and(|p| p.derived_from < self.dataset_revision)
    }

    pub fn eda_is_stale(&self) -> bool {
        self.eda
            .as_ref()
            .is_some_and(|e| e.generated_against < self.dataset_revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn step_indices_are_contiguous() {
        for (i, step) in PipelineStep::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(PipelineStep::from_index(i), Some(*step));
        }
        assert_eq!(PipelineStep::from_index(6), None);
    }

    #[test]
    fn cells_decode_numbers_text_null_and_booleans() {
        let cells: Vec<CellValue> =
            serde_json::from_str(r#"[1, 2.5, "M", null, true]"#).expect("decode");
        assert_eq!(
            cells,
            vec![
                CellValue::Number(1.0),
                CellValue::Number(2.5),
                text("M"),
                CellValue::Null,
                text("true"),
            ]
        );
        assert!(serde_json::from_str::<CellValue>(r#"{"a": 1}"#).is_err());
    }

    #[test]
    fn cells_render_like_the_table_expects() {
        assert_eq!(CellValue::Number(720.0).to_string(), "720");
        assert_eq!(CellValue::Number(-0.25).to_string(), "-0.25");
        assert_eq!(CellValue::Null.to_string(), "N/A");
    }

    #[test]
    fn artifact_rejects_ragged_rows_and_duplicate_columns() {
        let ragged = TabularArtifact::new(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Number(1.0)]],
            None,
        );
        assert!(matches!(ragged, Err(WorkflowError::Decode(_))));

        let dup = TabularArtifact::new(vec!["a".into(), "a".into()], vec![], None);
        assert!(matches!(dup, Err(WorkflowError::Decode(_))));
    }

    #[test]
    fn artifact_shape_follows_rows_and_keeps_server_total() {
        let t = TabularArtifact::new(
            vec!["a".into()],
            vec![vec![CellValue::Number(1.0)], vec![CellValue::Null]],
            Some(500),
        )
        .expect("valid");
        assert_eq!(t.shape(), (2, 1));
        assert_eq!(t.total_rows(), 500);
        assert!(t.is_preview());
    }

    #[test]
    fn fixed_value_fill_requires_a_value() {
        let mut opts = PreprocessOptions {
            fill_method: FillMethod::FixedValue,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
        opts.fill_value = Some(0.0);
        assert!(opts.validate().is_ok());

        let stray = PreprocessOptions {
            fill_value: Some(3.0),
            ..Default::default()
        };
        assert!(stray.validate().is_err());
    }

    #[test]
    fn outlier_threshold_must_be_positive_when_enabled() {
        let mut opts = PreprocessOptions {
            remove_outliers: true,
            outlier_threshold: 0.0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
        opts.outlier_threshold = 3.0;
        assert!(opts.validate().is_ok());
        opts.remove_outliers = false;
        opts.outlier_threshold = -1.0;
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn target_listed_as_feature_is_rejected() {
        let opts = TrainOptions {
            model_type: ModelType::Regression,
            target: "score".into(),
            features: vec!["score".into(), "age".into()],
        };
        assert!(matches!(opts.validate(), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn train_options_need_target_and_features() {
        let mut opts = TrainOptions::default();
        assert!(opts.validate().is_err());
        opts.target = "y".into();
        assert!(opts.validate().is_err());
        opts.features = vec!["a".into(), "a".into()];
        assert!(opts.validate().is_err());
        opts.features = vec!["a".into(), "b".into()];
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn csv_detection_uses_media_type_or_suffix() {
        assert!(UploadFile::new("data.CSV", None, "a\n1\n").is_csv());
        assert!(UploadFile::new("export", Some("text/csv; charset=utf-8"), "").is_csv());
        let xlsx = UploadFile::new("data.xlsx", Some("application/vnd.ms-excel"), "");
        assert!(!xlsx.is_csv());
        assert!(matches!(xlsx.validate(), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn empty_state_points_back_to_the_right_step() {
        let state = PipelineState::default();
        assert!(state.missing_prerequisite(PipelineStep::Upload).is_none());
        let gap = state
            .missing_prerequisite(PipelineStep::Train)
            .expect("train needs processed data");
        assert_eq!(gap.back_to, PipelineStep::Preprocess);
        let gap = state
            .missing_prerequisite(PipelineStep::Explore)
            .expect("explore needs charts");
        assert_eq!(gap.back_to, PipelineStep::View);
    }

    #[test]
    fn importance_is_ranked_descending() {
        let result = ModelResult {
            target: "y".into(),
            features: vec!["a".into(), "b".into(), "c".into()],
            family: ModelFamily::RandomForest {
                metrics: ClassificationMetrics {
                    accuracy: 0.9,
                    precision: 0.9,
                    recall: 0.9,
                    f1: 0.9,
                },
                classes: vec![CellValue::Number(0.0), CellValue::Number(1.0)],
                feature_importance: BTreeMap::from([
                    ("a".to_string(), 0.2),
                    ("b".to_string(), 0.5),
                    ("c".to_string(), 0.3),
                ]),
            },
            folds: Vec::new(),
            predictions: Vec::new(),
            next_prediction: None,
            model_filename: None,
        };
        let ranked: Vec<&str> = result.ranked_importance().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ranked, vec!["b", "c", "a"]);
        assert_eq!(result.model_type(), ModelType::RandomForest);
        assert_eq!(result.metric("f1"), Some(0.9));
        assert_eq!(result.metric("mse"), None);
    }
}
