use crate::error::WorkflowError;
use crate::export::ExportedFile;
use crate::model::{FillMethod, ModelType, PipelineState, PreprocessOptions, TrainOptions};
use crate::view::TablePager;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

/// Which text field keyboard input is going to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    UploadPath,
    FillValue,
    OutlierThreshold,
}

#[derive(Debug, Clone)]
pub struct TextInput {
    pub target: InputTarget,
    pub buffer: String,
}

pub struct UiState {
    /// Latest snapshot published by the controller. Never mutated here.
    pub pipeline: PipelineState,
    pub show_help: bool,
    pub info: String,
    pub input: Option<TextInput>,
    pub upload_path: String,

    pub original_pager: TablePager,
    pub processed_pager: TablePager,
    pub preprocess: PreprocessForm,
    pub train: TrainForm,
    pub eda_selected: usize,

    pub exported: Vec<ExportedFile>,
    pub base_url: String,
    pub log_path: Option<PathBuf>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            pipeline: PipelineState::default(),
            show_help: false,
            info: "Enter the path of a CSV file to begin (press Enter).".into(),
            input: None,
            upload_path: String::new(),
            original_pager: TablePager::default(),
            processed_pager: TablePager::default(),
            preprocess: PreprocessForm::default(),
            train: TrainForm::default(),
            eda_selected: 0,
            exported: Vec::new(),
            base_url: String::new(),
            log_path: None,
        }
    }
}

impl UiState {
    /// Replace the pipeline snapshot and re-align the forms with its columns.
    pub fn apply_snapshot(&mut self, pipeline: PipelineState) {
        if let Some(original) = pipeline.original.as_ref() {
            self.preprocess.sync_columns(original.columns());
        }
        if let Some(processed) = pipeline.processed.as_ref() {
            self.train.sync_columns(processed.table.columns());
        }
        let charts = pipeline.eda.as_ref().map_or(0, |e| e.charts().len());
        self.eda_selected = self.eda_selected.min(charts.saturating_sub(1));
        // A fresh backend error supersedes whatever the status line said before.
        if pipeline.error.is_some() && pipeline.error != self.pipeline.error {
            self.info.clear();
        }
        self.pipeline = pipeline;
    }

    pub fn begin_input(&mut self, target: InputTarget) {
        let buffer = match target {
            InputTarget::UploadPath => self.upload_path.clone(),
            InputTarget::FillValue => self.preprocess.fill_value.clone(),
            InputTarget::OutlierThreshold => self.preprocess.outlier_threshold.clone(),
        };
        self.input = Some(TextInput { target, buffer });
    }

    /// Store the edited text in its field. Returns the target that was committed.
    pub fn commit_input(&mut self) -> Option<InputTarget> {
        let input = self.input.take()?;
        let value = input.buffer.trim().to_string();
        match input.target {
            InputTarget::UploadPath => self.upload_path = value,
            InputTarget::FillValue => self.preprocess.fill_value = value,
            InputTarget::OutlierThreshold => self.preprocess.outlier_threshold = value,
        }
        Some(input.target)
    }

    pub fn last_exported_path(&self) -> Option<String> {
        self.exported
            .last()
            .map(|f| f.path.to_string_lossy().into_owned())
    }
}

/// One row of the preprocessing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessField {
    FillMethod,
    FillValue,
    Normalize,
    RemoveOutliers,
    OutlierThreshold,
    Column(usize),
}

const PREPROCESS_OPTION_ROWS: usize = 5;

#[derive(Debug, Clone)]
pub struct PreprocessForm {
    columns: Vec<String>,
    pub drop: BTreeSet<String>,
    pub fill_method: FillMethod,
    pub fill_value: String,
    pub normalize: bool,
    pub remove_outliers: bool,
    pub outlier_threshold: String,
    pub cursor: usize,
}

impl Default for PreprocessForm {
    fn default() -> Self {
        Self::from_options(&PreprocessOptions::default())
    }
}

impl PreprocessForm {
    pub fn from_options(opts: &PreprocessOptions) -> Self {
        Self {
            columns: Vec::new(),
            drop: opts.drop_columns.clone(),
            fill_method: opts.fill_method,
            fill_value: opts.fill_value.map(|v| v.to_string()).unwrap_or_default(),
            normalize: opts.normalize,
            remove_outliers: opts.remove_outliers,
            outlier_threshold: opts.outlier_threshold.to_string(),
            cursor: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sync_columns(&mut self, columns: &[String]) {
        if self.columns.as_slice() == columns {
            return;
        }
        self.columns = columns.to_vec();
        self.drop.retain(|c| columns.contains(c));
        self.cursor = self.cursor.min(self.row_count() - 1);
    }

    pub fn row_count(&self) -> usize {
        PREPROCESS_OPTION_ROWS + self.columns.len()
    }

    pub fn field_at(&self, row: usize) -> PreprocessField {
        match row {
            0 => PreprocessField::FillMethod,
            1 => PreprocessField::FillValue,
            2 => PreprocessField::Normalize,
            3 => PreprocessField::RemoveOutliers,
            4 => PreprocessField::OutlierThreshold,
            n => PreprocessField::Column(n - PREPROCESS_OPTION_ROWS),
        }
    }

    pub fn move_cursor(&mut self, down: bool) {
        let last = self.row_count() - 1;
        self.cursor = if down {
            (self.cursor + 1).min(last)
        } else {
            self.cursor.saturating_sub(1)
        };
    }

    /// Toggle or cycle the focused row. Text rows return the field to edit.
    pub fn activate(&mut self) -> Option<InputTarget> {
        match self.field_at(self.cursor) {
            PreprocessField::FillMethod => {
                let idx = FillMethod::ALL
                    .iter()
                    .position(|m| *m == self.fill_method)
                    .map_or(0, |i| (i + 1) % FillMethod::ALL.len());
                self.fill_method = FillMethod::ALL[idx];
                None
            }
            PreprocessField::FillValue => Some(InputTarget::FillValue),
            PreprocessField::Normalize => {
                self.normalize = !self.normalize;
                None
            }
            PreprocessField::RemoveOutliers => {
                self.remove_outliers = !self.remove_outliers;
                None
            }
            PreprocessField::OutlierThreshold => Some(InputTarget::OutlierThreshold),
            PreprocessField::Column(i) => {
                if let Some(col) = self.columns.get(i) {
                    if !self.drop.remove(col) {
                        self.drop.insert(col.clone());
                    }
                }
                None
            }
        }
    }

    pub fn to_options(&self) -> Result<PreprocessOptions, WorkflowError> {
        let fill_value = match self.fill_method {
            FillMethod::FixedValue if !self.fill_value.is_empty() => {
                Some(self.fill_value.parse::<f64>().map_err(|_| {
                    WorkflowError::validation(format!("'{}' is not a number", self.fill_value))
                })?)
            }
            _ => None,
        };
        let outlier_threshold = self.outlier_threshold.parse::<f64>().map_err(|_| {
            WorkflowError::validation(format!(
                "'{}' is not a valid outlier threshold",
                self.outlier_threshold
            ))
        })?;
        let opts = PreprocessOptions {
            drop_columns: self.drop.clone(),
            fill_method: self.fill_method,
            fill_value,
            normalize: self.normalize,
            remove_outliers: self.remove_outliers,
            outlier_threshold,
        };
        opts.validate()?;
        Ok(opts)
    }
}

/// Row 0 selects the model family; the rest are the processed columns.
#[derive(Debug, Clone, Default)]
pub struct TrainForm {
    columns: Vec<String>,
    pub model_type: ModelType,
    pub target: Option<String>,
    pub features: HashSet<String>,
    pub cursor: usize,
}

impl TrainForm {
    pub fn from_options(opts: Option<&TrainOptions>) -> Self {
        let Some(opts) = opts else {
            return Self::default();
        };
        Self {
            columns: Vec::new(),
            model_type: opts.model_type,
            target: Some(opts.target.clone()).filter(|t| !t.is_empty()),
            features: opts.features.iter().cloned().collect(),
            cursor: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn sync_columns(&mut self, columns: &[String]) {
        if self.columns.as_slice() == columns {
            return;
        }
        self.columns = columns.to_vec();
        if self.target.as_ref().is_some_and(|t| !columns.contains(t)) {
            self.target = None;
        }
        self.features.retain(|f| columns.contains(f));
        self.cursor = self.cursor.min(columns.len());
    }

    pub fn move_cursor(&mut self, down: bool) {
        self.cursor = if down {
            (self.cursor + 1).min(self.columns.len())
        } else {
            self.cursor.saturating_sub(1)
        };
    }

    fn focused_column(&self) -> Option<&String> {
        self.cursor.checked_sub(1).and_then(|i| self.columns.get(i))
    }

    pub fn cycle_model(&mut self) {
        let idx = ModelType::ALL
            .iter()
            .position(|m| *m == self.model_type)
            .map_or(0, |i| (i + 1) % ModelType::ALL.len());
        self.model_type = ModelType::ALL[idx];
    }

    /// Make the focused column the target. It stops being a feature.
    pub fn set_target(&mut self) -> bool {
        let Some(col) = self.focused_column().cloned() else {
            return false;
        };
        self.features.remove(&col);
        self.target = Some(col);
        true
    }

    /// Toggle the focused column as a feature. The target cannot be one.
    pub fn toggle_feature(&mut self) -> Result<(), &'static str> {
        let Some(col) = self.focused_column().cloned() else {
            return Err("select a column first");
        };
        if self.target.as_deref() == Some(col.as_str()) {
            return Err("the target column cannot also be a feature");
        }
        if !self.features.remove(&col) {
            self.features.insert(col);
        }
        Ok(())
    }

    /// Features come out in column order.
    pub fn to_options(&self) -> TrainOptions {
        TrainOptions {
            model_type: self.model_type,
            target: self.target.clone().unwrap_or_default(),
            features: self
                .columns
                .iter()
                .filter(|c| self.features.contains(*c))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn preprocess_form_builds_validated_options() {
        let mut form = PreprocessForm::default();
        form.sync_columns(&cols(&["id", "age", "income"]));
        form.cursor = PREPROCESS_OPTION_ROWS;
        form.activate();
        assert!(form.drop.contains("id"));

        form.cursor = 0;
        for _ in 0..3 {
            form.activate();
        }
        assert_eq!(form.fill_method, FillMethod::FixedValue);
        assert!(form.to_options().is_err(), "fixed value without a value");

        form.fill_value = "0".into();
        let opts = form.to_options().expect("valid");
        assert_eq!(opts.fill_value, Some(0.0));
        assert_eq!(opts.drop_columns.len(), 1);
        assert!(opts.normalize);
    }

    #[test]
    fn dropped_columns_follow_a_new_upload() {
        let mut form = PreprocessForm::default();
        form.sync_columns(&cols(&["id", "age"]));
        form.drop.insert("id".into());
        form.sync_columns(&cols(&["age", "score"]));
        assert!(form.drop.is_empty());
    }

    #[test]
    fn train_form_keeps_target_out_of_features() {
        let mut form = TrainForm::default();
        form.sync_columns(&cols(&["age", "income", "score"]));

        form.cursor = 2;
        form.toggle_feature().expect("income");
        form.cursor = 1;
        form.toggle_feature().expect("age");
        form.cursor = 3;
        assert!(form.set_target());
        assert!(form.toggle_feature().is_err());

        let opts = form.to_options();
        assert_eq!(opts.target, "score");
        assert_eq!(opts.features, vec!["age", "income"]);
        assert!(opts.validate().is_ok());

        form.cursor = 1;
        assert!(form.set_target());
        assert_eq!(form.to_options().features, vec!["income"]);
    }

    #[test]
    fn text_input_commits_into_its_field() {
        let mut state = UiState::default();
        state.begin_input(InputTarget::UploadPath);
        if let Some(input) = state.input.as_mut() {
            input.buffer.push_str("  data/credit.csv ");
        }
        assert_eq!(state.commit_input(), Some(InputTarget::UploadPath));
        assert_eq!(state.upload_path, "data/credit.csv");
        assert!(state.input.is_none());
    }

    #[test]
    fn new_backend_error_replaces_the_status_message() {
        let mut state = UiState::default();
        state.info = "Loaded people.csv".into();
        let failed = PipelineState {
            error: Some("Failed to upload the file".into()),
            ..Default::default()
        };
        state.apply_snapshot(failed.clone());
        assert!(state.info.is_empty());

        // The same error republished keeps later messages.
        state.info = "step 'Results' is not reachable from 'Upload'".into();
        state.apply_snapshot(failed);
        assert_eq!(state.info, "step 'Results' is not reachable from 'Upload'");
    }
}
