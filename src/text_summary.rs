//! Text summary builder for headless output.

use crate::export::ExportedFile;
use crate::model::{ModelFamily, PipelineState, TabularArtifact};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn describe_table(label: &str, table: &TabularArtifact) -> String {
    let (_, cols) = table.shape();
    if table.is_preview() {
        format!(
            "{label}: {} rows × {cols} columns (showing first {})",
            table.total_rows(),
            table.row_count()
        )
    } else {
        format!("{label}: {} rows × {cols} columns", table.row_count())
    }
}

/// Summarize whatever the pipeline produced, step by step.
pub(crate) fn build_text_summary(state: &PipelineState, exported: &[ExportedFile]) -> TextSummary {
    let mut lines = Vec::new();

    if let Some(original) = state.original.as_ref() {
        lines.push(describe_table("Dataset", original));
        lines.push(format!("Columns: {}", original.columns().join(", ")));
    }
    if let Some(info) = state.data_info.as_ref() {
        lines.push(format!(
            "Numeric: {} | Categorical: {} | Missing values: {}",
            info.numeric_columns.len(),
            info.categorical_columns.len(),
            info.total_missing()
        ));
    }

    if let Some(processed) = state.processed.as_ref() {
        lines.push(describe_table("Processed", &processed.table));
        for (i, step) in processed.preprocessing_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", i + 1));
        }
    }

    if let Some(eda) = state.eda.as_ref() {
        let charts: Vec<&str> = eda.charts().into_iter().map(|(c, _)| c.title()).collect();
        if charts.is_empty() {
            lines.push("Charts: none generated".to_string());
        } else {
            lines.push(format!("Charts: {}", charts.join(", ")));
        }
    }

    if let Some(result) = state.results.as_ref() {
        lines.push(format!(
            "Model: {} | target {} | features {}",
            result.model_type().label(),
            result.target,
            result.features.join(", ")
        ));
        let metrics: Vec<String> = result
            .metrics()
            .into_iter()
            .map(|(k, v)| format!("{} {v:.4}", k.to_uppercase()))
            .collect();
        lines.push(format!("Metrics: {}", metrics.join("  ")));
        if !result.folds.is_empty() {
            lines.push(format!("Cross-validation folds: {}", result.folds.len()));
        }
        match &result.family {
            ModelFamily::Regression {
                intercept,
                coefficients,
                ..
            } => {
                if let Some(b) = intercept {
                    lines.push(format!("Intercept: {b:.4}"));
                }
                for (name, coef) in coefficients {
                    lines.push(format!("  {name}: {coef:+.4}"));
                }
            }
            ModelFamily::Classification { classes, .. } => {
                let classes: Vec<String> = classes.iter().map(ToString::to_string).collect();
                lines.push(format!("Classes: {}", classes.join(", ")));
            }
            ModelFamily::RandomForest { .. } => {
                lines.push("Feature importance:".to_string());
                for (name, weight) in result.ranked_importance() {
                    lines.push(format!("  {name:<20} {:>5.1}%", weight * 100.0));
                }
            }
        }
        if let Some(next) = result.next_prediction {
            lines.push(format!("Next prediction: {next:.4}"));
        }
        if let Some(file) = result.model_filename.as_deref() {
            lines.push(format!("Model saved by the service as {file}"));
        }
    }

    for file in exported {
        lines.push(format!("Saved: {} ({} bytes)", file.path.display(), file.bytes));
    }

    if let Some(err) = state.error.as_deref() {
        lines.push(format!("Error: {err}"));
    }

    TextSummary { lines }
}
