use crate::export::{ExportedFile, ResultExport};
use crate::logging::{self, LogTarget};
use crate::model::{
    ClientConfig, FillMethod, ModelResult, ModelType, PreprocessOptions, TrainOptions, UploadFile,
};
use crate::orchestrator::WorkflowController;
use crate::transport::{AnalyticsBackend, HttpBackend};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

fn parse_fill_method(s: &str) -> Result<FillMethod, String> {
    match s.to_ascii_lowercase().as_str() {
        "mean" => Ok(FillMethod::Mean),
        "median" => Ok(FillMethod::Median),
        "mode" => Ok(FillMethod::Mode),
        "value" => Ok(FillMethod::FixedValue),
        "drop" => Ok(FillMethod::DropRows),
        other => Err(format!(
            "unknown fill method '{other}' (expected mean, median, mode, value or drop)"
        )),
    }
}

fn parse_model_type(s: &str) -> Result<ModelType, String> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "regression" => Ok(ModelType::Regression),
        "classification" => Ok(ModelType::Classification),
        "random_forest" => Ok(ModelType::RandomForest),
        other => Err(format!(
            "unknown model '{other}' (expected regression, classification or random_forest)"
        )),
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "tabular-wizard",
    version,
    about = "Upload, preprocess, explore and model a CSV dataset against an analytics service"
)]
pub struct Cli {
    /// Base URL of the analytics service
    #[arg(long, env = "ANALYTICS_API_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Give up on a request after this long
    #[arg(long, default_value = "60s")]
    pub request_timeout: humantime::Duration,

    /// Directory for the downloaded results and saved charts
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// CSV file to upload. Required with --json / --text; preloaded in the TUI
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Columns to drop before preprocessing (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Missing value strategy: mean, median, mode, value or drop
    #[arg(long, default_value = "mean", value_parser = parse_fill_method)]
    pub fill_method: FillMethod,

    /// Fill value used with --fill-method value
    #[arg(long)]
    pub fill_value: Option<f64>,

    /// Use --normalize true or --normalize false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub normalize: bool,

    /// Remove outliers using the IQR rule
    #[arg(long)]
    pub remove_outliers: bool,

    /// IQR multiplier for outlier removal
    #[arg(long, default_value_t = 1.5)]
    pub outlier_threshold: f64,

    /// Generate the exploratory charts
    #[arg(long)]
    pub eda: bool,

    /// Save generated charts as PNG files in --export-dir
    #[arg(long, requires = "eda")]
    pub save_charts: bool,

    /// Model family: regression, classification or random_forest
    #[arg(long, default_value = "regression", value_parser = parse_model_type)]
    pub model: ModelType,

    /// Target column; training is skipped without it
    #[arg(long)]
    pub target: Option<String>,

    /// Feature columns (comma separated)
    #[arg(long, value_delimiter = ',', requires = "target")]
    pub features: Vec<String>,

    /// Download the processed data as CSV into --export-dir
    #[arg(long)]
    pub download: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, OutputMode::Text).await;
        }
    }

    let mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    run_headless(args, mode).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("tabular-wizard/{}", env!("CARGO_PKG_VERSION")),
        export_dir: args.export_dir.clone(),
    }
}

/// Preprocessing options from the command line.
pub fn preprocess_options(args: &Cli) -> PreprocessOptions {
    PreprocessOptions {
        drop_columns: args
            .drop_columns
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        fill_method: args.fill_method,
        fill_value: args.fill_value,
        normalize: args.normalize,
        remove_outliers: args.remove_outliers,
        outlier_threshold: args.outlier_threshold,
    }
}

/// Training options, when a target was given.
pub fn train_options(args: &Cli) -> Option<TrainOptions> {
    let target = args.target.as_deref()?.trim().to_string();
    Some(TrainOptions {
        model_type: args.model,
        target,
        features: args
            .features
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
}

#[derive(Serialize)]
struct HeadlessReport<'a> {
    columns: &'a [String],
    total_rows: usize,
    processed_shape: Option<(usize, usize)>,
    preprocessing_steps: &'a [String],
    charts: Vec<&'static str>,
    results: Option<&'a ModelResult>,
    exported: &'a [ExportedFile],
}

async fn run_headless(args: Cli, mode: OutputMode) -> Result<()> {
    logging::init(LogTarget::Stderr)?;
    let cfg = build_config(&args);
    let file = args
        .file
        .clone()
        .ok_or_else(|| anyhow!("--file is required with --text or --json"))?;

    let preprocess = preprocess_options(&args);
    preprocess.validate().context("invalid preprocessing options")?;
    let train = train_options(&args);
    if let Some(t) = train.as_ref() {
        t.validate().context("invalid training options")?;
    }

    let backend = HttpBackend::new(&cfg)?;
    tracing::info!(service = backend.base_url(), file = %file.display(), "starting headless run");
    let mut controller = WorkflowController::new(
        backend,
        cfg.request_timeout,
        ResultExport::new(&cfg.export_dir),
    );
    let (out_tx, out_handle) = spawn_output_writer();

    let steps = HeadlessSteps {
        file: &file,
        preprocess: &preprocess,
        train: train.as_ref(),
        eda: args.eda,
        save_charts: args.save_charts,
        download: args.download,
    };
    let outcome = tokio::select! {
        r = drive(&mut controller, &steps, &out_tx) => r,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    };
    let exported = outcome?;

    let state = controller.state();
    match mode {
        OutputMode::Json => {
            let report = HeadlessReport {
                columns: state
                    .original
                    .as_ref()
                    .map(|t| t.columns())
                    .unwrap_or_default(),
                total_rows: state.original.as_ref().map_or(0, |t| t.total_rows()),
                processed_shape: state.processed.as_ref().map(|p| p.table.shape()),
                preprocessing_steps: state
                    .processed
                    .as_ref()
                    .map(|p| p.preprocessing_steps.as_slice())
                    .unwrap_or_default(),
                charts: state.eda.as_ref().map_or_else(Vec::new, |e| {
                    e.charts().into_iter().map(|(c, _)| c.file_stem()).collect()
                }),
                results: state.results.as_ref(),
                exported: &exported,
            };
            let out = serde_json::to_string_pretty(&report)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        }
        OutputMode::Text => {
            let summary = crate::text_summary::build_text_summary(state, &exported);
            for line in summary.lines {
                let _ = out_tx.send(OutputLine::Stdout(line));
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

struct HeadlessSteps<'a> {
    file: &'a Path,
    preprocess: &'a PreprocessOptions,
    train: Option<&'a TrainOptions>,
    eda: bool,
    save_charts: bool,
    download: bool,
}

/// Run the wizard steps in order, stopping at the first failure.
async fn drive<B: AnalyticsBackend>(
    controller: &mut WorkflowController<B>,
    steps: &HeadlessSteps<'_>,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<Vec<ExportedFile>> {
    let progress = |msg: String| {
        let _ = out.send(OutputLine::Stderr(msg));
    };
    let mut exported = Vec::new();

    let upload = UploadFile::from_path(steps.file).await?;
    let table = controller
        .upload(&upload)
        .await
        .with_context(|| format!("failed to upload {}", steps.file.display()))?;
    progress(format!(
        "Uploaded {} ({} rows × {} columns)",
        upload.name,
        table.total_rows(),
        table.column_count()
    ));

    if let Err(e) = controller.refresh_data_info().await {
        tracing::warn!(error = %e, "dataset information unavailable");
    }

    let processed = controller
        .preprocess(steps.preprocess)
        .await
        .context("preprocessing failed")?;
    progress(format!(
        "Preprocessed: {} steps applied",
        processed.preprocessing_steps.len()
    ));

    if steps.eda {
        let charts = controller
            .generate_eda()
            .await
            .context("chart generation failed")?
            .charts()
            .len();
        progress(format!("Generated {charts} charts"));
        if steps.save_charts {
            exported.extend(controller.save_eda_images().context("saving charts failed")?);
        }
    }

    if let Some(train) = steps.train {
        let result = controller.train(train).await.context("training failed")?;
        progress(format!("Trained {}", result.model_type().label()));
    }

    if steps.download {
        exported.push(
            controller
                .download_results()
                .await
                .context("download failed")?,
        );
    }

    Ok(exported)
}
