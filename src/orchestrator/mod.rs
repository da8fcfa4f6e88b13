//! Application-level orchestration.
//!
//! The controller owns the pipeline state; presentation layers send it
//! [`UiCommand`]s and render the [`WorkflowEvent`]s it emits. Commands are
//! applied one at a time, so two actions never overlap.

mod controller;

pub use controller::WorkflowController;

use crate::error::WorkflowError;
use crate::export::ExportedFile;
use crate::model::{PipelineState, PipelineStep, PreprocessOptions, TrainOptions, UploadFile};
use crate::transport::AnalyticsBackend;
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Upload(PathBuf),
    RefreshInfo,
    Preprocess(PreprocessOptions),
    GenerateEda,
    Train(TrainOptions),
    Download,
    SaveEdaImages,
    Navigate(PipelineStep),
    Quit,
}

#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    /// Snapshot after every state transition.
    State(Box<PipelineState>),
    Exported(Vec<ExportedFile>),
    /// Status line for the user; client-side rejections land here since
    /// they never touch the pipeline state.
    Info(String),
}

/// Apply UI commands to the controller until `Quit` or until every sender is gone.
pub(crate) async fn run_controller<B: AnalyticsBackend>(
    mut controller: WorkflowController<B>,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    controller.publish_state();

    while let Some(cmd) = cmd_rx.recv().await {
        let outcome: Result<Option<String>, WorkflowError> = match cmd {
            UiCommand::Upload(path) => match UploadFile::from_path(&path).await {
                Ok(file) => controller.upload(&file).await.map(|t| {
                    Some(format!(
                        "Loaded {} ({} rows × {} columns)",
                        file.name,
                        t.total_rows(),
                        t.column_count()
                    ))
                }),
                Err(e) => Err(e),
            },
            UiCommand::RefreshInfo => controller.refresh_data_info().await.map(|info| {
                Some(format!(
                    "{} numeric, {} categorical columns; {} missing values",
                    info.numeric_columns.len(),
                    info.categorical_columns.len(),
                    info.total_missing()
                ))
            }),
            UiCommand::Preprocess(opts) => controller
                .preprocess(&opts)
                .await
                .map(|p| Some(format!("Applied {} preprocessing steps", p.preprocessing_steps.len()))),
            UiCommand::GenerateEda => controller.generate_eda().await.map(|eda| {
                Some(if eda.is_empty() {
                    "The service returned no charts".to_string()
                } else {
                    format!("Generated {} charts", eda.charts().len())
                })
            }),
            UiCommand::Train(opts) => controller
                .train(&opts)
                .await
                .map(|r| Some(format!("Trained {}", r.model_type().label()))),
            UiCommand::Download => controller.download_results().await.map(|file| {
                let _ = event_tx.send(WorkflowEvent::Exported(vec![file]));
                None
            }),
            UiCommand::SaveEdaImages => controller.save_eda_images().map(|files| {
                if files.is_empty() {
                    return Some("The service returned no charts to save".to_string());
                }
                let _ = event_tx.send(WorkflowEvent::Exported(files));
                None
            }),
            UiCommand::Navigate(step) => controller.navigate(step).map(|()| None),
            UiCommand::Quit => break,
        };

        match outcome {
            Ok(Some(msg)) => {
                let _ = event_tx.send(WorkflowEvent::Info(msg));
            }
            Ok(None) => {}
            // Backend failures are already recorded in the published state.
            Err(e) if e.is_client_side() => {
                let _ = event_tx.send(WorkflowEvent::Info(e.to_string()));
            }
            Err(WorkflowError::Export(msg)) => {
                controller.publish_state();
                let _ = event_tx.send(WorkflowEvent::Info(msg));
            }
            Err(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ResultExport;
    use crate::model::{DataInfo, EdaArtifact, ModelResult, ProcessedArtifact, TabularArtifact};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct OfflineBackend;

    fn offline<T>() -> Result<T, WorkflowError> {
        Err(WorkflowError::Transport {
            status: None,
            message: "connection refused".into(),
        })
    }

    #[async_trait]
    impl AnalyticsBackend for OfflineBackend {
        async fn upload(&self, _: &UploadFile) -> Result<TabularArtifact, WorkflowError> {
            offline()
        }
        async fn data_info(&self) -> Result<DataInfo, WorkflowError> {
            offline()
        }
        async fn preprocess(&self, _: &PreprocessOptions) -> Result<ProcessedArtifact, WorkflowError> {
            offline()
        }
        async fn generate_eda(&self) -> Result<EdaArtifact, WorkflowError> {
            offline()
        }
        async fn train(&self, _: &TrainOptions) -> Result<ModelResult, WorkflowError> {
            offline()
        }
        async fn download_results(&self) -> Result<String, WorkflowError> {
            offline()
        }
    }

    #[tokio::test]
    async fn commands_are_applied_in_order_and_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv = dir.path().join("data.csv");
        std::fs::write(&csv, "a,b\n1,2\n").expect("write csv");

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let controller = WorkflowController::new(
            OfflineBackend,
            Duration::from_secs(1),
            ResultExport::new(dir.path()),
        )
        .with_events(event_tx.clone());

        cmd_tx.send(UiCommand::Navigate(PipelineStep::Results)).expect("send");
        cmd_tx.send(UiCommand::Upload(csv)).expect("send");
        cmd_tx.send(UiCommand::Quit).expect("send");
        run_controller(controller, event_tx, cmd_rx)
            .await
            .expect("loop");

        let mut infos = Vec::new();
        let mut last_state = None;
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                WorkflowEvent::Info(msg) => infos.push(msg),
                WorkflowEvent::State(s) => last_state = Some(s),
                WorkflowEvent::Exported(_) => {}
            }
        }

        assert_eq!(infos, vec!["step 'Results' is not reachable from 'Upload'"]);
        let st = last_state.expect("state published");
        assert_eq!(st.error.as_deref(), Some("connection refused"));
        assert_eq!(st.active_step, PipelineStep::Upload);
        assert!(!st.loading);
    }
}
