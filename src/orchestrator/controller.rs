//! Workflow controller.
//!
//! Sole owner and writer of [`PipelineState`]. Each action validates its
//! input, marks the state as loading, calls the backend under the configured
//! timeout and then either stores the new artifact and advances the active
//! step, or records the error and leaves everything else untouched.

use super::WorkflowEvent;
use crate::error::WorkflowError;
use crate::export::{ExportedFile, ResultExport};
use crate::gate;
use crate::model::{
    DataInfo, EdaArtifact, ModelResult, PipelineState, PipelineStep, PreprocessOptions,
    ProcessedArtifact, TabularArtifact, TrainOptions, UploadFile,
};
use crate::transport::AnalyticsBackend;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Scoped loading flag. Acquiring sets `loading` and clears the previous
/// error; dropping clears `loading` on every exit path. Both transitions
/// are published when an event channel is attached.
struct LoadingGuard<'a> {
    state: &'a mut PipelineState,
    events: Option<&'a UnboundedSender<WorkflowEvent>>,
}

impl<'a> LoadingGuard<'a> {
    fn acquire(
        state: &'a mut PipelineState,
        events: Option<&'a UnboundedSender<WorkflowEvent>>,
    ) -> Self {
        state.loading = true;
        state.error = None;
        publish(events, state);
        Self { state, events }
    }

    fn fail(&mut self, action: &str, err: &WorkflowError) {
        tracing::warn!(action, error = %err, "action failed");
        self.state.error = Some(err.to_string());
    }
}

impl Deref for LoadingGuard<'_> {
    type Target = PipelineState;

    fn deref(&self) -> &PipelineState {
        &*self.state
    }
}

impl DerefMut for LoadingGuard<'_> {
    fn deref_mut(&mut self) -> &mut PipelineState {
        &mut *self.state
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
        publish(self.events, &*self.state);
    }
}

fn publish(events: Option<&UnboundedSender<WorkflowEvent>>, state: &PipelineState) {
    if let Some(tx) = events {
        let _ = tx.send(WorkflowEvent::State(Box::new(state.clone())));
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, WorkflowError>>,
) -> Result<T, WorkflowError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| WorkflowError::Timeout(limit))?
}

pub struct WorkflowController<B> {
    backend: B,
    state: PipelineState,
    request_timeout: Duration,
    export: ResultExport,
    events: Option<UnboundedSender<WorkflowEvent>>,
}

impl<B: AnalyticsBackend> WorkflowController<B> {
    pub fn new(backend: B, request_timeout: Duration, export: ResultExport) -> Self {
        Self {
            backend,
            state: PipelineState::default(),
            request_timeout,
            export,
            events: None,
        }
    }

    /// Publish a state snapshot on every loading transition.
    pub fn with_events(mut self, events: UnboundedSender<WorkflowEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn publish_state(&self) {
        publish(self.events.as_ref(), &self.state);
    }

    pub async fn upload(&mut self, file: &UploadFile) -> Result<&TabularArtifact, WorkflowError> {
        file.validate()?;
        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        match bounded(self.request_timeout, self.backend.upload(file)).await {
            Ok(table) => {
                tracing::info!(file = %file.name, shape = ?table.shape(), "dataset uploaded");
                st.dataset_revision = st.dataset_revision.next();
                st.original = Some(table);
                st.active_step = PipelineStep::View;
            }
            Err(e) => {
                st.fail("upload", &e);
                return Err(e);
            }
        }
        drop(st);
        self.state
            .original
            .as_ref()
            .ok_or_else(|| WorkflowError::Decode("upload produced no dataset".into()))
    }

    pub async fn preprocess(
        &mut self,
        options: &PreprocessOptions,
    ) -> Result<&ProcessedArtifact, WorkflowError> {
        if let Some(gap) = self.state.missing_prerequisite(PipelineStep::Preprocess) {
            return Err(gap.into());
        }
        options.validate()?;
        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        match bounded(self.request_timeout, self.backend.preprocess(options)).await {
            Ok(mut processed) => {
                processed.derived_from = st.dataset_revision;
                tracing::info!(
                    shape = ?processed.table.shape(),
                    steps = processed.preprocessing_steps.len(),
                    "data preprocessed"
                );
                st.processed = Some(processed);
                st.active_step = PipelineStep::Preprocess;
            }
            Err(e) => {
                st.fail("preprocess", &e);
                return Err(e);
            }
        }
        drop(st);
        self.state
            .processed
            .as_ref()
            .ok_or_else(|| WorkflowError::Decode("preprocessing produced no dataset".into()))
    }

    /// Charts for the dataset currently held by the service. A new run
    /// replaces the previous charts entirely.
    pub async fn generate_eda(&mut self) -> Result<&EdaArtifact, WorkflowError> {
        if let Some(gap) = self.state.missing_prerequisite(PipelineStep::View) {
            return Err(gap.into());
        }
        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        match bounded(self.request_timeout, self.backend.generate_eda()).await {
            Ok(mut eda) => {
                eda.generated_against = st.dataset_revision;
                tracing::info!(charts = eda.charts().len(), "charts generated");
                st.eda = Some(eda);
                st.active_step = PipelineStep::Explore;
            }
            Err(e) => {
                st.fail("generate_eda", &e);
                return Err(e);
            }
        }
        drop(st);
        self.state
            .eda
            .as_ref()
            .ok_or_else(|| WorkflowError::Decode("no charts were produced".into()))
    }

    pub async fn train(&mut self, options: &TrainOptions) -> Result<&ModelResult, WorkflowError> {
        let Some(processed) = self.state.processed.as_ref() else {
            return Err(self
                .state
                .missing_prerequisite(PipelineStep::Train)
                .map_or_else(|| WorkflowError::validation("preprocess the data first"), Into::into));
        };
        options.validate()?;
        options.ensure_columns_in(&processed.table)?;

        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        match bounded(self.request_timeout, self.backend.train(options)).await {
            Ok(result) => {
                tracing::info!(model = ?result.model_type(), target = %result.target, "model trained");
                st.results = Some(result);
                st.active_step = PipelineStep::Results;
            }
            Err(e) => {
                st.fail("train", &e);
                return Err(e);
            }
        }
        drop(st);
        self.state
            .results
            .as_ref()
            .ok_or_else(|| WorkflowError::Decode("training produced no result".into()))
    }

    /// Fetch the processed CSV and write it to the export directory. The
    /// active step does not change.
    pub async fn download_results(&mut self) -> Result<ExportedFile, WorkflowError> {
        if let Some(gap) = self.state.missing_prerequisite(PipelineStep::Train) {
            return Err(gap.into());
        }
        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        let outcome = bounded(self.request_timeout, self.backend.download_results())
            .await
            .and_then(|csv| self.export.export(&csv));
        if let Err(e) = &outcome {
            st.fail("download_results", e);
        }
        outcome
    }

    /// Write the current charts next to the results export.
    pub fn save_eda_images(&mut self) -> Result<Vec<ExportedFile>, WorkflowError> {
        let Some(eda) = self.state.eda.as_ref() else {
            return Err(self
                .state
                .missing_prerequisite(PipelineStep::Explore)
                .map_or_else(|| WorkflowError::validation("generate the charts first"), Into::into));
        };
        self.export.export_eda_images(eda).inspect_err(|e| {
            self.state.error = Some(e.to_string());
        })
    }

    /// Column types and missing-value counts of the uploaded dataset.
    pub async fn refresh_data_info(&mut self) -> Result<&DataInfo, WorkflowError> {
        if let Some(gap) = self.state.missing_prerequisite(PipelineStep::View) {
            return Err(gap.into());
        }
        let mut st = LoadingGuard::acquire(&mut self.state, self.events.as_ref());
        match bounded(self.request_timeout, self.backend.data_info()).await {
            Ok(info) => st.data_info = Some(info),
            Err(e) => {
                st.fail("data_info", &e);
                return Err(e);
            }
        }
        drop(st);
        self.state
            .data_info
            .as_ref()
            .ok_or_else(|| WorkflowError::Decode("no dataset information".into()))
    }

    pub fn navigate(&mut self, step: PipelineStep) -> Result<(), WorkflowError> {
        if !gate::can_enter(self.state.active_step, step) {
            return Err(WorkflowError::StepLocked {
                requested: step,
                active: self.state.active_step,
            });
        }
        // Only a new action clears a recorded error.
        self.state.active_step = step;
        self.publish_state();
        Ok(())
    }
}
