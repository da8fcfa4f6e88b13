mod http;
pub(crate) mod wire;

pub use http::HttpBackend;

use crate::error::WorkflowError;
use crate::model::{
    DataInfo, EdaArtifact, ModelResult, PreprocessOptions, ProcessedArtifact, TabularArtifact,
    TrainOptions, UploadFile,
};
use async_trait::async_trait;

/// Request/response contract of the analytics service.
///
/// Each call is a single best-effort request. Failures come back normalized
/// as [`WorkflowError::Transport`] or [`WorkflowError::Decode`].
#[async_trait]
pub trait AnalyticsBackend: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<TabularArtifact, WorkflowError>;

    async fn data_info(&self) -> Result<DataInfo, WorkflowError>;

    async fn preprocess(
        &self,
        options: &PreprocessOptions,
    ) -> Result<ProcessedArtifact, WorkflowError>;

    /// Charts for the dataset currently held by the service.
    async fn generate_eda(&self) -> Result<EdaArtifact, WorkflowError>;

    async fn train(&self, options: &TrainOptions) -> Result<ModelResult, WorkflowError>;

    /// CSV payload of the processed data.
    async fn download_results(&self) -> Result<String, WorkflowError>;
}
