use super::wire::{
    error_detail, DownloadDto, EdaDto, PredictDto, PredictRequest, PreprocessRequest, PreviewDto,
};
use super::AnalyticsBackend;
use crate::error::WorkflowError;
use crate::model::{
    ClientConfig, DataInfo, EdaArtifact, ModelResult, PreprocessOptions, ProcessedArtifact,
    TabularArtifact, TrainOptions, UploadFile,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

const CSV_MIME: &str = "text/csv";

#[derive(Clone, Copy)]
enum Operation {
    Upload,
    DataInfo,
    Preprocess,
    Eda,
    Train,
    Download,
}

impl Operation {
    fn path(self) -> &'static str {
        match self {
            Operation::Upload => "/upload-csv/",
            Operation::DataInfo => "/data-info/",
            Operation::Preprocess => "/preprocess/",
            Operation::Eda => "/generate-eda/",
            Operation::Train => "/predict/",
            Operation::Download => "/download-results/",
        }
    }

    /// Shown when the service gives no usable `detail`.
    fn generic_message(self) -> &'static str {
        match self {
            Operation::Upload => "Failed to upload the file",
            Operation::DataInfo => "Failed to load dataset information",
            Operation::Preprocess => "Failed to preprocess the data",
            Operation::Eda => "Failed to generate the exploratory charts",
            Operation::Train => "Failed to train the model",
            Operation::Download => "Failed to download the results",
        }
    }
}

/// [`AnalyticsBackend`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let base = reqwest::Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid analytics service URL '{}'", cfg.base_url))?;
        let http = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, op: Operation) -> String {
        format!("{}{}", self.base_url, op.path())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        op: Operation,
        req: RequestBuilder,
    ) -> Result<T, WorkflowError> {
        tracing::debug!(path = op.path(), "sending request");
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(path = op.path(), error = %e, "request failed");
            WorkflowError::Transport {
                status: None,
                message: op.generic_message().to_string(),
            }
        })?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| {
            tracing::warn!(path = op.path(), error = %e, "failed to read response body");
            WorkflowError::Transport {
                status: Some(status.as_u16()),
                message: op.generic_message().to_string(),
            }
        })?;

        if !status.is_success() {
            let message =
                error_detail(&body).unwrap_or_else(|| op.generic_message().to_string());
            tracing::warn!(path = op.path(), status = status.as_u16(), %message, "service returned an error");
            return Err(WorkflowError::Transport {
                status: Some(status.as_u16()),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(path = op.path(), error = %e, "malformed response body");
            WorkflowError::Decode(format!("{}: {e}", op.path()))
        })
    }
}

#[async_trait]
impl AnalyticsBackend for HttpBackend {
    async fn upload(&self, file: &UploadFile) -> Result<TabularArtifact, WorkflowError> {
        file.validate()?;
        let part = Part::bytes(file.content.to_vec())
            .file_name(file.name.clone())
            .mime_str(CSV_MIME)
            .map_err(|e| WorkflowError::validation(format!("invalid media type: {e}")))?;
        let form = Form::new().part("file", part);
        let req = self.http.post(self.url(Operation::Upload)).multipart(form);
        let dto: PreviewDto = self.call(Operation::Upload, req).await?;
        dto.into_table()
    }

    async fn data_info(&self) -> Result<DataInfo, WorkflowError> {
        let req = self.http.get(self.url(Operation::DataInfo));
        self.call(Operation::DataInfo, req).await
    }

    async fn preprocess(
        &self,
        options: &PreprocessOptions,
    ) -> Result<ProcessedArtifact, WorkflowError> {
        options.validate()?;
        let req = self
            .http
            .post(self.url(Operation::Preprocess))
            .json(&PreprocessRequest::from(options));
        let dto: PreviewDto = self.call(Operation::Preprocess, req).await?;
        dto.into_processed()
    }

    async fn generate_eda(&self) -> Result<EdaArtifact, WorkflowError> {
        let req = self.http.get(self.url(Operation::Eda));
        let dto: EdaDto = self.call(Operation::Eda, req).await?;
        dto.into_artifact()
    }

    async fn train(&self, options: &TrainOptions) -> Result<ModelResult, WorkflowError> {
        options.validate()?;
        let req = self
            .http
            .post(self.url(Operation::Train))
            .json(&PredictRequest::from(options));
        let dto: PredictDto = self.call(Operation::Train, req).await?;
        dto.into_result()
    }

    async fn download_results(&self) -> Result<String, WorkflowError> {
        let req = self.http.get(self.url(Operation::Download));
        let dto: DownloadDto = self.call(Operation::Download, req).await?;
        Ok(dto.csv_content)
    }
}
