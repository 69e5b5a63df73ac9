use anyhow::{Context, Result};
use chat_session::{AgentReply, UploadError, UploadFile, Uploader};
use futures::future::BoxFuture;
use reqwest::multipart;
use tracing::debug;

use crate::config::ClientConfig;

/// Posts files as `multipart/form-data` to the agent's upload endpoint
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.upload_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(client, config.upload_url()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, file: UploadFile) -> BoxFuture<'static, Result<AgentReply, UploadError>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        Box::pin(async move { post_file(&client, &endpoint, file).await })
    }
}

async fn post_file(
    client: &reqwest::Client,
    endpoint: &str,
    file: UploadFile,
) -> Result<AgentReply, UploadError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| UploadError::Read {
            path: file.path.clone(),
            source,
        })?;

    let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
    debug!(file = %file.name, bytes = bytes.len(), %mime, %endpoint, "posting upload");

    let part = multipart::Part::bytes(bytes)
        .file_name(file.name.clone())
        .mime_str(mime.as_ref())
        .map_err(|e| UploadError::Transport(format!("invalid content type: {e}")))?;
    let form = multipart::Form::new().part("file", part);

    let response = client
        .post(endpoint)
        .multipart(form)
        .send()
        .await
        .map_err(|e| UploadError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UploadError::Status(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| UploadError::Transport(e.to_string()))?;
    AgentReply::parse(&body).map_err(|e| UploadError::Decode(e.to_string()))
}
