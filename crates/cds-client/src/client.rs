//! Climate Data Store retrieval over the legacy task API.
//!
//! A retrieval is a three-step exchange:
//!
//! 1. `POST {url}/resources/{dataset}` with the request body; the reply is a
//!    task with a `state` and `request_id`.
//! 2. While the task is `queued` or `running`, poll `GET {url}/tasks/{id}`.
//! 3. Once `completed`, stream the file at `location` to disk.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use metrics::counter;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::FetchSettings;
use crate::credentials::Credentials;
use crate::error::{CdsError, Result};
use crate::request::RetrieveRequest;

/// Something that can turn a retrieval request into a local file.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve `request` from `dataset` into `target`, returning the number
    /// of bytes written. `target` is only complete if this returns `Ok`.
    async fn retrieve(&self, dataset: &str, request: &RetrieveRequest, target: &Path)
        -> Result<u64>;
}

/// Task status as reported by the archive.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskReply {
    pub state: String,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: String,
}

impl TaskError {
    fn describe(&self) -> String {
        match (self.message.is_empty(), self.reason.is_empty()) {
            (false, false) => format!("{} ({})", self.message, self.reason),
            (false, true) => self.message.clone(),
            (true, false) => self.reason.clone(),
            (true, true) => "no reason given".to_string(),
        }
    }
}

/// HTTP client for the archive.
pub struct CdsClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    poll_interval: Duration,
    max_wait: Duration,
}

impl CdsClient {
    /// Build a client. `settings.api_url` takes precedence over the URL in
    /// the credentials file.
    pub fn new(credentials: Credentials, settings: &FetchSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        let base_url = settings
            .api_url
            .clone()
            .unwrap_or_else(|| credentials.url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            base_url,
            credentials,
            poll_interval: settings.poll_interval(),
            max_wait: settings.max_wait(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn submit(&self, dataset: &str, request: &RetrieveRequest) -> Result<TaskReply> {
        let url = format!("{}/resources/{}", self.base_url, dataset);
        let response = self
            .http
            .post(&url)
            .basic_auth(self.credentials.uid(), Some(self.credentials.api_key()))
            .json(request)
            .send()
            .await?;
        read_reply(response).await
    }

    async fn poll(&self, request_id: &str) -> Result<TaskReply> {
        let url = format!("{}/tasks/{}", self.base_url, request_id);
        let response = self
            .http
            .get(&url)
            .basic_auth(self.credentials.uid(), Some(self.credentials.api_key()))
            .send()
            .await?;
        read_reply(response).await
    }

    /// Follow a task until it completes and return the completed reply.
    async fn wait_for_completion(&self, mut reply: TaskReply) -> Result<TaskReply> {
        let started = Instant::now();
        loop {
            match reply.state.as_str() {
                "completed" => return Ok(reply),
                "failed" => {
                    let reason = reply.error.unwrap_or_default().describe();
                    return Err(CdsError::RequestFailed(reason));
                }
                "queued" | "running" => {}
                other => {
                    return Err(CdsError::RequestFailed(format!(
                        "unknown task state '{}'",
                        other
                    )))
                }
            }

            let request_id = reply.request_id.clone().ok_or_else(|| {
                CdsError::RequestFailed(format!("task is {} but has no request_id", reply.state))
            })?;

            if started.elapsed() >= self.max_wait {
                return Err(CdsError::Timeout {
                    request_id,
                    state: reply.state,
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            debug!(request_id = %request_id, state = %reply.state, "Waiting for CDS task");
            tokio::time::sleep(self.poll_interval).await;
            reply = self.poll(&request_id).await?;
        }
    }

    /// Stream the result file to `target`.
    async fn download(&self, reply: &TaskReply, target: &Path) -> Result<u64> {
        let location = reply.location.as_deref().ok_or_else(|| {
            CdsError::RequestFailed("task completed without a download location".into())
        })?;
        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join(location))
            .map_err(|e| CdsError::RequestFailed(format!("bad location '{}': {}", location, e)))?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CdsError::Service {
                status: status.as_u16(),
                message: format!("download of {} failed", location),
            });
        }

        let mut file = tokio::fs::File::create(target).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        if let Some(expected) = reply.content_length {
            if expected != written {
                return Err(CdsError::RequestFailed(format!(
                    "download size mismatch: expected {} bytes, got {}",
                    expected, written
                )));
            }
        }
        Ok(written)
    }
}

#[async_trait]
impl Retriever for CdsClient {
    #[instrument(skip(self, request, target), fields(variables = request.variable.len()))]
    async fn retrieve(
        &self,
        dataset: &str,
        request: &RetrieveRequest,
        target: &Path,
    ) -> Result<u64> {
        let result: Result<u64> = async {
            let reply = self.submit(dataset, request).await?;
            let reply = self.wait_for_completion(reply).await?;
            self.download(&reply, target).await
        }
        .await;

        match &result {
            Ok(bytes) => {
                counter!("cds_requests_total", "result" => "success").increment(1);
                info!(bytes, target = %target.display(), "CDS retrieval complete");
            }
            Err(e) => {
                counter!("cds_requests_total", "result" => "error").increment(1);
                warn!(error = %e, "CDS retrieval failed");
            }
        }
        result
    }
}

/// Decode a task reply, turning error statuses into [`CdsError::Service`].
async fn read_reply(response: Response) -> Result<TaskReply> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<TaskReply>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<TaskError>(&body)
        .map(|e| e.describe())
        .unwrap_or(body);
    Err(CdsError::Service {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_reply_decoding() {
        let reply: TaskReply = serde_json::from_str(
            r#"{"state":"completed","request_id":"abc","location":"https://x/abc.nc","content_length":42}"#,
        )
        .unwrap();
        assert_eq!(reply.state, "completed");
        assert_eq!(reply.content_length, Some(42));

        let failed: TaskReply = serde_json::from_str(
            r#"{"state":"failed","error":{"message":"Request too large","reason":"cost limits exceeded"}}"#,
        )
        .unwrap();
        assert_eq!(
            failed.error.unwrap().describe(),
            "Request too large (cost limits exceeded)"
        );
    }

    #[test]
    fn test_base_url_override() {
        let creds = Credentials::new("https://cds.example/api/v2/", "1", "k");
        let client = CdsClient::new(creds.clone(), &FetchSettings::default()).unwrap();
        assert_eq!(client.base_url(), "https://cds.example/api/v2");

        let settings = FetchSettings {
            api_url: Some("http://127.0.0.1:1/api".into()),
            ..FetchSettings::default()
        };
        let client = CdsClient::new(creds, &settings).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:1/api");
    }
}
