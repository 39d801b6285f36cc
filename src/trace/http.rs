//! HTTP trace sink
//!
//! Posts records to a project-log insert endpoint:
//! `POST {base}/v1/project_logs/{project_id}/insert` with `{"events": [...]}`.
//! The path wants the project's id; a configured name is exchanged for one
//! once, at connect time, through `POST {base}/v1/project`.

use super::{TraceError, TraceProject, TraceRecord, TraceSink};
use crate::session::Message;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_TRACE_URL: &str = "https://api.braintrust.dev";

pub struct HttpTraceSink {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl HttpTraceSink {
    /// Build a sink for `project`, resolving a project name to its id.
    pub async fn connect(
        base_url: &str,
        project: &TraceProject,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, TraceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraceError::Transport(format!("Failed to create HTTP client: {e}")))?;
        let base_url = base_url.trim_end_matches('/');

        let project_id = match project {
            TraceProject::Id(id) => *id,
            TraceProject::Name(name) => {
                let id = resolve_project(&client, base_url, &api_key, name).await?;
                tracing::debug!(project = %name, project_id = %id, "Resolved trace project");
                id
            }
        };

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{base_url}/v1/project_logs/{project_id}/insert"),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct ProjectRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct ProjectResponse {
    id: Uuid,
}

/// Look up (or register) a project by name and return its id
async fn resolve_project(
    client: &Client,
    base_url: &str,
    api_key: &str,
    name: &str,
) -> Result<Uuid, TraceError> {
    let response = client
        .post(format!("{base_url}/v1/project"))
        .bearer_auth(api_key)
        .json(&ProjectRequest { name })
        .send()
        .await
        .map_err(|e| TraceError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TraceError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let project: ProjectResponse = response
        .json()
        .await
        .map_err(|e| TraceError::Transport(format!("Unreadable project lookup: {e}")))?;
    Ok(project.id)
}

#[derive(Serialize)]
struct InsertRequest<'a> {
    events: [InsertEvent<'a>; 1],
}

#[derive(Serialize)]
struct InsertEvent<'a> {
    id: String,
    input: &'a [Message],
    output: &'a [Message],
    metadata: &'a super::TraceMetadata,
    span_attributes: SpanAttributes<'a>,
    created: String,
}

#[derive(Serialize)]
struct SpanAttributes<'a> {
    name: &'a str,
    r#type: &'a str,
}

impl<'a> From<&'a TraceRecord> for InsertRequest<'a> {
    fn from(record: &'a TraceRecord) -> Self {
        Self {
            events: [InsertEvent {
                id: record.id.to_string(),
                input: &record.input,
                output: &record.output,
                metadata: &record.metadata,
                span_attributes: SpanAttributes {
                    name: &record.turn_name,
                    r#type: &record.turn_kind,
                },
                created: record.timestamp.to_rfc3339(),
            }],
        }
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn write(&self, record: &TraceRecord) -> Result<(), TraceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&InsertRequest::from(record))
            .send()
            .await
            .map_err(|e| TraceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TraceError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
