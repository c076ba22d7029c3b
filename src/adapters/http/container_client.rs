//! HTTP implementation of [`ContainerRuntime`].
//!
//! Talks to the per-town container control server. Every call carries a
//! fixed timeout; transport failures and non-2xx responses both collapse
//! into a recoverable [`ContainerError`] so the scheduler can just retry on
//! its next tick rather than branch on failure kind.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::instrument;

use crate::domain::errors::ContainerError;
use crate::domain::ports::{
    AgentStatusResponse, ContainerResult, ContainerRuntime, SendMessageRequest, StartAgentRequest,
    StartMergeRequest, StopAgentOptions, StreamTicket,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpContainerClient {
    client: Client,
    base_url: String,
}

impl HttpContainerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build().expect("reqwest client builder");
        Self { client, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn check_status(resp: reqwest::Response) -> ContainerResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(ContainerError::Http { status, body })
    }

    fn map_transport(err: reqwest::Error) -> ContainerError {
        if err.is_timeout() {
            ContainerError::Timeout
        } else {
            ContainerError::Transport(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl ContainerRuntime for HttpContainerClient {
    #[instrument(skip(self, req), fields(agent_id = %req.agent_id))]
    async fn start_agent(&self, req: StartAgentRequest) -> ContainerResult<()> {
        let resp = self
            .client
            .post(self.url("/agents/start"))
            .json(&req)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn stop_agent(&self, agent_id: &str, opts: StopAgentOptions) -> ContainerResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/agents/{agent_id}/stop")))
            .json(&opts)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn send_message(&self, agent_id: &str, req: SendMessageRequest) -> ContainerResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/agents/{agent_id}/message")))
            .json(&req)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn agent_status(&self, agent_id: &str) -> ContainerResult<AgentStatusResponse> {
        let resp = self
            .client
            .get(self.url(&format!("/agents/{agent_id}/status")))
            .send()
            .await
            .map_err(Self::map_transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(AgentStatusResponse {
                status: crate::domain::ports::RuntimeAgentStatus::NotFound,
                exit_reason: None,
            });
        }
        let resp = Self::check_status(resp).await?;
        resp.json().await.map_err(Self::map_transport)
    }

    async fn stream_ticket(&self, agent_id: &str) -> ContainerResult<StreamTicket> {
        let resp = self
            .client
            .post(self.url(&format!("/agents/{agent_id}/stream-ticket")))
            .send()
            .await
            .map_err(Self::map_transport)?;
        let resp = Self::check_status(resp).await?;
        resp.json().await.map_err(Self::map_transport)
    }

    async fn start_merge(&self, req: StartMergeRequest) -> ContainerResult<()> {
        let resp = self
            .client
            .post(self.url("/merge"))
            .json(&req)
            .send()
            .await
            .map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }

    async fn health(&self) -> ContainerResult<()> {
        let resp = self.client.get(self.url("/health")).send().await.map_err(Self::map_transport)?;
        Self::check_status(resp).await?;
        Ok(())
    }
}
