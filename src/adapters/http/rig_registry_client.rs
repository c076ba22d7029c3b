//! HTTP implementation of [`RigRegistry`] against the external town/rig
//! registry service. Same timeout/error-collapsing shape as
//! [`super::container_client::HttpContainerClient`].

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::domain::errors::TownResult;
use crate::domain::ports::{Rig, RigRegistry};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpRigRegistryClient {
    client: Client,
    base_url: String,
}

impl HttpRigRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build().expect("reqwest client builder");
        Self { client, base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl RigRegistry for HttpRigRegistryClient {
    async fn list_rigs(&self, town_id: &str) -> TownResult<Vec<Rig>> {
        let resp = self
            .client
            .get(self.url(&format!("/towns/{town_id}/rigs")))
            .send()
            .await
            .map_err(|e| crate::domain::errors::TownError::Upstream(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(crate::domain::errors::TownError::Upstream(format!("registry returned {}", resp.status())));
        }
        resp.json().await.map_err(|e| crate::domain::errors::TownError::Upstream(e.to_string()))
    }

    async fn get_rig(&self, town_id: &str, rig_id: &str) -> TownResult<Option<Rig>> {
        let resp = self
            .client
            .get(self.url(&format!("/towns/{town_id}/rigs/{rig_id}")))
            .send()
            .await
            .map_err(|e| crate::domain::errors::TownError::Upstream(e.to_string()))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(crate::domain::errors::TownError::Upstream(format!("registry returned {}", resp.status())));
        }
        Ok(Some(resp.json().await.map_err(|e| crate::domain::errors::TownError::Upstream(e.to_string()))?))
    }
}
