//! DF-021: DigitalOcean droplet client.
//!
//! Blocking `ureq` calls with bearer-token auth against a configurable base
//! URL. Responses wrap the droplet in a `{"droplet": {...}}` envelope.

use super::ComputeApi;
use crate::core::error::{DropformError, Result};
use crate::core::types::{Droplet, DropletSpec, ResolvedToken};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct DropletEnvelope {
    droplet: Droplet,
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct DigitalOceanClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DigitalOceanClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(concat!("dropform/", env!("CARGO_PKG_VERSION")))
                .build(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn droplet_from(response: ureq::Response) -> Result<Droplet> {
        let envelope: DropletEnvelope = response
            .into_json()
            .map_err(|e| DropformError::transport(format!("invalid droplet response: {}", e)))?;
        Ok(envelope.droplet)
    }
}

/// Convert a ureq error into a `RemoteApi` error, reading the API's message
/// from the body when there is one.
fn api_error(err: ureq::Error) -> DropformError {
    match err {
        ureq::Error::Status(code, response) => {
            let message = response
                .into_json::<ApiErrorBody>()
                .ok()
                .and_then(|b| match (b.id, b.message) {
                    (Some(id), Some(msg)) => Some(format!("{}: {}", id, msg)),
                    (None, Some(msg)) => Some(msg),
                    (Some(id), None) => Some(id),
                    (None, None) => None,
                })
                .unwrap_or_else(|| "request failed".to_string());
            DropformError::RemoteApi {
                status: Some(code),
                message,
            }
        }
        ureq::Error::Transport(t) => DropformError::transport(t.to_string()),
    }
}

impl ComputeApi for DigitalOceanClient {
    fn create_droplet(&self, token: &ResolvedToken, spec: &DropletSpec) -> Result<Droplet> {
        let url = self.url("/droplets");
        debug!(%url, name = %spec.name, "POST");
        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", token.expose()))
            .send_json(spec)
            .map_err(api_error)?;
        Self::droplet_from(response)
    }

    fn get_droplet(&self, token: &ResolvedToken, id: u64) -> Result<Droplet> {
        let url = self.url(&format!("/droplets/{}", id));
        debug!(%url, "GET");
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token.expose()))
            .call()
            .map_err(api_error)?;
        Self::droplet_from(response)
    }

    fn delete_droplet(&self, token: &ResolvedToken, id: u64) -> Result<u16> {
        let url = self.url(&format!("/droplets/{}", id));
        debug!(%url, "DELETE");
        match self
            .agent
            .delete(&url)
            .set("Authorization", &format!("Bearer {}", token.expose()))
            .call()
        {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(ureq::Error::Transport(t)) => Err(DropformError::transport(t.to_string())),
        }
    }
}
