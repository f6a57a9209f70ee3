use serde::de::DeserializeOwned;
use serde::Serialize;
use simcity_engine::EpisodeError;
use simcity_protocol::{
    ResetRequest, ResetResponse, SimulateRequest, SimulateResponse, StepRequest, StepResponse,
};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("{endpoint} request failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("{endpoint} returned no observation")]
    MissingObservation { endpoint: &'static str },
    #[error("simulate returned an unusable episode: {0}")]
    Episode(#[from] EpisodeError),
}

/// Thin JSON-over-HTTP client for the simulation server.
#[derive(Debug, Clone)]
pub struct GameClient {
    http: reqwest::Client,
    base_url: String,
}

impl GameClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn reset(&self) -> Result<ResetResponse, RpcError> {
        self.post("reset", &ResetRequest::default()).await
    }

    pub async fn step(&self, req: &StepRequest) -> Result<StepResponse, RpcError> {
        self.post("step", req).await
    }

    pub async fn simulate(&self) -> Result<SimulateResponse, RpcError> {
        self.post("simulate", &SimulateRequest::default()).await
    }

    async fn post<Req, Resp>(&self, endpoint: &'static str, body: &Req) -> Result<Resp, RpcError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!(%url, "rpc request");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| RpcError::Http { endpoint, source })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::Status { endpoint, status });
        }
        let out = resp
            .json::<Resp>()
            .await
            .map_err(|source| RpcError::Http { endpoint, source })?;
        tracing::debug!(%url, "rpc response");
        Ok(out)
    }
}
