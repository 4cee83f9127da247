//! ECS RPC client implementing [`CommandApi`].
//!
//! Every call is a signed `POST /?<params>` with an empty body against
//! the regional endpoint `https://ecs.<region>.aliyuncs.com`. Successful
//! responses are JSON objects; failures carry `Code`, `Message`, and
//! `RequestId`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleetcmd_core::{InstanceId, InvocationStatus, Session};
use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::*;
use crate::error::{ApiError, ApiResult};
use crate::signer::{self, RpcRequest};

/// ECS OpenAPI version these actions belong to.
pub const ECS_API_VERSION: &str = "2014-05-26";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default regional endpoint.
pub fn default_endpoint(region: &str) -> String {
    format!("https://ecs.{region}.aliyuncs.com")
}

/// Signed HTTP client for the ECS command actions.
#[derive(Debug, Clone)]
pub struct EcsClient {
    http: reqwest::Client,
    endpoint: Url,
    host: String,
    session: Arc<Session>,
}

impl EcsClient {
    /// Client for the session's regional endpoint.
    pub fn new(session: Arc<Session>) -> ApiResult<Self> {
        let endpoint = default_endpoint(&session.region);
        Self::with_endpoint(session, &endpoint)
    }

    /// Client for an explicit endpoint (VPC endpoints, tests).
    pub fn with_endpoint(session: Arc<Session>, endpoint: &str) -> ApiResult<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| ApiError::InvalidEndpoint(endpoint.to_string()))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ApiError::InvalidEndpoint(endpoint.to_string())),
        };

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("fleetcmd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            host,
            session,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: Vec<(String, String)>,
    ) -> ApiResult<T> {
        let signed = signer::sign(
            &self.session,
            &RpcRequest {
                method: "POST",
                host: &self.host,
                action,
                version: ECS_API_VERSION,
                params: &params,
                body: b"",
                date: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                nonce: uuid::Uuid::new_v4().to_string(),
            },
        )?;

        let mut url = self.endpoint.clone();
        url.set_path("/");
        url.set_query(Some(&signed.query));

        let mut req = self.http.post(url);
        for (name, value) in &signed.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%action, status = status.as_u16(), bytes = body.len(), "ecs call completed");

        if status.is_success() {
            serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
                action: action.to_string(),
                source,
            })
        } else {
            let err: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            Err(ApiError::Service {
                action: action.to_string(),
                status: status.as_u16(),
                code: err.code.unwrap_or_else(|| "Unknown".to_string()),
                message: err
                    .message
                    .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned()),
                request_id: err.request_id,
            })
        }
    }
}

impl CommandApi for EcsClient {
    fn describe_instances<'a>(
        &'a self,
        request: &'a DescribeInstancesRequest,
    ) -> ApiFuture<'a, Vec<InstanceId>> {
        Box::pin(async move {
            let resp: DescribeInstancesResponse = self
                .call("DescribeInstances", describe_instances_params(request))
                .await?;
            Ok(resp
                .instances
                .instance
                .into_iter()
                .map(|i| InstanceId::from(i.instance_id))
                .collect())
        })
    }

    fn run_command<'a>(&'a self, request: &'a RunCommandRequest) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let resp: RunCommandResponse =
                self.call("RunCommand", run_command_params(request)).await?;
            Ok(resp.invoke_id)
        })
    }

    fn describe_invocation_results<'a>(
        &'a self,
        request: &'a InvocationResultsRequest,
    ) -> ApiFuture<'a, Vec<InvocationRecord>> {
        Box::pin(async move {
            let resp: DescribeInvocationResultsResponse = self
                .call(
                    "DescribeInvocationResults",
                    invocation_results_params(request),
                )
                .await?;
            Ok(resp
                .invocation
                .invocation_results
                .invocation_result
                .into_iter()
                .map(|r| InvocationRecord {
                    instance_id: InstanceId::from(r.instance_id),
                    status: InvocationStatus::parse(&r.invoke_record_status),
                    exit_code: r.exit_code,
                    error_code: r.error_code.filter(|c| !c.is_empty()),
                })
                .collect())
        })
    }
}

// ── Request parameters ─────────────────────────────────────────

fn describe_instances_params(request: &DescribeInstancesRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("RegionId".to_string(), request.region.clone()),
        ("Status".to_string(), request.status.clone()),
        ("PageNumber".to_string(), request.page_number.to_string()),
        ("PageSize".to_string(), request.page_size.to_string()),
    ];
    if let Some(tags) = &request.tags {
        for (i, (key, value)) in tags.iter().enumerate() {
            let n = i + 1;
            params.push((format!("Tag.{n}.Key"), key.to_string()));
            params.push((format!("Tag.{n}.Value"), value.to_string()));
        }
    }
    params
}

fn run_command_params(request: &RunCommandRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("RegionId".to_string(), request.region.clone()),
        ("Type".to_string(), request.command_type.to_string()),
        ("CommandContent".to_string(), request.content.clone()),
        ("Timeout".to_string(), request.timeout_secs.to_string()),
        ("RepeatMode".to_string(), request.repeat_mode.to_string()),
        ("KeepCommand".to_string(), request.keep_command.to_string()),
        ("ContentEncoding".to_string(), request.content_encoding.to_string()),
    ];
    for (i, id) in request.instance_ids.iter().enumerate() {
        params.push((format!("InstanceId.{}", i + 1), id.to_string()));
    }
    params
}

fn invocation_results_params(request: &InvocationResultsRequest) -> Vec<(String, String)> {
    vec![
        ("RegionId".to_string(), request.region.clone()),
        ("InvokeId".to_string(), request.invoke_id.clone()),
        ("PageSize".to_string(), request.page_size.to_string()),
    ]
}

// ── Response bodies ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    #[serde(default)]
    instances: InstanceSet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceSet {
    #[serde(default)]
    instance: Vec<InstanceAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceAttributes {
    instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunCommandResponse {
    invoke_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInvocationResultsResponse {
    #[serde(default)]
    invocation: InvocationBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvocationBody {
    #[serde(default)]
    invocation_results: InvocationResultSet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvocationResultSet {
    #[serde(default)]
    invocation_result: Vec<InvocationResultBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvocationResultBody {
    #[serde(default)]
    instance_id: String,
    invoke_record_status: String,
    exit_code: Option<i64>,
    error_code: Option<String>,
}
