//! ECS instance metadata service: temporary RAM role credentials.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::ApiFuture;
use crate::credentials::{RoleCredentialSource, RoleCredentials};
use crate::error::ApiError;

/// Link-local address of the metadata service inside ECS.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://100.100.100.200";

const ACTION: &str = "RoleCredentials";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches role credentials from
/// `{base}/latest/meta-data/ram/security-credentials/{role}`.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_METADATA_ENDPOINT)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, role: &str) -> String {
        format!(
            "{}/latest/meta-data/ram/security-credentials/{}",
            self.base_url,
            urlencoding::encode(role)
        )
    }
}

impl RoleCredentialSource for MetadataClient {
    fn fetch<'a>(&'a self, role: &'a str) -> ApiFuture<'a, RoleCredentials> {
        Box::pin(async move {
            let url = self.url_for(role);
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            debug!(%role, status = status.as_u16(), "metadata credential lookup");

            if !status.is_success() {
                return Err(ApiError::Service {
                    action: ACTION.to_string(),
                    status: status.as_u16(),
                    code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                    message: String::from_utf8_lossy(&body).into_owned(),
                    request_id: None,
                });
            }

            let doc: CredentialDocument =
                serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
                    action: ACTION.to_string(),
                    source,
                })?;

            match doc.code.as_deref() {
                Some(code) if code != "Success" => {
                    return Err(ApiError::Service {
                        action: ACTION.to_string(),
                        status: status.as_u16(),
                        code: code.to_string(),
                        message: format!("metadata service returned {code} for role {role}"),
                        request_id: None,
                    });
                }
                _ => {}
            }

            Ok(RoleCredentials {
                access_key_id: doc.access_key_id,
                access_key_secret: doc.access_key_secret,
                security_token: doc.security_token,
                expiration: doc.expiration,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialDocument {
    code: Option<String>,
    access_key_id: Option<String>,
    access_key_secret: Option<String>,
    security_token: Option<String>,
    expiration: Option<String>,
}
