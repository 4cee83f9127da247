//! Credential resolution.
//!
//! Role credentials (when a role name is configured) win over the
//! environment, field by field: a role lookup that only returns a token
//! still needs the key id and secret from the environment. Empty strings
//! count as unset everywhere.

use std::fmt;

use fleetcmd_core::Session;
use tracing::{debug, info};

use crate::api::ApiFuture;
use crate::error::CredentialError;

/// Temporary credentials returned for a role. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCredentials {
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub security_token: Option<String>,
    pub expiration: Option<String>,
}

/// Source of role credentials, injected for testability.
pub trait RoleCredentialSource: Send + Sync {
    fn fetch<'a>(&'a self, role: &'a str) -> ApiFuture<'a, RoleCredentials>;
}

/// Raw credential inputs from flags / environment.
#[derive(Clone, Default)]
pub struct CredentialInputs {
    pub role_name: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub security_token: Option<String>,
}

impl fmt::Debug for CredentialInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInputs")
            .field("role_name", &self.role_name)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &self.access_key_secret.as_ref().map(|_| "<redacted>"))
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Resolve a [`Session`] for `region`.
///
/// `roles` is only consulted when `inputs.role_name` is set. A lookup
/// failure is returned as-is; there are no retries.
pub async fn resolve_session(
    inputs: &CredentialInputs,
    region: &str,
    roles: &dyn RoleCredentialSource,
) -> Result<Session, CredentialError> {
    let mut access_key_id = None;
    let mut access_key_secret = None;
    let mut security_token = None;

    if let Some(role) = present(inputs.role_name.as_ref()) {
        let creds = roles
            .fetch(&role)
            .await
            .map_err(|source| CredentialError::RoleLookup {
                role: role.clone(),
                source,
            })?;
        access_key_id = present(creds.access_key_id.as_ref());
        access_key_secret = present(creds.access_key_secret.as_ref());
        security_token = present(creds.security_token.as_ref());
        info!(
            %role,
            expiration = creds.expiration.as_deref().unwrap_or("-"),
            "resolved role credentials"
        );
    }

    let access_key_id = access_key_id
        .or_else(|| present(inputs.access_key_id.as_ref()))
        .ok_or(CredentialError::Empty("access key id"))?;
    let access_key_secret = access_key_secret
        .or_else(|| present(inputs.access_key_secret.as_ref()))
        .ok_or(CredentialError::Empty("access key secret"))?;
    let security_token = security_token.or_else(|| present(inputs.security_token.as_ref()));

    debug!(
        %access_key_id,
        has_token = security_token.is_some(),
        %region,
        "session resolved"
    );

    Ok(Session {
        access_key_id,
        access_key_secret,
        security_token,
        region: region.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::Mutex;

    /// Role source returning a canned response and recording lookups.
    struct StubRoles {
        response: Mutex<Option<Result<RoleCredentials, ApiError>>>,
        lookups: Mutex<Vec<String>>,
    }

    impl StubRoles {
        fn returning(creds: RoleCredentials) -> Self {
            Self {
                response: Mutex::new(Some(Ok(creds))),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Mutex::new(Some(Err(ApiError::Service {
                    action: "RoleCredentials".to_string(),
                    status: 503,
                    code: "ServiceUnavailable".to_string(),
                    message: message.to_string(),
                    request_id: None,
                }))),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn lookups(&self) -> Vec<String> {
            self.lookups.lock().unwrap().clone()
        }
    }

    impl RoleCredentialSource for StubRoles {
        fn fetch<'a>(&'a self, role: &'a str) -> ApiFuture<'a, RoleCredentials> {
            self.lookups.lock().unwrap().push(role.to_string());
            let response = self
                .response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(RoleCredentials::default()));
            Box::pin(async move { response })
        }
    }

    fn env_inputs() -> CredentialInputs {
        CredentialInputs {
            role_name: None,
            access_key_id: Some("env-id".to_string()),
            access_key_secret: Some("env-secret".to_string()),
            security_token: None,
        }
    }

    #[tokio::test]
    async fn environment_only() {
        let roles = StubRoles::returning(RoleCredentials::default());
        let session = resolve_session(&env_inputs(), "cn-hangzhou", &roles)
            .await
            .unwrap();
        assert_eq!(session.access_key_id, "env-id");
        assert_eq!(session.access_key_secret, "env-secret");
        assert_eq!(session.security_token, None);
        assert_eq!(session.region, "cn-hangzhou");
        assert!(roles.lookups().is_empty());
    }

    #[tokio::test]
    async fn role_fields_take_precedence() {
        let roles = StubRoles::returning(RoleCredentials {
            access_key_id: Some("STS.id".to_string()),
            access_key_secret: Some("sts-secret".to_string()),
            security_token: Some("tok".to_string()),
            expiration: None,
        });
        let inputs = CredentialInputs {
            role_name: Some("ops".to_string()),
            ..env_inputs()
        };
        let session = resolve_session(&inputs, "cn-hangzhou", &roles).await.unwrap();
        assert_eq!(session.access_key_id, "STS.id");
        assert_eq!(session.access_key_secret, "sts-secret");
        assert_eq!(session.security_token.as_deref(), Some("tok"));
        assert_eq!(roles.lookups(), vec!["ops".to_string()]);
    }

    #[tokio::test]
    async fn role_token_only_falls_back_to_environment_keys() {
        let roles = StubRoles::returning(RoleCredentials {
            security_token: Some("t".to_string()),
            ..Default::default()
        });
        let inputs = CredentialInputs {
            role_name: Some("ops".to_string()),
            ..env_inputs()
        };
        let session = resolve_session(&inputs, "cn-hangzhou", &roles).await.unwrap();
        assert_eq!(session.security_token.as_deref(), Some("t"));
        assert_eq!(session.access_key_id, "env-id");
        assert_eq!(session.access_key_secret, "env-secret");
    }

    #[tokio::test]
    async fn role_token_only_without_environment_keys_fails() {
        let roles = StubRoles::returning(RoleCredentials {
            security_token: Some("t".to_string()),
            ..Default::default()
        });
        let inputs = CredentialInputs {
            role_name: Some("ops".to_string()),
            ..Default::default()
        };
        let err = resolve_session(&inputs, "cn-hangzhou", &roles)
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Empty("access key id")));
    }

    #[tokio::test]
    async fn missing_secret_is_reported() {
        let roles = StubRoles::returning(RoleCredentials::default());
        let inputs = CredentialInputs {
            access_key_secret: None,
            ..env_inputs()
        };
        let err = resolve_session(&inputs, "cn-hangzhou", &roles)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "access key secret is empty");
    }

    #[tokio::test]
    async fn empty_strings_count_as_unset() {
        let roles = StubRoles::returning(RoleCredentials {
            access_key_id: Some(String::new()),
            ..Default::default()
        });
        let inputs = CredentialInputs {
            role_name: Some("ops".to_string()),
            access_key_id: Some("env-id".to_string()),
            access_key_secret: Some("env-secret".to_string()),
            security_token: Some(String::new()),
        };
        let session = resolve_session(&inputs, "cn-hangzhou", &roles).await.unwrap();
        assert_eq!(session.access_key_id, "env-id");
        assert_eq!(session.security_token, None);
    }

    #[tokio::test]
    async fn empty_role_name_skips_lookup() {
        let roles = StubRoles::failing("must not be called");
        let inputs = CredentialInputs {
            role_name: Some(String::new()),
            ..env_inputs()
        };
        resolve_session(&inputs, "cn-hangzhou", &roles).await.unwrap();
        assert!(roles.lookups().is_empty());
    }

    #[tokio::test]
    async fn role_lookup_failure_propagates() {
        let roles = StubRoles::failing("connection refused");
        let inputs = CredentialInputs {
            role_name: Some("ops".to_string()),
            ..env_inputs()
        };
        let err = resolve_session(&inputs, "cn-hangzhou", &roles)
            .await
            .unwrap_err();
        match err {
            CredentialError::RoleLookup { role, source } => {
                assert_eq!(role, "ops");
                assert!(matches!(source, ApiError::Service { status: 503, .. }));
                assert!(source.to_string().contains("connection refused"));
            }
            other => panic!("expected RoleLookup, got {other:?}"),
        }
    }

    #[test]
    fn inputs_debug_redacts_secret() {
        let inputs = CredentialInputs {
            access_key_secret: Some("hunter2".to_string()),
            security_token: Some("tok".to_string()),
            ..Default::default()
        };
        let debug = format!("{inputs:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"tok\""));
        assert!(debug.contains("<redacted>"));
    }
}
