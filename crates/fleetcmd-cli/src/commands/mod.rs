//! Subcommand implementations and the setup they share.

pub mod discover;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use fleetcmd_cloud::{CommandApi, CredentialInputs, EcsClient, MetadataClient, resolve_session};
use fleetcmd_core::{DispatchSettings, FleetConfig};
use tracing::info;

use crate::{ScriptArgs, TargetArgs};

/// Tunables from `--config`, or the defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<DispatchSettings> {
    match path {
        Some(path) => {
            let config = FleetConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            info!(path = %path.display(), "loaded dispatch settings");
            Ok(config.dispatch)
        }
        None => Ok(DispatchSettings::default()),
    }
}

impl ScriptArgs {
    /// The inline script, or the contents of `--script-file`.
    pub fn body(&self) -> anyhow::Result<Option<String>> {
        match &self.script_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("failed to read script file {}", path.display())),
            None => Ok(self.script.clone()),
        }
    }
}

/// Resolve credentials and build the ECS client for `region`.
pub async fn connect(args: &TargetArgs, region: &str) -> anyhow::Result<Arc<dyn CommandApi>> {
    let roles = match &args.metadata_endpoint {
        Some(url) => MetadataClient::with_base_url(url)?,
        None => MetadataClient::new()?,
    };
    let inputs = CredentialInputs {
        role_name: args.ram_role.clone(),
        access_key_id: args.access_key_id.clone(),
        access_key_secret: args.access_key_secret.clone(),
        security_token: args.security_token.clone(),
    };
    let session = resolve_session(&inputs, region, &roles)
        .await
        .context("failed to resolve credentials")?;

    let session = Arc::new(session);
    let client = match &args.endpoint {
        Some(endpoint) => EcsClient::with_endpoint(session, endpoint)?,
        None => EcsClient::new(session)?,
    };
    info!(endpoint = client.endpoint(), "ECS client ready");
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn settings_default_without_config() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings, DispatchSettings::default());
    }

    #[test]
    fn settings_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\npoll_interval_secs = 2").unwrap();

        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.poll_interval_secs, 2);
        assert_eq!(settings.batch_size.get(), 50);
    }

    #[test]
    fn bad_config_names_the_file() {
        let err = load_settings(Some(Path::new("/nonexistent/fleetcmd.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/fleetcmd.toml"));
    }

    #[test]
    fn script_file_is_read_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "#!/bin/sh\necho ok\n").unwrap();

        let args = ScriptArgs {
            script: None,
            script_file: Some(file.path().to_path_buf()),
        };
        assert_eq!(args.body().unwrap().as_deref(), Some("#!/bin/sh\necho ok\n"));
    }

    #[test]
    fn inline_script_passes_through() {
        let args = ScriptArgs {
            script: Some("uptime".to_string()),
            script_file: None,
        };
        assert_eq!(args.body().unwrap().as_deref(), Some("uptime"));
    }
}
