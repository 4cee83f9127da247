//! fleetcmd: run a shell script across a tagged ECS fleet.
//!
//! # Usage
//!
//! ```text
//! fleetcmd run --region cn-hangzhou --tags 'env=prod;team=infra' --script 'uptime'
//! fleetcmd discover --region cn-hangzhou --tags 'env=prod'
//! ```
//!
//! Every flag also reads its `ALIYUN_*` environment variable.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fleetcmd",
    about = "Run a shell script on every running ECS instance matching a tag filter",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover matching instances and run the script on all of them,
    /// in batches of up to 50.
    ///
    /// Per-batch failures are reported but do not change the exit status.
    Run {
        #[command(flatten)]
        target: TargetArgs,
        #[command(flatten)]
        script: ScriptArgs,
    },
    /// Print the ids of the instances a run would target, one per line.
    Discover {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Credentials, region, tag filter, and endpoints.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// RAM role whose temporary credentials are fetched from the
    /// instance metadata service.
    #[arg(long, env = "ALIYUN_RAM_NAME")]
    pub ram_role: Option<String>,

    #[arg(long, env = "ALIYUN_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "ALIYUN_ACCESS_KEY_SECRET", hide_env_values = true)]
    pub access_key_secret: Option<String>,

    #[arg(long, env = "ALIYUN_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// Region id, e.g. cn-hangzhou.
    #[arg(long, env = "ALIYUN_REGION")]
    pub region: Option<String>,

    /// Tag filter as `key=value` pairs separated by `;`.
    #[arg(long, env = "ALIYUN_TAGS")]
    pub tags: Option<String>,

    /// TOML file with a [dispatch] table of tunables.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the ECS endpoint (default https://ecs.<region>.aliyuncs.com).
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Override the instance metadata service base URL.
    #[arg(long)]
    pub metadata_endpoint: Option<String>,
}

/// Script body, inline or from a file.
#[derive(Args, Debug, Clone, Default)]
pub struct ScriptArgs {
    /// Shell script to run on each instance.
    #[arg(long, env = "ALIYUN_SCRIPT")]
    pub script: Option<String>,

    /// Read the script from a file.
    #[arg(long, conflicts_with = "script")]
    pub script_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,fleetcmd=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { target, script } => commands::run::run(&target, &script).await,
        Commands::Discover { target } => commands::discover::discover(&target).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_flags() {
        let cli = Cli::try_parse_from([
            "fleetcmd",
            "run",
            "--region",
            "cn-shanghai",
            "--tags",
            "env=prod",
            "--access-key-id",
            "AK",
            "--access-key-secret",
            "SK",
            "--script",
            "uptime",
        ])
        .unwrap();

        match cli.command {
            Commands::Run { target, script } => {
                assert_eq!(target.region.as_deref(), Some("cn-shanghai"));
                assert_eq!(target.tags.as_deref(), Some("env=prod"));
                assert_eq!(target.access_key_id.as_deref(), Some("AK"));
                assert_eq!(script.script.as_deref(), Some("uptime"));
            }
            Commands::Discover { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn script_and_script_file_conflict() {
        let result = Cli::try_parse_from([
            "fleetcmd",
            "run",
            "--script",
            "uptime",
            "--script-file",
            "deploy.sh",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn discover_takes_no_script() {
        let result = Cli::try_parse_from(["fleetcmd", "discover", "--script", "uptime"]);
        assert!(result.is_err());
    }

    #[test]
    fn inputs_fall_back_to_aliyun_environment() {
        let cli = Cli::command();
        let env_of = |subcommand: &str, arg: &str| {
            cli.find_subcommand(subcommand)
                .and_then(|cmd| cmd.get_arguments().find(|a| a.get_id() == arg))
                .and_then(|a| a.get_env())
                .and_then(|env| env.to_str())
                .map(str::to_string)
        };

        for (arg, env) in [
            ("ram_role", "ALIYUN_RAM_NAME"),
            ("access_key_id", "ALIYUN_ACCESS_KEY_ID"),
            ("access_key_secret", "ALIYUN_ACCESS_KEY_SECRET"),
            ("security_token", "ALIYUN_SECURITY_TOKEN"),
            ("region", "ALIYUN_REGION"),
            ("tags", "ALIYUN_TAGS"),
        ] {
            assert_eq!(env_of("run", arg).as_deref(), Some(env), "run {arg}");
            assert_eq!(env_of("discover", arg).as_deref(), Some(env), "discover {arg}");
        }
        assert_eq!(env_of("run", "script").as_deref(), Some("ALIYUN_SCRIPT"));
        assert_eq!(env_of("run", "script_file"), None);
    }

    #[test]
    fn secret_env_values_are_hidden() {
        let cli = Cli::command();
        let run = cli.find_subcommand("run").unwrap();
        for arg in run.get_arguments() {
            let secret = matches!(
                arg.get_id().as_str(),
                "access_key_id" | "access_key_secret" | "security_token"
            );
            assert_eq!(arg.is_hide_env_values_set(), secret, "{}", arg.get_id());
        }
    }
}
