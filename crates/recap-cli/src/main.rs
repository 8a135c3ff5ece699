use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

mod commands;

use commands::auth::AuthCommands;
use commands::secrets::SecretsCommands;
use commands::topics::TopicsCommands;
use commands::workflow::WorkflowCommands;
use commands::Context;

#[derive(Parser, Debug)]
#[clap(
    name = "recap",
    author,
    version,
    about = "Provision and operate the movie recap video pipeline"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, default_value = "config.toml", help = "Path to the pipeline's config.toml")]
    config: PathBuf,

    #[clap(long, short, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Google OAuth consent and token maintenance
    Auth {
        #[clap(subcommand)]
        action: AuthCommands,
    },
    /// Export, verify and materialize the repository secrets
    Secrets {
        #[clap(subcommand)]
        action: SecretsCommands,
    },
    /// List and trigger GitHub Actions workflows
    Workflow {
        #[clap(subcommand)]
        action: WorkflowCommands,
    },
    /// Inspect and update the topic usage history
    Topics {
        #[clap(subcommand)]
        action: TopicsCommands,
    },
    /// Check every setup step and report what is missing
    Doctor {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long, help = "Print the report as JSON")]
        json: bool,

        #[clap(long, help = "Also ask the GitHub API which secrets are defined")]
        online: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .init();

    let ctx = Context::load(cli.config).await?;

    match cli.command {
        Commands::Auth { action } => commands::auth::handle(&ctx, action).await,
        Commands::Secrets { action } => commands::secrets::handle(&ctx, action).await,
        Commands::Workflow { action } => commands::workflow::handle(&ctx, action).await,
        Commands::Topics { action } => commands::topics::handle(&ctx, action).await,
        Commands::Doctor {
            channel,
            json,
            online,
        } => commands::doctor::handle(&ctx, channel, json, online).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::SecretFormat;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["recap", "doctor"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert_eq!(cli.log_level, "info");
        assert!(matches!(
            cli.command,
            Commands::Doctor {
                channel: None,
                json: false,
                online: false
            }
        ));
    }

    #[test]
    fn test_secrets_export_format() {
        let cli = Cli::try_parse_from([
            "recap", "--config", "pipeline/config.toml", "secrets", "export", "--channel", "movies",
            "--format", "gh",
        ])
        .unwrap();
        match cli.command {
            Commands::Secrets {
                action: SecretsCommands::Export { channel, format, repo },
            } => {
                assert_eq!(channel.as_deref(), Some("movies"));
                assert_eq!(format, SecretFormat::Gh);
                assert!(repo.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["recap", "secrets", "export", "--format", "yaml"]).is_err());
    }

    #[test]
    fn test_workflow_dispatch_inputs() {
        let cli = Cli::try_parse_from([
            "recap", "workflow", "dispatch", "--ref", "dev", "--input", "channel=movies", "--input",
            "query=a=b",
        ])
        .unwrap();
        match cli.command {
            Commands::Workflow {
                action: WorkflowCommands::Dispatch { git_ref, inputs, workflow, .. },
            } => {
                assert_eq!(git_ref.as_deref(), Some("dev"));
                assert!(workflow.is_none());
                assert_eq!(
                    inputs,
                    vec![
                        ("channel".to_string(), "movies".to_string()),
                        ("query".to_string(), "a=b".to_string())
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["recap", "workflow", "dispatch", "--input", "novalue"]).is_err());
    }

    #[test]
    fn test_topics_pick_collects_candidates() {
        let cli = Cli::try_parse_from([
            "recap", "topics", "pick", "--channel", "movies", "--topic", "a", "--topic", "b",
            "--record",
        ])
        .unwrap();
        match cli.command {
            Commands::Topics {
                action: TopicsCommands::Pick { topics, record, .. },
            } => {
                assert_eq!(topics, vec!["a", "b"]);
                assert!(record);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_auth_login_flags() {
        let cli =
            Cli::try_parse_from(["recap", "auth", "login", "--channel", "movies", "--no-browser", "--port", "8080"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth {
                action: AuthCommands::Login {
                    no_browser: true,
                    port: Some(8080),
                    ..
                }
            }
        ));
    }

    #[tokio::test]
    async fn test_context_without_config_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = Context::load(temp_dir.path().join("config.toml")).await.unwrap();
        assert!(!ctx.config_found);
        assert_eq!(ctx.layout().dir(), temp_dir.path().join("credentials"));
        assert!(ctx.channel(Some("movies")).is_ok());
        assert!(ctx.channel(Some("../etc")).is_err());
    }
}
