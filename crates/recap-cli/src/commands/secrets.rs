use super::Context;
use anyhow::{bail, Result};
use clap::Subcommand;
use recap_core::{SecretBundle, SecretFormat, SecretName};

#[derive(Subcommand, Debug)]
pub enum SecretsCommands {
    /// Print the three repository secrets for a channel
    Export {
        #[clap(long)]
        channel: Option<String>,

        #[clap(long, default_value = "dotenv", help = "Output format: dotenv, json or gh")]
        format: SecretFormat,

        #[clap(long, help = "Repository (owner/name) for the gh format")]
        repo: Option<String>,
    },
    /// Write secrets from the environment to the files the pipeline reads (CI side)
    Materialize {
        #[clap(long)]
        channel: Option<String>,
    },
    /// Check that the repository defines every pipeline secret
    Verify {
        #[clap(long, help = "Repository as owner/name")]
        repo: Option<String>,
    },
}

pub async fn handle(ctx: &Context, action: SecretsCommands) -> Result<()> {
    match action {
        SecretsCommands::Export {
            channel,
            format,
            repo,
        } => {
            let channel = ctx.channel(channel.as_deref())?;
            let bundle = SecretBundle::collect(&ctx.config, &ctx.layout(), &channel).await?;

            let repo = match format {
                SecretFormat::Gh => match ctx.repository(repo.as_deref()).await {
                    Ok(repo) => Some(repo),
                    Err(e) => {
                        log::warn!("{:#}; gh will use the current directory's repository", e);
                        None
                    }
                },
                _ => None,
            };

            eprintln!("The output below contains credentials; do not commit or share it.");
            print!("{}", bundle.render(format, repo.as_ref())?);
        }
        SecretsCommands::Materialize { channel } => {
            let channel = ctx.channel(channel.as_deref())?;
            let bundle = SecretBundle::from_env()?;
            bundle
                .materialize(&ctx.layout(), &channel, &ctx.config_path)
                .await?;
            println!(
                "Wrote credentials for {} to {} and the API key to {}",
                channel,
                ctx.layout().dir().display(),
                ctx.config_path.display()
            );
        }
        SecretsCommands::Verify { repo } => {
            let repo = ctx.repository(repo.as_deref()).await?;
            let missing = ctx.github()?.missing_secrets(&repo).await?;

            println!("Secrets in {}:", repo);
            for name in SecretName::ALL {
                let state = if missing.contains(&name) { "missing" } else { "ok" };
                println!("  {:<20} {:<8} {}", name.as_str(), state, name.description());
            }
            if !missing.is_empty() {
                bail!("{} of {} secrets missing", missing.len(), SecretName::ALL.len());
            }
        }
    }
    Ok(())
}
