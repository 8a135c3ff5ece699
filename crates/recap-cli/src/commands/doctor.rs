use super::Context;
use anyhow::{bail, Result};
use recap_core::{RepoRef, SetupReport};

pub async fn handle(ctx: &Context, channel: Option<String>, json: bool, online: bool) -> Result<()> {
    let channel = ctx.channel(channel.as_deref())?;
    let mut report = SetupReport::run(
        &ctx.config,
        ctx.config_found,
        &ctx.layout(),
        &channel,
        &ctx.config.base_dir,
    )
    .await;

    if online {
        report = check_remote_secrets(ctx, report).await;
    }

    if json {
        println!("{}", report.render_json());
    } else {
        print!("{}", report.render_text());
    }

    if !report.is_ready() {
        bail!("Setup is incomplete");
    }
    Ok(())
}

async fn check_remote_secrets(ctx: &Context, report: SetupReport) -> SetupReport {
    let repo = report
        .repository
        .as_deref()
        .and_then(|r| RepoRef::parse(r).ok());
    let Some(repo) = repo else {
        log::warn!("Skipping repository secrets check: no repository known");
        return report;
    };

    let client = match ctx.github() {
        Ok(client) if client.has_token() => client,
        Ok(_) => {
            log::warn!("Skipping repository secrets check: GITHUB_TOKEN is not set");
            return report;
        }
        Err(e) => {
            log::warn!("Skipping repository secrets check: {:#}", e);
            return report;
        }
    };

    match client.missing_secrets(&repo).await {
        Ok(missing) => report.with_remote_secrets(&missing),
        Err(e) => {
            log::warn!("Could not list secrets of {}: {}", repo, e);
            report
        }
    }
}
