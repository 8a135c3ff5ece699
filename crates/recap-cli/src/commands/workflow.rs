use super::Context;
use anyhow::{anyhow, Result};
use clap::Subcommand;
use std::collections::BTreeMap;

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// List the repository's workflows
    List {
        #[clap(long, help = "Repository as owner/name")]
        repo: Option<String>,
    },
    /// Trigger a manual run of the video workflow
    Dispatch {
        #[clap(long, help = "Repository as owner/name")]
        repo: Option<String>,

        #[clap(long, help = "Workflow file name or id (defaults to github.workflow)")]
        workflow: Option<String>,

        #[clap(long = "ref", help = "Branch or tag to run on (defaults to github.git_ref)")]
        git_ref: Option<String>,

        #[clap(long = "input", value_parser = parse_key_val, help = "Workflow input as key=value")]
        inputs: Vec<(String, String)>,
    },
}

/// Parse `key=value`; the value may itself contain `=`.
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid input '{}', expected key=value", s))?;
    if key.trim().is_empty() {
        return Err(anyhow!("invalid input '{}', key is empty", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

pub async fn handle(ctx: &Context, action: WorkflowCommands) -> Result<()> {
    match action {
        WorkflowCommands::List { repo } => {
            let repo = ctx.repository(repo.as_deref()).await?;
            let workflows = ctx.github()?.list_workflows(&repo).await?;
            if workflows.is_empty() {
                println!("No workflows found in {}.", repo);
            } else {
                println!("Workflows in {}:", repo);
                for workflow in workflows {
                    println!(
                        "  {:<12} {:<10} {} ({})",
                        workflow.id, workflow.state, workflow.name, workflow.path
                    );
                }
            }
        }
        WorkflowCommands::Dispatch {
            repo,
            workflow,
            git_ref,
            inputs,
        } => {
            let repo = ctx.repository(repo.as_deref()).await?;
            let workflow = workflow.unwrap_or_else(|| ctx.config.github.workflow.clone());
            let git_ref = git_ref.unwrap_or_else(|| ctx.config.github.git_ref.clone());
            let inputs: BTreeMap<String, String> = inputs.into_iter().collect();

            ctx.github()?
                .dispatch_workflow(&repo, &workflow, &git_ref, &inputs)
                .await?;
            println!(
                "Dispatched {} on {}@{}; follow it at https://github.com/{}/actions",
                workflow, repo, git_ref, repo
            );
        }
    }
    Ok(())
}
