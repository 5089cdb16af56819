use anyhow::{Context, Result};
use clap::Args;
use reelbrowser_cli::jobs::{render_detail, render_table, JobsClient};

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct JobsArgs {
    /// Show one job in detail (full id or a unique prefix of it)
    pub id: Option<String>,

    /// API base URL (defaults to `api.base_url` from the config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Bearer token (defaults to the config, then REELBROWSER_API_TOKEN)
    #[arg(long)]
    pub token: Option<String>,
}

pub async fn cmd_jobs(args: JobsArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let api = &ctx.config().api;
    let base_url = args
        .base_url
        .or_else(|| api.base_url.clone())
        .context("No API base URL; pass --base-url or set api.base_url in the config")?;
    let token = args
        .token
        .or_else(|| api.resolve_token())
        .context("No API token; pass --token or set REELBROWSER_API_TOKEN")?;

    let client = JobsClient::new()?;
    match args.id {
        Some(id) => {
            let job = client
                .get(&base_url, &token, &id)
                .await
                .with_context(|| format!("Failed to fetch job {id} from {base_url}"))?;
            emit(output, &job, || render_detail(&job))
        }
        None => {
            let jobs = client
                .list(&base_url, &token)
                .await
                .with_context(|| format!("Failed to list jobs from {base_url}"))?;
            emit(output, &jobs, || render_table(&jobs))
        }
    }
}
