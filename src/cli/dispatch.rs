use super::cards::cmd_cards;
use super::env::CliArgs;
use super::jobs::cmd_jobs;
use super::pdf::cmd_pdf;
use super::record::cmd_record;
use super::snap::cmd_snap;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Record(args) => cmd_record(args, ctx, &cli.output).await,
        Commands::Cards(args) => cmd_cards(args, ctx, &cli.output).await,
        Commands::Pdf(args) => cmd_pdf(args, ctx).await,
        Commands::Snap(args) => cmd_snap(args, ctx).await,
        Commands::Jobs(args) => cmd_jobs(args, ctx, &cli.output).await,
    }
}
