use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use reelbrowser_cli::pdf::{generate_pdf, FormalMeta, PdfStyle};
use reelbrowser_cli::session::close_session;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct PdfArgs {
    /// HTML document to print
    pub input: PathBuf,

    /// PDF file to write
    pub output: PathBuf,

    /// Header title (formal style)
    pub title: Option<String>,

    /// Document id shown in the header (formal style)
    pub doc_id: Option<String>,

    /// Camera-ready output: no margins, header or footer
    #[arg(long)]
    pub plain: bool,
}

pub async fn cmd_pdf(args: PdfArgs, ctx: &CliContext) -> Result<()> {
    let style = if args.plain {
        PdfStyle::Plain
    } else {
        PdfStyle::formal(args.title.clone(), args.doc_id.clone())
    };

    let session = ctx.open_browser(|cfg| cfg.headless = true).await?;
    let result = generate_pdf(
        session.cdp.as_ref(),
        session.page,
        &args.input,
        &args.output,
        &style,
        &FormalMeta::default(),
    )
    .await;
    close_session(&session).await;
    let bytes = result.with_context(|| format!("Failed to convert {}", args.input.display()))?;

    println!("Generated: {} ({bytes} bytes)", args.output.display());
    if let PdfStyle::Formal { title, doc_id } = &style {
        println!("  Title: {title}");
        println!("  ID: {doc_id}");
    }
    Ok(())
}
