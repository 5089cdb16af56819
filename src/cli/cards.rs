use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use reelbrowser_cli::cards::{render_deck, CardDeck};
use reelbrowser_cli::session::close_session;

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct CardsArgs {
    /// Card deck YAML
    pub deck: PathBuf,

    /// Directory for scene-card-N.png files
    pub out_dir: PathBuf,
}

pub async fn cmd_cards(args: CardsArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let deck = CardDeck::load(&args.deck)
        .with_context(|| format!("Failed to load card deck {}", args.deck.display()))?;

    let session = ctx.open_browser(|cfg| cfg.headless = true).await?;
    let result = render_deck(session.cdp.as_ref(), session.page, &deck, &args.out_dir).await;
    close_session(&session).await;
    let report = result?;

    emit(output, &report, || {
        let mut out = String::new();
        for path in &report.written {
            out.push_str(&format!("  [OK] {}\n", path.display()));
        }
        for (num, err) in &report.failed {
            out.push_str(&format!("  [FAILED] scene-card-{num}: {err}\n"));
        }
        out.push_str(&format!(
            "{} of {} scene cards generated.\n",
            report.written.len(),
            deck.cards.len()
        ));
        out
    })?;

    if !report.is_complete() {
        bail!("{} card(s) failed", report.failed.len());
    }
    Ok(())
}
