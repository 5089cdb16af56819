use clap::Subcommand;

use super::cards::CardsArgs;
use super::jobs::JobsArgs;
use super::pdf::PdfArgs;
use super::record::RecordArgs;
use super::snap::SnapArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Record a runbook: run its scenes in order in one browser session
    Record(RecordArgs),

    /// Render scene title cards to PNG
    Cards(CardsArgs),

    /// Convert an HTML document to PDF
    Pdf(PdfArgs),

    /// Take a one-off fixed-viewport screenshot
    Snap(SnapArgs),

    /// List jobs from the platform API, or show one job in detail
    Jobs(JobsArgs),
}
