//! ReelBrowser library
//!
//! Exposes the pieces the CLI is built from, for integration testing

pub mod cards;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod pdf;
pub mod session;

pub use cards::{render_card_html, render_deck, CardDeck, DeckReport, SceneCard};
pub use config::{ApiSettings, BrowserSettings, Config};
pub use errors::{ReelError, ReelResult};
pub use jobs::{JobDetail, JobStatus, JobSummary, JobsClient, ResultContent};
pub use pdf::{generate_pdf, FormalMeta, PdfStyle};
pub use session::ChromeLauncher;
