//! Scene sequencing for demo recordings
//!
//! A [`Runbook`] is an ordered list of [`Scene`]s, each an ordered list of
//! [`Step`]s. The [`Sequencer`] launches one browser session, runs the scenes
//! strictly in sequence through a [`SceneRunner`], and restores host state
//! (microphones, browser) on every exit path.

pub mod config;
pub mod errors;
pub mod gate;
pub mod host;
pub mod runbook;
pub mod runner;
pub mod sequencer;
pub mod types;

pub use config::{AuthFailurePolicy, LoginForm, SequencerConfig, Timeouts};
pub use errors::FlowError;
pub use gate::{checkpoint_html, escape_html, AutoGate, OperatorGate, TerminalGate};
pub use host::{parse_sources, HostAudio, NoAudio, PactlAudio};
pub use runbook::{resolve_location, Credential, CredentialTable, Runbook};
pub use runner::SceneRunner;
pub use sequencer::{CleanupGuard, LaunchedSession, Sequencer, SessionLauncher};
pub use types::{
    Pace, PaceTable, RunReport, Scene, SceneReport, SceneStatus, SequencerState, Step, StepOutcome,
};
