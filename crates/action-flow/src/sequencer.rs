//! Sequencer: launches the session, records every scene, always cleans up

use crate::{
    config::SequencerConfig,
    errors::FlowError,
    gate::OperatorGate,
    host::HostAudio,
    runbook::Runbook,
    runner::SceneRunner,
    types::{RunReport, SequencerState},
};
use async_trait::async_trait;
use cdp_adapter::{Cdp, PageId};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A live browser with the one page scenes run on
pub struct LaunchedSession {
    pub cdp: Arc<dyn Cdp>,
    pub page: PageId,
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<LaunchedSession, FlowError>;
}

/// Restores audio and closes the browser exactly once.
///
/// Call [`CleanupGuard::run`] on every path; if the guard is dropped without
/// it (a panic unwinding through the sequencer), cleanup is spawned onto the
/// current runtime instead.
pub struct CleanupGuard {
    audio: Arc<dyn HostAudio>,
    restore_audio: bool,
    cdp: Option<Arc<dyn Cdp>>,
    done: bool,
}

impl CleanupGuard {
    pub fn new(audio: Arc<dyn HostAudio>, restore_audio: bool) -> Self {
        Self {
            audio,
            restore_audio,
            cdp: None,
            done: false,
        }
    }

    pub fn attach(&mut self, cdp: Arc<dyn Cdp>) {
        self.cdp = Some(cdp);
    }

    pub async fn run(mut self) {
        self.done = true;
        cleanup(self.audio.clone(), self.restore_audio, self.cdp.take()).await;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        let audio = self.audio.clone();
        let restore_audio = self.restore_audio;
        let cdp = self.cdp.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(cleanup(audio, restore_audio, cdp));
            }
            Err(_) => warn!("cleanup skipped: no runtime; unmute microphones manually"),
        }
    }
}

async fn cleanup(audio: Arc<dyn HostAudio>, restore_audio: bool, cdp: Option<Arc<dyn Cdp>>) {
    info!("Cleaning up");
    if let Some(cdp) = cdp {
        cdp.close().await;
    }
    if restore_audio {
        audio.restore_inputs().await;
    }
}

pub struct Sequencer {
    config: SequencerConfig,
    launcher: Arc<dyn SessionLauncher>,
    audio: Arc<dyn HostAudio>,
    gate: Arc<dyn OperatorGate>,
    cancel: CancellationToken,
    state: SequencerState,
}

impl Sequencer {
    pub fn new(
        config: SequencerConfig,
        launcher: Arc<dyn SessionLauncher>,
        audio: Arc<dyn HostAudio>,
        gate: Arc<dyn OperatorGate>,
    ) -> Self {
        Self {
            config,
            launcher,
            audio,
            gate,
            cancel: CancellationToken::new(),
            state: SequencerState::Initializing,
        }
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    fn transition(&mut self, next: SequencerState) -> Result<(), FlowError> {
        if !self.state.can_transition_to(next) {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!(from = self.state.as_str(), to = next.as_str(), "Sequencer state");
        self.state = next;
        Ok(())
    }

    /// Run every scene in order. The report's `state` is `Done` or `Failed`.
    pub async fn run(&mut self, runbook: &Runbook) -> Result<RunReport, FlowError> {
        if self.state != SequencerState::Initializing {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to: SequencerState::Initializing,
            });
        }

        let mut report = RunReport::new(&runbook.name);
        info!(runbook = %runbook.name, scenes = runbook.scenes.len(), "Sequencer starting");

        if self.config.mute_microphones {
            self.audio.mute_inputs().await;
        }
        let mut guard = CleanupGuard::new(self.audio.clone(), self.config.mute_microphones);

        let outcome = self.record(runbook, &mut guard, &mut report).await;

        match outcome {
            Ok(()) => {
                self.transition(SequencerState::Finalizing)?;
                guard.run().await;
                self.transition(SequencerState::Done)?;
            }
            Err(err) => {
                error!(error = %err, "Run failed");
                guard.run().await;
                self.transition(SequencerState::Failed)?;
                report.error = Some(err.to_string());
            }
        }

        report.state = self.state;
        report.finished_at = Some(Utc::now());
        info!(
            state = self.state.as_str(),
            scenes = report.scenes.len(),
            steps = report.total_steps(),
            failed_steps = report.failed_steps(),
            "Sequencer finished"
        );
        Ok(report)
    }

    async fn record(
        &mut self,
        runbook: &Runbook,
        guard: &mut CleanupGuard,
        report: &mut RunReport,
    ) -> Result<(), FlowError> {
        let session = self.launcher.launch().await?;
        guard.attach(session.cdp.clone());

        let mut runner = SceneRunner::new(
            session.cdp.clone(),
            session.page,
            runbook,
            self.config.clone(),
            self.gate.clone(),
            self.cancel.clone(),
        );

        self.transition(SequencerState::Recording)?;
        let mut result = Ok(());
        for scene in &runbook.scenes {
            if self.cancel.is_cancelled() {
                result = Err(FlowError::Cancelled(format!("before scene '{}'", scene.id)));
                break;
            }
            match runner.run_scene(scene).await {
                Ok(scene_report) => report.scenes.push(scene_report),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        report.screenshots = runner.into_screenshots();
        result
    }
}
