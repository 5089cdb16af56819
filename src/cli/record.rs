use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use action_flow::{
    AutoGate, HostAudio, NoAudio, OperatorGate, PactlAudio, RunReport, Runbook, Sequencer,
    SequencerConfig, TerminalGate,
};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use reelbrowser_cli::session::ChromeLauncher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::context::CliContext;
use crate::cli::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct RecordArgs {
    /// Runbook YAML describing the scenes
    pub runbook: PathBuf,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headful: bool,

    /// Open the window fullscreen (implies --headful)
    #[arg(long)]
    pub fullscreen: bool,

    /// Auto-confirm checkpoints instead of waiting for ENTER
    #[arg(long)]
    pub no_gate: bool,

    /// Leave microphones as they are
    #[arg(long)]
    pub no_mute: bool,

    /// Session directory for run.log, report.json and screenshots
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

pub async fn cmd_record(args: RecordArgs, ctx: &CliContext, output: &OutputFormat) -> Result<()> {
    let runbook = Runbook::load(&args.runbook)
        .with_context(|| format!("Failed to load runbook {}", args.runbook.display()))?;

    let session_dir = args
        .out
        .clone()
        .unwrap_or_else(|| default_session_dir(&ctx.config().output_dir, &runbook.name));
    let _log_guard = ctx.logging().tee_to(&session_dir.join("run.log"))?;

    let sequencer_config = sequencer_config(ctx.config().sequencer.clone(), &args, &session_dir);
    let cdp_config = ctx.cdp_config(|cfg| {
        if args.headful || args.fullscreen {
            cfg.headless = false;
        }
        if args.fullscreen {
            cfg.fullscreen = true;
        }
    });
    info!(
        runbook = %runbook.name,
        scenes = runbook.scenes.len(),
        session = %session_dir.display(),
        headless = cdp_config.headless,
        "Recording"
    );

    let audio: Arc<dyn HostAudio> = if sequencer_config.mute_microphones {
        Arc::new(PactlAudio::new())
    } else {
        Arc::new(NoAudio)
    };
    let gate: Arc<dyn OperatorGate> = if args.no_gate {
        Arc::new(AutoGate::new())
    } else {
        Arc::new(TerminalGate)
    };

    let cancel = CancellationToken::new();
    let interrupt = spawn_interrupt_listener(cancel.clone());

    let mut sequencer = Sequencer::new(
        sequencer_config,
        Arc::new(ChromeLauncher::new(cdp_config)),
        audio,
        gate,
    )
    .with_cancel_token(cancel);
    let report = sequencer.run(&runbook).await;
    interrupt.abort();
    let report = report?;

    let report_path = session_dir.join("report.json");
    tokio::fs::write(&report_path, serde_json::to_vec_pretty(&report)?)
        .await
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    emit(output, &report, || render_summary(&report))?;

    if !report.succeeded() {
        bail!(
            "run '{}' failed: {}",
            report.runbook,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn sequencer_config(mut cfg: SequencerConfig, args: &RecordArgs, session_dir: &Path) -> SequencerConfig {
    if args.no_mute {
        cfg.mute_microphones = false;
    }
    if cfg.screenshot_dir.is_relative() {
        cfg.screenshot_dir = session_dir.join("screenshots");
    }
    cfg
}

fn default_session_dir(root: &Path, runbook: &str) -> PathBuf {
    let slug: String = runbook
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "run" } else { slug };
    root.join(format!("{}-{}", slug, Utc::now().format("%Y%m%d-%H%M%S")))
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after cleanup");
            cancel.cancel();
        }
    })
}

fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();
    let elapsed = report
        .finished_at
        .and_then(|end| (end - report.started_at).to_std().ok())
        .map(|d| humantime::format_duration(Duration::from_secs(d.as_secs())).to_string())
        .unwrap_or_else(|| "-".to_string());

    out.push_str(&format!(
        "Run '{}' {} in {}\n",
        report.runbook,
        report.state.as_str(),
        elapsed
    ));
    for scene in &report.scenes {
        let failed = scene.failed_steps();
        out.push_str(&format!(
            "  {:<24} {:>3} steps  {:>2} failed  {}\n",
            scene.id,
            scene.steps.len(),
            failed,
            humantime::format_duration(Duration::from_secs(scene.elapsed_ms / 1000)),
        ));
        for step in scene.steps.iter().filter(|step| !step.ok) {
            out.push_str(&format!(
                "      step {} ({}): {}\n",
                step.index + 1,
                step.kind,
                step.detail
            ));
        }
    }
    out.push_str(&format!(
        "Screenshots: {}  Failed steps: {}/{}\n",
        report.screenshots.len(),
        report.failed_steps(),
        report.total_steps()
    ));
    if let Some(error) = &report.error {
        out.push_str(&format!("Error: {error}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RecordArgs {
        RecordArgs {
            runbook: PathBuf::from("demo.yaml"),
            headful: false,
            fullscreen: false,
            no_gate: true,
            no_mute: true,
            out: None,
        }
    }

    #[test]
    fn session_dir_is_slugged_and_stamped() {
        let dir = default_session_dir(Path::new("/rec"), "Camper Tour: EP2");
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("camper-tour--ep2-"), "{name}");
        assert_eq!(dir.parent(), Some(Path::new("/rec")));
    }

    #[test]
    fn relative_screenshot_dir_moves_into_session() {
        let cfg = sequencer_config(SequencerConfig::default(), &args(), Path::new("/rec/run1"));
        assert_eq!(cfg.screenshot_dir, PathBuf::from("/rec/run1/screenshots"));
        assert!(!cfg.mute_microphones);

        let absolute = SequencerConfig {
            screenshot_dir: PathBuf::from("/shots"),
            ..SequencerConfig::default()
        };
        let cfg = sequencer_config(absolute, &args(), Path::new("/rec/run1"));
        assert_eq!(cfg.screenshot_dir, PathBuf::from("/shots"));
    }
}
