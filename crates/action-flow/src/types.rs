//! Core types for scenes and runs

use action_primitives::{Readiness, ScrollTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One scripted action inside a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL, then wait for readiness (configured default when unset)
    Navigate {
        url: String,
        #[serde(default)]
        wait: Option<Readiness>,
    },

    /// Focus and type at human cadence
    Type {
        selector: String,
        text: String,
        #[serde(default)]
        clear: bool,
    },

    /// Click through the resolution chain; `wait` joins a navigation wait
    Click {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: Vec<String>,
        /// Named runbook target
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        wait: Option<Readiness>,
    },

    Scroll {
        to: ScrollTarget,
        #[serde(default)]
        smooth: Option<bool>,
    },

    /// Presentation delay for the viewer
    Wait {
        #[serde(default)]
        ms: Option<u64>,
        #[serde(default)]
        pace: Option<Pace>,
    },

    /// Readiness polling with a timeout
    WaitFor {
        until: Readiness,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    RunScript {
        source: String,
    },

    Screenshot {
        label: String,
    },

    Zoom {
        #[serde(default)]
        factor: Option<f64>,
    },

    /// Fill the identity provider form as `role`
    Login {
        role: String,
        #[serde(default)]
        verify_token: bool,
    },

    Logout {
        #[serde(default)]
        url: Option<String>,
    },

    /// Operator gate: show a card, wait for confirmation, count down
    Checkpoint {
        title: String,
        #[serde(default)]
        subtitle: Option<String>,
        #[serde(default)]
        countdown_secs: Option<u64>,
    },
}

impl Step {
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Navigate { .. } => "navigate",
            Step::Type { .. } => "type",
            Step::Click { .. } => "click",
            Step::Scroll { .. } => "scroll",
            Step::Wait { .. } => "wait",
            Step::WaitFor { .. } => "wait_for",
            Step::RunScript { .. } => "run_script",
            Step::Screenshot { .. } => "screenshot",
            Step::Zoom { .. } => "zoom",
            Step::Login { .. } => "login",
            Step::Logout { .. } => "logout",
            Step::Checkpoint { .. } => "checkpoint",
        }
    }
}

/// Named presentation delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Short,
    Medium,
    Long,
    Xlong,
    Intro,
    Outro,
}

/// Milliseconds for each [`Pace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceTable {
    pub short: u64,
    pub medium: u64,
    pub long: u64,
    pub xlong: u64,
    pub intro: u64,
    pub outro: u64,
}

impl Default for PaceTable {
    fn default() -> Self {
        Self {
            short: 2_500,
            medium: 4_000,
            long: 6_000,
            xlong: 8_000,
            intro: 5_000,
            outro: 5_000,
        }
    }
}

impl PaceTable {
    pub fn duration(&self, pace: Pace) -> Duration {
        let ms = match pace {
            Pace::Short => self.short,
            Pace::Medium => self.medium,
            Pace::Long => self.long,
            Pace::Xlong => self.xlong,
            Pace::Intro => self.intro,
            Pace::Outro => self.outro,
        };
        Duration::from_millis(ms)
    }
}

/// One narrative beat of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Nominal length, used for voice-over sync
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    Pending,
    Running,
    Completed,
}

/// Sequencer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    Initializing,
    Recording,
    Finalizing,
    Done,
    Failed,
}

impl SequencerState {
    pub fn can_transition_to(self, next: SequencerState) -> bool {
        use SequencerState::*;
        matches!(
            (self, next),
            (Initializing, Recording)
                | (Recording, Finalizing)
                | (Finalizing, Done)
                | (Initializing | Recording | Finalizing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SequencerState::Done | SequencerState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SequencerState::Initializing => "initializing",
            SequencerState::Recording => "recording",
            SequencerState::Finalizing => "finalizing",
            SequencerState::Done => "done",
            SequencerState::Failed => "failed",
        }
    }
}

/// Result of one step; failures are recorded, not raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub index: usize,
    pub kind: String,
    pub ok: bool,
    pub detail: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneReport {
    pub id: String,
    pub label: String,
    pub status: SceneStatus,
    pub steps: Vec<StepOutcome>,
    /// Remaining steps were skipped after an authentication failure
    pub skipped: bool,
    pub elapsed_ms: u64,
}

impl SceneReport {
    pub fn new(scene: &Scene) -> Self {
        Self {
            id: scene.id.clone(),
            label: scene.label.clone(),
            status: SceneStatus::Pending,
            steps: Vec::new(),
            skipped: false,
            elapsed_ms: 0,
        }
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub runbook: String,
    pub state: SequencerState,
    pub scenes: Vec<SceneReport>,
    pub screenshots: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(runbook: impl Into<String>) -> Self {
        Self {
            runbook: runbook.into(),
            state: SequencerState::Initializing,
            scenes: Vec::new(),
            screenshots: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.state == SequencerState::Done
    }

    pub fn failed_steps(&self) -> usize {
        self.scenes.iter().map(SceneReport::failed_steps).sum()
    }

    pub fn total_steps(&self) -> usize {
        self.scenes.iter().map(|s| s.steps.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_deserialize_from_tagged_yaml() {
        let steps: Vec<Step> = serde_yaml::from_str(
            r##"
- type: navigate
  url: https://example.test/login
- type: type
  selector: "#username"
  text: alice
- type: click
  text: [Approve, Approva]
  wait: load
- type: scroll
  to:
    offset: { y: 400 }
- type: wait
  pace: long
- type: wait_for
  until: { selector: "#grid" }
  timeout_ms: 2000
"##,
        )
        .unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(
            steps[0],
            Step::Navigate {
                url: "https://example.test/login".into(),
                wait: None
            }
        );
        match &steps[2] {
            Step::Click { text, wait, selector, .. } => {
                assert_eq!(text, &vec!["Approve".to_string(), "Approva".to_string()]);
                assert_eq!(wait, &Some(Readiness::Load));
                assert!(selector.is_none());
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(steps[3], Step::Scroll { to: ScrollTarget::Offset { y: 400 }, smooth: None });
        assert_eq!(
            steps[5],
            Step::WaitFor {
                until: Readiness::Selector("#grid".into()),
                timeout_ms: Some(2000)
            }
        );
        assert_eq!(steps[4].kind(), "wait");
    }

    #[test]
    fn pace_table_defaults() {
        let table = PaceTable::default();
        assert_eq!(table.duration(Pace::Short), Duration::from_millis(2_500));
        assert_eq!(table.duration(Pace::Xlong), Duration::from_millis(8_000));
    }

    #[test]
    fn sequencer_transitions() {
        use SequencerState::*;
        assert!(Initializing.can_transition_to(Recording));
        assert!(Recording.can_transition_to(Finalizing));
        assert!(Finalizing.can_transition_to(Done));
        assert!(Recording.can_transition_to(Failed));
        assert!(!Initializing.can_transition_to(Done));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Recording));
    }
}
