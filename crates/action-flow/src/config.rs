//! Sequencer tuning: pacing, timeouts, login form, failure policy

use crate::types::PaceTable;
use action_primitives::{Readiness, TypingCadence, DEFAULT_TOKEN_KEYS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Per-primitive timeouts in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub navigate_ms: u64,
    pub selector_ms: u64,
    pub script_ms: u64,
    pub screenshot_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigate_ms: 15_000,
            selector_ms: 5_000,
            script_ms: 10_000,
            screenshot_ms: 10_000,
        }
    }
}

/// Identity provider login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    /// Texts of the application's "log in" entry link, tried in order
    pub entry_texts: Vec<String>,
    pub username_selector: String,
    pub password_selector: String,
    pub submit_selector: String,
    pub form_timeout_ms: u64,
    /// Pause after clicking the entry link
    pub entry_settle_ms: u64,
    /// Pause after submitting, while the provider redirects back
    pub submit_settle_ms: u64,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            entry_texts: vec!["login".into(), "accedi".into(), "sign in".into()],
            username_selector: "#username".into(),
            password_selector: "#password".into(),
            submit_selector: "#kc-login".into(),
            form_timeout_ms: 8_000,
            entry_settle_ms: 2_000,
            submit_settle_ms: 3_000,
        }
    }
}

/// What a failed token check after login does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Skip the rest of the current scene
    SkipScene,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub pacing: PaceTable,
    pub typing: TypingCadence,
    pub timeouts: Timeouts,
    pub login: LoginForm,
    pub token_keys: Vec<String>,
    pub auth_failure: AuthFailurePolicy,
    /// Sleep out the rest of a scene's `duration_ms`
    pub pad_to_duration: bool,
    pub screenshot_dir: PathBuf,
    /// Used by `zoom` steps without an explicit factor
    pub zoom_factor: f64,
    pub mute_microphones: bool,
    /// Readiness for `navigate` steps without `wait`
    pub navigate_readiness: Readiness,
    /// Longest wait per selector during target resolution
    pub probe_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            pacing: PaceTable::default(),
            typing: TypingCadence::default(),
            timeouts: Timeouts::default(),
            login: LoginForm::default(),
            token_keys: DEFAULT_TOKEN_KEYS.iter().map(|k| k.to_string()).collect(),
            auth_failure: AuthFailurePolicy::Abort,
            pad_to_duration: false,
            screenshot_dir: PathBuf::from("recordings/screenshots"),
            zoom_factor: 2.0,
            mute_microphones: true,
            navigate_readiness: Readiness::network_idle(),
            probe_ms: 1_500,
        }
    }
}

impl SequencerConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg: SequencerConfig = serde_yaml::from_str(
            "auth_failure: skip_scene\ntimeouts:\n  selector_ms: 2000\nlogin:\n  submit_selector: '#sign-in'\n",
        )
        .unwrap();
        assert_eq!(cfg.auth_failure, AuthFailurePolicy::SkipScene);
        assert_eq!(cfg.timeouts.selector_ms, 2_000);
        assert_eq!(cfg.timeouts.navigate_ms, 15_000);
        assert_eq!(cfg.login.submit_selector, "#sign-in");
        assert_eq!(cfg.login.username_selector, "#username");
        assert_eq!(cfg.token_keys, vec!["camper_token", "isotto_token", "token"]);
    }
}
