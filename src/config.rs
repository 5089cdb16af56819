//! Application configuration
//!
//! Loaded from YAML by the CLI (see `cli::runtime::load_config`). Every
//! section has defaults, so an empty file or a missing file is valid.

use action_flow::SequencerConfig;
use cdp_adapter::{CdpConfig, Viewport};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const API_TOKEN_ENV: &str = "REELBROWSER_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserSettings,
    pub sequencer: SequencerConfig,
    /// Root for run logs and per-run screenshot folders
    pub output_dir: PathBuf,
    pub api: ApiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser: BrowserSettings::default(),
            sequencer: SequencerConfig::default(),
            output_dir: PathBuf::from("./recordings"),
            api: ApiSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// `None` defers to `REELBROWSER_HEADLESS`
    pub headless: Option<bool>,
    pub fullscreen: bool,
    /// `None` defers to `REELBROWSER_CHROME` and PATH detection
    pub executable: Option<PathBuf>,
    pub viewport: Viewport,
    pub ignore_certificate_errors: bool,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: None,
            fullscreen: false,
            executable: None,
            viewport: Viewport::full_hd(),
            ignore_certificate_errors: true,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserSettings {
    pub fn to_cdp_config(&self) -> CdpConfig {
        let mut cfg = CdpConfig::default();
        if let Some(headless) = self.headless {
            cfg.headless = headless;
        }
        if let Some(executable) = &self.executable {
            cfg.executable = executable.clone();
        }
        cfg.fullscreen = self.fullscreen;
        cfg.window = self.viewport;
        cfg.ignore_certificate_errors = self.ignore_certificate_errors;
        cfg.extra_args = self.extra_args.clone();
        cfg
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

impl ApiSettings {
    /// Configured token, else `REELBROWSER_API_TOKEN`
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| env::var(API_TOKEN_ENV).ok())
            .filter(|token| !token.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_flow::AuthFailurePolicy;
    use serial_test::serial;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("./recordings"));
        assert_eq!(cfg.browser.viewport, Viewport::full_hd());
        assert!(cfg.sequencer.mute_microphones);
        assert!(cfg.api.base_url.is_none());
    }

    #[test]
    fn sections_override_independently() {
        let raw = r#"
browser:
  headless: false
  fullscreen: true
  viewport: { width: 1280, height: 720 }
sequencer:
  auth_failure: skip_scene
  pad_to_duration: true
output_dir: /tmp/reels
api:
  base_url: https://helix.local
"#;
        let cfg: Config = serde_yaml::from_str(raw).unwrap();
        let cdp = cfg.browser.to_cdp_config();
        assert!(!cdp.headless);
        assert!(cdp.fullscreen);
        assert_eq!(cdp.window.width, 1280);
        assert_eq!(cdp.window.device_scale_factor, 1.0);
        assert_eq!(cfg.sequencer.auth_failure, AuthFailurePolicy::SkipScene);
        assert!(cfg.sequencer.pad_to_duration);
        assert_eq!(cfg.sequencer.timeouts.navigate_ms, 15_000);
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/reels"));
        assert_eq!(cfg.api.base_url.as_deref(), Some("https://helix.local"));
    }

    #[test]
    #[serial]
    fn token_falls_back_to_environment() {
        let saved = env::var(API_TOKEN_ENV).ok();
        env::set_var(API_TOKEN_ENV, "env-token");

        let from_env = ApiSettings::default().resolve_token();
        let from_file = ApiSettings {
            base_url: None,
            token: Some("file-token".into()),
        }
        .resolve_token();
        let blank = ApiSettings {
            base_url: None,
            token: Some("  ".into()),
        }
        .resolve_token();

        match saved {
            Some(value) => env::set_var(API_TOKEN_ENV, value),
            None => env::remove_var(API_TOKEN_ENV),
        }
        assert_eq!(from_env.as_deref(), Some("env-token"));
        assert_eq!(from_file.as_deref(), Some("file-token"));
        assert_eq!(blank.as_deref(), Some("env-token"));
    }
}
