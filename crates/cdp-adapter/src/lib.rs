//! Chromium DevTools Protocol adapter for the scene recorder.
//!
//! The adapter owns one Chromium process and exposes page-level operations
//! (navigate, query, click, type, evaluate, screenshot, print) through the
//! [`Cdp`] trait. Higher layers only ever talk to `Arc<dyn Cdp>`, which lets
//! tests swap the real browser for [`stub::StubPage`].

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};
use which::which;

pub mod ids {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    /// Unique identifier for a page/tab driven by the adapter.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    pub struct PageId(pub Uuid);

    impl PageId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    impl Default for PageId {
        fn default() -> Self {
            Self::new()
        }
    }
}

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }

        pub fn is_timeout(&self) -> bool {
            self.kind == AdapterErrorKind::NavTimeout
        }
    }
}

pub mod config {
    use crate::commands::Viewport;
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{
        env,
        path::{Path, PathBuf},
    };

    /// Configuration for launching and tuning the adapter.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        pub executable: PathBuf,
        pub user_data_dir: PathBuf,
        pub headless: bool,
        /// Headful only: open the window with `--start-fullscreen`.
        pub fullscreen: bool,
        pub window: Viewport,
        pub ignore_certificate_errors: bool,
        pub default_deadline_ms: u64,
        /// Attach to an already running browser instead of launching one.
        pub websocket_url: Option<String>,
        pub extra_args: Vec<String>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: default_chrome_path(),
                user_data_dir: default_profile_dir(),
                headless: resolve_headless_default(),
                fullscreen: false,
                window: Viewport::full_hd(),
                ignore_certificate_errors: true,
                default_deadline_ms: 30_000,
                websocket_url: None,
                extra_args: Vec::new(),
            }
        }
    }

    fn resolve_headless_default() -> bool {
        match env::var("REELBROWSER_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            Err(_) => true,
        }
    }

    fn default_chrome_path() -> PathBuf {
        detect_chrome_executable().unwrap_or_default()
    }

    fn default_profile_dir() -> PathBuf {
        if let Ok(path) = env::var("REELBROWSER_CHROME_PROFILE") {
            return PathBuf::from(path);
        }

        Path::new("./.reelbrowser-profile").into()
    }
}

/// Locate a Chrome/Chromium binary: env override, then `PATH`, then well-known install paths.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("REELBROWSER_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("REELBROWSER_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        return os_specific_chrome_paths()
            .into_iter()
            .find(|candidate| candidate.exists());
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
            PathBuf::from("/snap/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}

/// Where the adapter sends its commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AdapterMode {
    Launched,
    Attached,
}

impl AdapterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterMode::Launched => "launched",
            AdapterMode::Attached => "attached",
        }
    }
}

mod adapter;
pub mod commands;
pub mod metrics;
#[cfg(any(test, feature = "stub"))]
pub mod stub;
pub mod transport;
pub mod util;

pub use adapter::{Cdp, CdpAdapter};
pub use commands::{Anchor, PrintOptions, Viewport};
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use ids::PageId;
pub use metrics::AdapterMetricsSnapshot;
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget};
