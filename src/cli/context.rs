use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cdp_adapter::CdpConfig;
use reelbrowser_cli::session::ChromeLauncher;
use reelbrowser_cli::Config;

use super::runtime::LogHandle;

pub struct CliContext {
    config: Arc<Config>,
    config_path: PathBuf,
    logging: LogHandle,
}

impl CliContext {
    pub fn new(config: Config, config_path: PathBuf, logging: LogHandle) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            logging,
        }
    }

    pub fn logging(&self) -> &LogHandle {
        &self.logging
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Browser settings from the config file, adjusted by `tweak`
    pub fn cdp_config(&self, tweak: impl FnOnce(&mut CdpConfig)) -> CdpConfig {
        let mut cfg = self.config.browser.to_cdp_config();
        tweak(&mut cfg);
        cfg
    }

    /// Launch a browser for a one-shot command
    pub async fn open_browser(
        &self,
        tweak: impl FnOnce(&mut CdpConfig),
    ) -> Result<action_flow::LaunchedSession> {
        let launcher = ChromeLauncher::new(self.cdp_config(tweak));
        launcher.open().await.with_context(|| {
            format!(
                "Failed to start Chromium ({}); set REELBROWSER_CHROME to a browser binary",
                launcher.config().executable.display()
            )
        })
    }
}
