//! Launching the controlled Chromium for a command

use action_flow::{FlowError, LaunchedSession, SessionLauncher};
use action_primitives::{ExecCtx, PollingWaitStrategy, Readiness};
use async_trait::async_trait;
use cdp_adapter::{AdapterError, Cdp, CdpAdapter, CdpConfig, CdpTransport, PageId};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::ReelResult;

const ASSET_DEADLINE: Duration = Duration::from_secs(30);

/// Starts Chromium and opens the single page a command works on
pub struct ChromeLauncher {
    cfg: CdpConfig,
    transport: Option<Arc<dyn CdpTransport>>,
}

impl ChromeLauncher {
    pub fn new(cfg: CdpConfig) -> Self {
        Self {
            cfg,
            transport: None,
        }
    }

    /// Drive a custom transport instead of spawning Chromium
    pub fn with_transport(cfg: CdpConfig, transport: Arc<dyn CdpTransport>) -> Self {
        Self {
            cfg,
            transport: Some(transport),
        }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }

    pub async fn open(&self) -> Result<LaunchedSession, AdapterError> {
        let adapter = Arc::new(match &self.transport {
            Some(transport) => CdpAdapter::with_transport(self.cfg.clone(), transport.clone()),
            None => CdpAdapter::new(self.cfg.clone()),
        });

        adapter.start().await?;
        match adapter.open_page().await {
            Ok(page) => {
                info!(
                    headless = self.cfg.headless,
                    width = self.cfg.window.width,
                    height = self.cfg.window.height,
                    "Browser session ready"
                );
                Ok(LaunchedSession { cdp: adapter, page })
            }
            Err(err) => {
                warn!(error = %err, "Could not open page; closing browser");
                adapter.close().await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<LaunchedSession, FlowError> {
        self.open().await.map_err(|err| {
            FlowError::Launch(format!(
                "{err} (executable: {})",
                self.cfg.executable.display()
            ))
        })
    }
}

/// Close the session's browser; errors are already logged by the adapter
pub async fn close_session(session: &LaunchedSession) {
    session.cdp.close().await;
}

/// Block until the document is loaded and no new resources arrive for the quiet window
pub async fn wait_for_assets(cdp: &dyn Cdp, page: PageId) -> ReelResult<()> {
    settle_within(cdp, page, ASSET_DEADLINE).await
}

async fn settle_within(cdp: &dyn Cdp, page: PageId, deadline: Duration) -> ReelResult<()> {
    let ctx = ExecCtx::with_timeout(page, deadline, CancellationToken::new());
    PollingWaitStrategy::default()
        .wait_on(cdp, &ctx, &Readiness::network_idle())
        .await
        .map_err(FlowError::from)?;
    debug!("page assets settled");
    Ok(())
}
