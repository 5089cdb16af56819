//! Action primitives implementation
//!
//! Primitives used by scenes:
//! 1. navigate - load a URL, then poll readiness
//! 2. human_type - focus and type one key at a time
//! 3. click / click_and_wait / click_by_text / find_by_text
//! 4. scroll - page offset or element into view
//! 5. present / wait_for - pacing delay vs readiness polling
//! 6. run_script, set_zoom, clear_session - in-page scripting
//! 7. screenshot - PNG to disk
//! 8. api_fetch_id / read_token - authenticated REST fallback

mod api;
mod click;
mod navigate;
mod script;
mod scroll;
mod snapshot;
mod type_text;
mod wait;

pub use api::{api_fetch_script, token_script, DEFAULT_TOKEN_KEYS};
pub use click::{text_scan_script, DEFAULT_TEXT_SCOPE, TEXT_ANCHOR_ATTR};

use async_trait::async_trait;
use cdp_adapter::{AdapterError, Cdp};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::{
    errors::ActionError,
    types::{
        ActionReport, ApiRequest, ExecCtx, PostSignals, Readiness, ScrollBehavior, ScrollTarget,
        TextMatch, TypingCadence,
    },
    waiting::{PollingWaitStrategy, WaitStrategy},
};

const SIGNALS_SCRIPT: &str =
    "(() => ({ url: window.location.href || null, title: document.title || null }))()";

/// Action primitives trait
///
/// Each primitive is responsible for:
/// - Validating execution context
/// - Executing the action via CDP within the context deadline
/// - Applying readiness waiting if requested
/// - Capturing signals and generating reports
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    /// Navigate to a URL and poll `readiness`
    async fn navigate(
        &self,
        ctx: &ExecCtx,
        url: &str,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError>;

    /// Focus `selector` and type `text` one key at a time
    async fn human_type(
        &self,
        ctx: &ExecCtx,
        selector: &str,
        text: &str,
        clear: bool,
    ) -> Result<ActionReport, ActionError>;

    /// Click the first visible match of `selector`
    async fn click(&self, ctx: &ExecCtx, selector: &str) -> Result<ActionReport, ActionError>;

    /// Click and wait for the navigation it triggers, both awaited together
    async fn click_and_wait(
        &self,
        ctx: &ExecCtx,
        selector: &str,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError>;

    /// Scan `scope` for the first candidate phrase (case-insensitive) and mark the hit
    async fn find_by_text(
        &self,
        ctx: &ExecCtx,
        candidates: &[String],
        scope: Option<&str>,
    ) -> Result<Option<TextMatch>, ActionError>;

    /// `find_by_text` then click; `value` reports whether anything matched
    async fn click_by_text(
        &self,
        ctx: &ExecCtx,
        candidates: &[String],
        scope: Option<&str>,
    ) -> Result<ActionReport, ActionError>;

    async fn scroll(
        &self,
        ctx: &ExecCtx,
        target: &ScrollTarget,
        behavior: ScrollBehavior,
    ) -> Result<ActionReport, ActionError>;

    /// Presentation delay: fixed pacing for the viewer, not synchronisation
    async fn present(&self, ctx: &ExecCtx, duration: Duration)
        -> Result<ActionReport, ActionError>;

    /// Poll `readiness` until met or the context deadline passes
    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError>;

    async fn run_script(&self, ctx: &ExecCtx, source: &str) -> Result<ActionReport, ActionError>;

    async fn screenshot(&self, ctx: &ExecCtx, path: &Path) -> Result<ActionReport, ActionError>;

    /// Authenticated in-page fetch; `value` is the first matching id or null
    async fn api_fetch_id(
        &self,
        ctx: &ExecCtx,
        request: &ApiRequest,
    ) -> Result<ActionReport, ActionError>;

    /// First non-empty session-storage token among `keys`
    async fn read_token(&self, ctx: &ExecCtx, keys: &[String])
        -> Result<ActionReport, ActionError>;

    async fn set_zoom(&self, ctx: &ExecCtx, factor: f64) -> Result<ActionReport, ActionError>;

    /// Clear session/local storage and cookies
    async fn clear_session(&self, ctx: &ExecCtx) -> Result<ActionReport, ActionError>;
}

/// Default implementation of action primitives
pub struct DefaultActionPrimitives {
    /// Page driver
    cdp: Arc<dyn Cdp>,

    /// Wait strategy for readiness polling
    wait_strategy: Arc<dyn WaitStrategy>,

    cadence: TypingCadence,
}

impl DefaultActionPrimitives {
    /// Create a new primitives implementation
    pub fn new(cdp: Arc<dyn Cdp>) -> Self {
        Self {
            cdp,
            wait_strategy: Arc::new(PollingWaitStrategy::default()),
            cadence: TypingCadence::default(),
        }
    }

    pub fn with_wait_strategy(mut self, wait_strategy: Arc<dyn WaitStrategy>) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn with_cadence(mut self, cadence: TypingCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Get reference to the page driver
    pub fn cdp(&self) -> &Arc<dyn Cdp> {
        &self.cdp
    }

    /// Get reference to wait strategy
    pub fn wait_strategy(&self) -> &Arc<dyn WaitStrategy> {
        &self.wait_strategy
    }

    pub fn cadence(&self) -> TypingCadence {
        self.cadence
    }

    /// Run a driver call bounded by the context deadline and cancellation.
    pub(crate) async fn bounded<T, F>(
        &self,
        ctx: &ExecCtx,
        what: &str,
        on_timeout: fn(String) -> ActionError,
        fut: F,
    ) -> Result<T, ActionError>
    where
        F: Future<Output = Result<T, AdapterError>> + Send,
        T: Send,
    {
        let budget = ctx.remaining_time();
        tokio::select! {
            _ = ctx.cancel_token.cancelled() => {
                Err(ActionError::Interrupted(format!("{what} cancelled")))
            }
            result = tokio::time::timeout(budget, fut) => match result {
                Ok(inner) => inner.map_err(ActionError::from),
                Err(_) => Err(on_timeout(format!(
                    "{what} exceeded {}ms",
                    budget.as_millis()
                ))),
            },
        }
    }

    /// Cancellable sleep.
    pub(crate) async fn pause(&self, ctx: &ExecCtx, duration: Duration) -> Result<(), ActionError> {
        tokio::select! {
            _ = ctx.cancel_token.cancelled() => {
                Err(ActionError::Interrupted("Context cancelled".to_string()))
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Capture URL/title signals for observability, logging errors but not failing actions.
    pub async fn capture_page_signals(&self, ctx: &ExecCtx) -> PostSignals {
        let probe = self.cdp.evaluate_script(ctx.page, SIGNALS_SCRIPT);
        let value = match tokio::time::timeout(Duration::from_secs(2), probe).await {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => {
                warn!("failed to capture page signals: {}", err);
                return PostSignals::default();
            }
            Err(_) => {
                warn!("page signal probe timed out");
                return PostSignals::default();
            }
        };

        PostSignals {
            url_after: value
                .get("url")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            title_after: value
                .get("title")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn navigate(
        &self,
        ctx: &ExecCtx,
        url: &str,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError> {
        navigate::execute_navigate(self, ctx, url, readiness).await
    }

    async fn human_type(
        &self,
        ctx: &ExecCtx,
        selector: &str,
        text: &str,
        clear: bool,
    ) -> Result<ActionReport, ActionError> {
        type_text::execute_human_type(self, ctx, selector, text, clear).await
    }

    async fn click(&self, ctx: &ExecCtx, selector: &str) -> Result<ActionReport, ActionError> {
        click::execute_click(self, ctx, selector).await
    }

    async fn click_and_wait(
        &self,
        ctx: &ExecCtx,
        selector: &str,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError> {
        click::execute_click_and_wait(self, ctx, selector, readiness).await
    }

    async fn find_by_text(
        &self,
        ctx: &ExecCtx,
        candidates: &[String],
        scope: Option<&str>,
    ) -> Result<Option<TextMatch>, ActionError> {
        click::execute_find_by_text(self, ctx, candidates, scope).await
    }

    async fn click_by_text(
        &self,
        ctx: &ExecCtx,
        candidates: &[String],
        scope: Option<&str>,
    ) -> Result<ActionReport, ActionError> {
        click::execute_click_by_text(self, ctx, candidates, scope).await
    }

    async fn scroll(
        &self,
        ctx: &ExecCtx,
        target: &ScrollTarget,
        behavior: ScrollBehavior,
    ) -> Result<ActionReport, ActionError> {
        scroll::execute_scroll(self, ctx, target, behavior).await
    }

    async fn present(
        &self,
        ctx: &ExecCtx,
        duration: Duration,
    ) -> Result<ActionReport, ActionError> {
        wait::execute_present(self, ctx, duration).await
    }

    async fn wait_for(
        &self,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<ActionReport, ActionError> {
        wait::execute_wait_for(self, ctx, readiness).await
    }

    async fn run_script(&self, ctx: &ExecCtx, source: &str) -> Result<ActionReport, ActionError> {
        script::execute_run_script(self, ctx, source).await
    }

    async fn screenshot(&self, ctx: &ExecCtx, path: &Path) -> Result<ActionReport, ActionError> {
        snapshot::execute_screenshot(self, ctx, path).await
    }

    async fn api_fetch_id(
        &self,
        ctx: &ExecCtx,
        request: &ApiRequest,
    ) -> Result<ActionReport, ActionError> {
        api::execute_api_fetch_id(self, ctx, request).await
    }

    async fn read_token(
        &self,
        ctx: &ExecCtx,
        keys: &[String],
    ) -> Result<ActionReport, ActionError> {
        api::execute_read_token(self, ctx, keys).await
    }

    async fn set_zoom(&self, ctx: &ExecCtx, factor: f64) -> Result<ActionReport, ActionError> {
        script::execute_set_zoom(self, ctx, factor).await
    }

    async fn clear_session(&self, ctx: &ExecCtx) -> Result<ActionReport, ActionError> {
        script::execute_clear_session(self, ctx).await
    }
}

/// JSON-encode a value for splicing into an in-page expression.
pub(crate) fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ActionError> {
    serde_json::to_string(value)
        .map_err(|err| ActionError::Internal(format!("invalid script argument: {}", err)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use cdp_adapter::stub::StubPage;
    use tokio_util::sync::CancellationToken;

    pub fn primitives_for(stub: &Arc<StubPage>) -> DefaultActionPrimitives {
        DefaultActionPrimitives::new(stub.clone()).with_cadence(TypingCadence {
            focus_settle_ms: 5,
            per_key_ms: 1,
        })
    }

    pub fn ctx(stub: &StubPage, ms: u64) -> ExecCtx {
        ExecCtx::with_timeout(
            stub.page_id(),
            Duration::from_millis(ms),
            CancellationToken::new(),
        )
    }
}
