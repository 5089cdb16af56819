//! Readiness polling for action primitives

use crate::{
    errors::ActionError,
    types::{ExecCtx, Readiness},
};
use async_trait::async_trait;
use cdp_adapter::Cdp;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::debug;

/// Probe answered by every readiness check that needs document state.
pub const READY_STATE_SCRIPT: &str = "(() => ({ state: document.readyState, resources: performance.getEntriesByType('resource').length }))()";

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Block until `readiness` holds or the context deadline passes
    async fn wait(
        &self,
        cdp: Arc<dyn Cdp>,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<(), ActionError>;
}

/// Polls the page at a fixed interval
pub struct PollingWaitStrategy {
    /// Interval between probes (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for PollingWaitStrategy {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

#[derive(Default)]
struct IdleTracker {
    last_count: Option<u64>,
    stable_since: Option<Instant>,
}

impl IdleTracker {
    fn observe(&mut self, count: u64, quiet: Duration) -> bool {
        if self.last_count != Some(count) {
            self.last_count = Some(count);
            self.stable_since = Some(Instant::now());
            return false;
        }
        self.stable_since
            .map(|since| since.elapsed() >= quiet)
            .unwrap_or(false)
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
impl WaitStrategy for PollingWaitStrategy {
    async fn wait(
        &self,
        cdp: Arc<dyn Cdp>,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<(), ActionError> {
        self.wait_on(cdp.as_ref(), ctx, readiness).await
    }
}

impl PollingWaitStrategy {
    /// Same as [`WaitStrategy::wait`] for callers holding a borrowed driver
    pub async fn wait_on(
        &self,
        cdp: &dyn Cdp,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<(), ActionError> {
        if *readiness == Readiness::None {
            debug!("Readiness::None - no waiting");
            return Ok(());
        }

        let budget = ctx.remaining_time();
        match timeout(budget, self.poll_until(cdp, ctx, readiness)).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::WaitTimeout(format!(
                "{:?} not reached within {}ms",
                readiness,
                budget.as_millis()
            ))),
        }
    }

    async fn poll_until(
        &self,
        cdp: &dyn Cdp,
        ctx: &ExecCtx,
        readiness: &Readiness,
    ) -> Result<(), ActionError> {
        let interval = Duration::from_millis(self.poll_interval_ms);
        let mut idle = IdleTracker::default();

        loop {
            if ctx.is_cancelled() {
                return Err(ActionError::Interrupted("Context cancelled".to_string()));
            }
            if self.probe(cdp, ctx, readiness, &mut idle).await? {
                debug!(action_id = %ctx.action_id, ?readiness, "readiness reached");
                return Ok(());
            }
            if ctx.is_timeout() {
                return Err(ActionError::WaitTimeout(format!(
                    "{:?} not reached before deadline",
                    readiness
                )));
            }
            tokio::select! {
                _ = ctx.cancel_token.cancelled() => {
                    return Err(ActionError::Interrupted("Context cancelled".to_string()));
                }
                _ = sleep(interval.min(ctx.remaining_time())) => {}
            }
        }
    }

    async fn probe(
        &self,
        cdp: &dyn Cdp,
        ctx: &ExecCtx,
        readiness: &Readiness,
        idle: &mut IdleTracker,
    ) -> Result<bool, ActionError> {
        match readiness {
            Readiness::None => Ok(true),
            Readiness::DomReady => {
                let state = document_state(cdp, ctx).await?;
                Ok(matches!(state.0.as_str(), "interactive" | "complete"))
            }
            Readiness::Load => Ok(document_state(cdp, ctx).await?.0 == "complete"),
            Readiness::NetworkIdle { quiet_ms } => {
                let (state, resources) = document_state(cdp, ctx).await?;
                if state != "complete" {
                    *idle = IdleTracker::default();
                    return Ok(false);
                }
                Ok(idle.observe(resources, Duration::from_millis(*quiet_ms)))
            }
            Readiness::Selector(selector) => {
                let anchors = cdp.query(ctx.page, selector).await?;
                Ok(!anchors.is_empty())
            }
            Readiness::Condition(script) => {
                let value = cdp.evaluate_script(ctx.page, script).await?;
                Ok(is_truthy(&value))
            }
        }
    }
}

async fn document_state(cdp: &dyn Cdp, ctx: &ExecCtx) -> Result<(String, u64), ActionError> {
    let value = cdp.evaluate_script(ctx.page, READY_STATE_SCRIPT).await?;
    let state = value
        .get("state")
        .and_then(Value::as_str)
        .unwrap_or("loading")
        .to_string();
    let resources = value.get("resources").and_then(Value::as_u64).unwrap_or(0);
    Ok((state, resources))
}
