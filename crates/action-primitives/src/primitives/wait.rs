//! Wait primitives - presentation delay and readiness polling
//!
//! `present` exists only to give a viewer time to read the screen.
//! `wait_for` is the synchronisation primitive and always has a deadline.

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, Readiness},
};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Execute present primitive
///
/// Sleeps for `duration`, waking early only on cancellation.
pub async fn execute_present(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    duration: Duration,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    debug!(
        action_id = %ctx.action_id,
        duration_ms = duration.as_millis() as u64,
        "Presentation delay"
    );

    if ctx.is_cancelled() {
        return Err(ActionError::Interrupted("Context cancelled".to_string()));
    }
    primitives.pause(ctx, duration).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    Ok(ActionReport::success(started_at, latency_ms))
}

/// Execute wait_for primitive
///
/// Steps:
/// 1. Check context
/// 2. Poll readiness until met or deadline
/// 3. Capture post-signals
/// 4. Generate action report
pub async fn execute_wait_for(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    readiness: &Readiness,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        readiness = ?readiness,
        timeout_ms = ctx.remaining_time().as_millis() as u64,
        "Executing wait primitive"
    );

    ctx.ensure_live()?;

    if let Err(err) = primitives
        .wait_strategy()
        .wait(primitives.cdp().clone(), ctx, readiness)
        .await
    {
        warn!("Wait condition check failed: {}", err);
        return Err(err);
    }

    let post_signals = primitives.capture_page_signals(ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Wait completed successfully"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::ActionPrimitives;
    use cdp_adapter::stub::StubPage;
    use std::sync::Arc;

    #[tokio::test]
    async fn present_is_cancellable() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let c = ctx(&stub, 10_000);
        let token = c.cancel_token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let started = Instant::now();
        let err = primitives
            .present(&c, Duration::from_secs(5))
            .await
            .expect_err("cancelled");
        assert!(err.is_interrupted());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn wait_for_missing_selector_honours_deadline() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let started = Instant::now();
        let err = primitives
            .wait_for(&ctx(&stub, 250), &Readiness::Selector("#never".into()))
            .await
            .expect_err("timeout");
        assert!(matches!(err, ActionError::WaitTimeout(_)));
        assert!(started.elapsed() < Duration::from_millis(700));
    }
}
