//! Navigate primitive - Navigate to URL with readiness polling

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx, Readiness},
};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info};

const ALLOWED_SCHEMES: [&str; 4] = ["http://", "https://", "file://", "about:"];

/// Execute navigate primitive
///
/// Steps:
/// 1. Validate URL format
/// 2. Check execution context (not cancelled, not timeout)
/// 3. Issue CDP navigate command within the deadline
/// 4. Poll readiness
/// 5. Capture post-signals (URL, title)
/// 6. Generate action report
pub async fn execute_navigate(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    url: &str,
    readiness: &Readiness,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        url = %url,
        readiness = ?readiness,
        "Executing navigate primitive"
    );

    // 1. Validate URL
    validate_url(url)?;

    // 2. Check context
    if ctx.is_cancelled() {
        return Err(ActionError::Interrupted("Context cancelled".to_string()));
    }

    if ctx.is_timeout() {
        return Err(ActionError::NavTimeout(
            "Context deadline exceeded".to_string(),
        ));
    }

    // 3. Execute CDP navigate
    debug!("Issuing CDP Page.navigate command");
    primitives
        .bounded(
            ctx,
            "navigate",
            ActionError::NavTimeout,
            primitives
                .cdp()
                .navigate(ctx.page, url, ctx.remaining_time()),
        )
        .await?;

    // 4. Readiness
    if *readiness != Readiness::None {
        debug!("Polling readiness: {:?}", readiness);
        primitives
            .wait_strategy()
            .wait(primitives.cdp().clone(), ctx, readiness)
            .await
            .map_err(|err| match err {
                ActionError::WaitTimeout(detail) => ActionError::NavTimeout(detail),
                other => other,
            })?;
    }

    // 5. Capture post-signals
    let post_signals = primitives.capture_page_signals(ctx).await;

    // 6. Generate report
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        url_after = ?post_signals.url_after,
        "Navigate completed successfully"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

pub(crate) fn validate_url(url: &str) -> Result<(), ActionError> {
    if url.is_empty() {
        return Err(ActionError::Internal("URL cannot be empty".to_string()));
    }
    if !ALLOWED_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ActionError::Internal(format!("Invalid URL scheme: {}", url)));
    }
    Ok(())
}
