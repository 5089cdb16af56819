//! In-page scripting primitives: arbitrary script, zoom, session reset

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const ZOOM_SETTLE: Duration = Duration::from_millis(300);

const CLEAR_STORAGE_SCRIPT: &str =
    "(() => { try { sessionStorage.clear(); localStorage.clear(); return true; } catch (err) { return false; } })()";

pub async fn execute_run_script(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    source: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        script_length = source.len(),
        "Executing run_script primitive"
    );

    ctx.ensure_live()?;
    let value = primitives
        .bounded(
            ctx,
            "run_script",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, source),
        )
        .await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    debug!(action_id = %ctx.action_id, ?value, "script returned");
    Ok(ActionReport::success(started_at, latency_ms).with_value(value))
}

/// Set `document.body.style.zoom`, then let the layout settle.
pub async fn execute_set_zoom(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    factor: f64,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, factor, "Executing set_zoom primitive");

    ctx.ensure_live()?;
    if !(factor.is_finite() && factor > 0.0) {
        return Err(ActionError::Internal(format!("invalid zoom factor {}", factor)));
    }

    let expression = format!(
        "(() => {{ if (!document.body) {{ return false; }} document.body.style.zoom = '{}'; return true; }})()",
        factor
    );
    primitives
        .bounded(
            ctx,
            "set_zoom",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, &expression),
        )
        .await?;
    primitives.pause(ctx, ZOOM_SETTLE).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    Ok(ActionReport::success(started_at, latency_ms))
}

/// Drop storage and cookies so the next login starts clean.
pub async fn execute_clear_session(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(action_id = %ctx.action_id, "Executing clear_session primitive");

    ctx.ensure_live()?;
    primitives
        .bounded(
            ctx,
            "clear storage",
            ActionError::WaitTimeout,
            primitives
                .cdp()
                .evaluate_script(ctx.page, CLEAR_STORAGE_SCRIPT),
        )
        .await?;
    primitives
        .bounded(
            ctx,
            "clear cookies",
            ActionError::WaitTimeout,
            primitives.cdp().clear_cookies(ctx.page),
        )
        .await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    Ok(ActionReport::success(started_at, latency_ms))
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::{ActionError, ActionPrimitives};
    use cdp_adapter::stub::StubPage;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn run_script_returns_value() {
        let stub = Arc::new(StubPage::new().with_script("rows.length", json!(7)));
        let primitives = primitives_for(&stub);
        let report = primitives
            .run_script(&ctx(&stub, 1_000), "document.querySelectorAll('tr').rows.length")
            .await
            .expect("script");
        assert_eq!(report.value, Some(json!(7)));
    }

    #[tokio::test]
    async fn clear_session_wipes_cookies() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        primitives
            .clear_session(&ctx(&stub, 1_000))
            .await
            .expect("clear");
        assert_eq!(stub.calls("clear_cookies"), 1);
    }

    #[tokio::test]
    async fn zoom_rejects_nonsense_factor() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let err = primitives
            .set_zoom(&ctx(&stub, 1_000), 0.0)
            .await
            .expect_err("zero zoom");
        assert!(matches!(err, ActionError::Internal(_)));
        primitives
            .set_zoom(&ctx(&stub, 1_000), 0.8)
            .await
            .expect("zoom");
        assert!(stub
            .evaluated_scripts()
            .iter()
            .any(|s| s.contains("style.zoom = '0.8'")));
    }
}
