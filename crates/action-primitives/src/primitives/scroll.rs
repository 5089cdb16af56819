//! Scroll primitive - Scroll page or element into view

use crate::{
    errors::ActionError,
    primitives::{js_literal, DefaultActionPrimitives},
    types::{ActionReport, ExecCtx, ScrollBehavior, ScrollTarget},
};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const SMOOTH_SETTLE: Duration = Duration::from_millis(300);

/// Execute scroll primitive
///
/// Steps:
/// 1. Check context
/// 2. Build the scroll expression for the target
/// 3. Evaluate it in the page
/// 4. Wait for smooth scroll to settle
/// 5. Capture post-signals and report
pub async fn execute_scroll(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    target: &ScrollTarget,
    behavior: ScrollBehavior,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        target = ?target,
        behavior = ?behavior,
        "Executing scroll primitive"
    );

    ctx.ensure_live()?;

    let expression = scroll_expression(target, behavior)?;
    let value = primitives
        .bounded(
            ctx,
            "scroll",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, &expression),
        )
        .await?;

    if let ScrollTarget::Element { selector } = target {
        match value.get("status").and_then(|v| v.as_str()) {
            Some("ok") => {}
            Some("missing") => {
                return Err(ActionError::AnchorNotFound(format!(
                    "Scroll target element '{}' not found",
                    selector
                )))
            }
            other => {
                return Err(ActionError::ScrollTargetInvalid(format!(
                    "Unexpected element scroll status: {:?}",
                    other
                )))
            }
        }
    }

    if behavior == ScrollBehavior::Smooth {
        debug!("Waiting for smooth scroll animation");
        primitives.pause(ctx, SMOOTH_SETTLE).await?;
    }

    let post_signals = primitives.capture_page_signals(ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Scroll completed successfully"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

fn scroll_expression(target: &ScrollTarget, behavior: ScrollBehavior) -> Result<String, ActionError> {
    let behavior = match behavior {
        ScrollBehavior::Smooth => "smooth",
        ScrollBehavior::Instant => "auto",
    };

    let expression = match target {
        ScrollTarget::Top => format!(
            "(() => {{ window.scrollTo({{ left: 0, top: 0, behavior: '{behavior}' }}); return true; }})()"
        ),
        ScrollTarget::Bottom => format!(
            "(() => {{\n    const scroller = document.scrollingElement || document.documentElement || document.body;\n    const maxY = Math.max((scroller.scrollHeight || 0) - window.innerHeight, 0);\n    window.scrollTo({{ left: 0, top: maxY, behavior: '{behavior}' }});\n    return true;\n}})()"
        ),
        ScrollTarget::Offset { y } => {
            if *y < 0 {
                return Err(ActionError::ScrollTargetInvalid(format!(
                    "negative offset {}",
                    y
                )));
            }
            format!(
                "(() => {{ window.scrollTo({{ left: 0, top: {y}, behavior: '{behavior}' }}); return true; }})()"
            )
        }
        ScrollTarget::Element { selector } => format!(
            "(() => {{\n    const el = document.querySelector({selector});\n    if (!el) {{ return {{ status: 'missing' }}; }}\n    el.scrollIntoView({{ behavior: '{behavior}', block: 'center', inline: 'nearest' }});\n    return {{ status: 'ok' }};\n}})()",
            selector = js_literal(selector)?,
        ),
    };
    Ok(expression)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::ActionPrimitives;
    use cdp_adapter::stub::StubPage;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_scroll_behavior() {
        assert_eq!(ScrollBehavior::default(), ScrollBehavior::Smooth);
    }

    #[test]
    fn offset_expression_uses_absolute_position() {
        let expr = scroll_expression(&ScrollTarget::Offset { y: 600 }, ScrollBehavior::Instant).unwrap();
        assert!(expr.contains("top: 600"));
        assert!(expr.contains("behavior: 'auto'"));
        assert!(scroll_expression(&ScrollTarget::Offset { y: -1 }, ScrollBehavior::Instant).is_err());
    }

    #[tokio::test]
    async fn missing_element_target_is_reported() {
        let stub = Arc::new(StubPage::new().with_script("scrollIntoView", json!({ "status": "missing" })));
        let primitives = primitives_for(&stub);
        let err = primitives
            .scroll(
                &ctx(&stub, 1_000),
                &ScrollTarget::Element { selector: "#footer".into() },
                ScrollBehavior::Instant,
            )
            .await
            .expect_err("missing");
        assert!(matches!(err, ActionError::AnchorNotFound(_)));
    }

    #[tokio::test]
    async fn page_scroll_succeeds() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let report = primitives
            .scroll(&ctx(&stub, 1_000), &ScrollTarget::Bottom, ScrollBehavior::Smooth)
            .await
            .expect("scroll");
        assert!(report.ok);
        assert!(report.latency_ms >= 300);
    }
}
