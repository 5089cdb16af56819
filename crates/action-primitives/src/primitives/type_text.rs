//! Type text primitive - human-cadence typing into input fields

use crate::{
    errors::ActionError,
    primitives::{js_literal, DefaultActionPrimitives},
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Execute human_type primitive
///
/// Keystrokes are paced for the camera; the pacing is cosmetic.
///
/// Steps:
/// 1. Validate text and context
/// 2. Focus element (polls until present or deadline)
/// 3. Settle pause
/// 4. Clear existing value (optional)
/// 5. Press one key per character with the per-key delay
/// 6. Capture post-signals
/// 7. Generate action report
pub async fn execute_human_type(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    selector: &str,
    text: &str,
    clear: bool,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    let cadence = primitives.cadence();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        text_length = text.chars().count(),
        clear = clear,
        "Executing human_type primitive"
    );

    // 1. Check context
    ctx.ensure_live()?;

    if text.is_empty() {
        return Err(ActionError::Internal("Text cannot be empty".to_string()));
    }

    // 2. Focus
    debug!("Focusing {}", selector);
    primitives
        .bounded(
            ctx,
            "focus",
            ActionError::WaitTimeout,
            primitives
                .cdp()
                .focus(ctx.page, selector, ctx.remaining_time()),
        )
        .await?;

    // 3. Settle
    primitives
        .pause(ctx, Duration::from_millis(cadence.focus_settle_ms))
        .await?;

    // 4. Clear
    if clear {
        let expression = format!(
            "(() => {{\n    const el = document.querySelector({selector});\n    if (!el || !('value' in el)) {{ return false; }}\n    el.value = '';\n    el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n    return true;\n}})()",
            selector = js_literal(selector)?,
        );
        primitives
            .bounded(
                ctx,
                "clear",
                ActionError::WaitTimeout,
                primitives.cdp().evaluate_script(ctx.page, &expression),
            )
            .await?;
    }

    // 5. Keystrokes
    let per_key = Duration::from_millis(cadence.per_key_ms);
    for (idx, ch) in text.chars().enumerate() {
        if idx > 0 {
            primitives.pause(ctx, per_key).await?;
        }
        primitives
            .bounded(
                ctx,
                "press_key",
                ActionError::WaitTimeout,
                primitives.cdp().press_key(ctx.page, ch),
            )
            .await?;
    }

    // 6. Capture post-signals
    let post_signals = primitives.capture_page_signals(ctx).await;

    // 7. Generate report
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Type text completed successfully"
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
    async fn types_every_character_into_focused_field() {
        let stub = Arc::new(StubPage::new().with_element("#username", ""));
        let primitives = primitives_for(&stub);
        primitives
            .human_type(&ctx(&stub, 2_000), "#username", "alice", false)
            .await
            .expect("typed");
        assert_eq!(stub.value_of("#username").as_deref(), Some("alice"));
        assert_eq!(stub.calls("press_key"), 5);
    }

    #[tokio::test]
    async fn missing_field_is_anchor_not_found() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let err = primitives
            .human_type(&ctx(&stub, 500), "#username", "alice", false)
            .await
            .expect_err("no field");
        assert!(matches!(err, ActionError::AnchorNotFound(_)));
        assert_eq!(stub.calls("press_key"), 0);
    }

    #[tokio::test]
    async fn clear_runs_before_typing() {
        let stub = Arc::new(StubPage::new().with_element("#search", ""));
        let primitives = primitives_for(&stub);
        primitives
            .human_type(&ctx(&stub, 2_000), "#search", "AB123", true)
            .await
            .expect("typed");
        assert!(stub
            .evaluated_scripts()
            .iter()
            .any(|script| script.contains("el.value = ''")));
    }
}
