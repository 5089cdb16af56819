//! Click primitives - by selector, by visible text, and click-then-navigate

use crate::{
    errors::ActionError,
    primitives::{js_literal, DefaultActionPrimitives},
    types::{ActionReport, ExecCtx, Readiness, TextMatch},
};
use chrono::Utc;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Elements scanned by text matching when no scope is given.
pub const DEFAULT_TEXT_SCOPE: &str = "a, button, [role=\"tab\"]";

/// Attribute used to address an element found by text scan.
pub const TEXT_ANCHOR_ATTR: &str = "data-reel-anchor";

const NAV_POLL: Duration = Duration::from_millis(100);

/// Execute click primitive
///
/// Steps:
/// 1. Check context
/// 2. Execute CDP click (polls for the element until the deadline)
/// 3. Capture post-signals
/// 4. Generate action report
pub async fn execute_click(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    selector: &str,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        selector = %selector,
        "Executing click primitive"
    );

    ctx.ensure_live()?;

    debug!("Executing CDP click");
    primitives
        .bounded(
            ctx,
            "click",
            ActionError::WaitTimeout,
            primitives
                .cdp()
                .click(ctx.page, selector, ctx.remaining_time()),
        )
        .await?;

    let post_signals = primitives.capture_page_signals(ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;

    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        "Click completed successfully"
    );

    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

/// Execute click_and_wait primitive
///
/// The click and the navigation wait start together and both must finish.
/// The wait side first sees the URL change, then polls `readiness`.
pub async fn execute_click_and_wait(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    selector: &str,
    readiness: &Readiness,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();
    let before = primitives.capture_page_signals(ctx).await.url_after;

    let (_, ()) = tokio::try_join!(
        execute_click(primitives, ctx, selector),
        wait_for_navigation(primitives, ctx, before, readiness),
    )?;

    let post_signals = primitives.capture_page_signals(ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        latency_ms = latency_ms,
        url_after = ?post_signals.url_after,
        "Click and navigation completed"
    );
    Ok(ActionReport::success(started_at, latency_ms).with_signals(post_signals))
}

async fn wait_for_navigation(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    before: Option<String>,
    readiness: &Readiness,
) -> Result<(), ActionError> {
    if let Some(before) = before {
        loop {
            let current = primitives.capture_page_signals(ctx).await.url_after;
            if current.as_deref().is_some_and(|url| url != before) {
                break;
            }
            if ctx.is_timeout() {
                return Err(ActionError::NavTimeout(format!(
                    "no navigation away from {before}"
                )));
            }
            primitives
                .pause(ctx, NAV_POLL.min(ctx.remaining_time()))
                .await?;
        }
    }

    primitives
        .wait_strategy()
        .wait(primitives.cdp().clone(), ctx, readiness)
        .await
}

/// In-page scan for the first candidate phrase, in candidate priority order.
///
/// The hit is tagged with [`TEXT_ANCHOR_ATTR`] so it can be clicked by selector.
pub fn text_scan_script(candidates: &[String], scope: &str) -> Result<String, ActionError> {
    Ok(format!(
        "((candidates, scope) => {{\n    const nodes = Array.from(document.querySelectorAll(scope)).filter(el => {{\n        const r = el.getBoundingClientRect();\n        return r.width > 0 && r.height > 0;\n    }});\n    for (const candidate of candidates) {{\n        const needle = candidate.toLowerCase();\n        const hit = nodes.find(el => (el.innerText || el.value || el.getAttribute('aria-label') || '').toLowerCase().includes(needle));\n        if (hit) {{\n            const token = 'reel-' + Math.random().toString(36).slice(2, 10);\n            hit.setAttribute('{attr}', token);\n            return {{ token, matched: candidate }};\n        }}\n    }}\n    return null;\n}})({candidates}, {scope})",
        attr = TEXT_ANCHOR_ATTR,
        candidates = js_literal(candidates)?,
        scope = js_literal(scope)?,
    ))
}

/// Execute find_by_text primitive
pub async fn execute_find_by_text(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    candidates: &[String],
    scope: Option<&str>,
) -> Result<Option<TextMatch>, ActionError> {
    ctx.ensure_live()?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let scope = scope.unwrap_or(DEFAULT_TEXT_SCOPE);
    let expression = text_scan_script(candidates, scope)?;
    let value = primitives
        .bounded(
            ctx,
            "text scan",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, &expression),
        )
        .await?;

    let token = value.get("token").and_then(Value::as_str);
    match token {
        Some(token) => {
            let matched = value
                .get("matched")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            debug!(action_id = %ctx.action_id, %matched, "text scan matched");
            Ok(Some(TextMatch {
                selector: format!("[{}=\"{}\"]", TEXT_ANCHOR_ATTR, token),
                matched,
            }))
        }
        None => Ok(None),
    }
}

/// Execute click_by_text primitive
///
/// Steps:
/// 1. Scan scope for the candidates in priority order
/// 2. Click the first match in DOM order
/// 3. Report whether a match was found in `value`
pub async fn execute_click_by_text(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    candidates: &[String],
    scope: Option<&str>,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        candidates = ?candidates,
        "Executing click_by_text primitive"
    );

    let Some(hit) = execute_find_by_text(primitives, ctx, candidates, scope).await? else {
        warn!(action_id = %ctx.action_id, candidates = ?candidates, "no element matched any candidate text");
        let latency_ms = start_instant.elapsed().as_millis() as u64;
        return Ok(ActionReport::success(started_at, latency_ms).with_value(Value::Bool(false)));
    };

    primitives
        .bounded(
            ctx,
            "click",
            ActionError::WaitTimeout,
            primitives
                .cdp()
                .click(ctx.page, &hit.selector, ctx.remaining_time()),
        )
        .await?;

    let post_signals = primitives.capture_page_signals(ctx).await;
    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        matched = %hit.matched,
        latency_ms = latency_ms,
        "Click by text completed successfully"
    );
    Ok(ActionReport::success(started_at, latency_ms)
        .with_signals(post_signals)
        .with_value(Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::ActionPrimitives;
    use cdp_adapter::stub::StubPage;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn click_follows_redirect() {
        let stub = Arc::new(StubPage::new().with_redirect("#submit", "Sign in", "/home"));
        let primitives = primitives_for(&stub);
        let c = ctx(&stub, 1_000);
        primitives
            .navigate(&c, "https://example.test/login", &Readiness::None)
            .await
            .unwrap();
        let report = primitives.click(&c, "#submit").await.expect("click");
        assert_eq!(
            report.post_signals.url_after.as_deref(),
            Some("https://example.test/home")
        );
    }

    #[tokio::test]
    async fn click_and_wait_joins_click_with_navigation() {
        let stub = Arc::new(StubPage::new().with_redirect("#go", "Go", "/next"));
        let primitives = primitives_for(&stub);
        let c = ctx(&stub, 2_000);
        primitives
            .navigate(&c, "https://example.test/start", &Readiness::None)
            .await
            .unwrap();
        let report = primitives
            .click_and_wait(&c, "#go", &Readiness::DomReady)
            .await
            .expect("click and wait");
        assert_eq!(
            report.post_signals.url_after.as_deref(),
            Some("https://example.test/next")
        );
    }

    #[tokio::test]
    async fn click_and_wait_times_out_without_navigation() {
        let stub = Arc::new(StubPage::new().with_element("#noop", "Nothing"));
        let primitives = primitives_for(&stub);
        let c = ctx(&stub, 300);
        primitives
            .navigate(&c, "https://example.test/start", &Readiness::None)
            .await
            .unwrap();
        let err = primitives
            .click_and_wait(&c, "#noop", &Readiness::DomReady)
            .await
            .expect_err("no navigation");
        assert!(matches!(err, ActionError::NavTimeout(_) | ActionError::WaitTimeout(_)));
    }

    #[tokio::test]
    async fn click_by_text_clicks_marked_element() {
        let stub = Arc::new(
            StubPage::new()
                .with_script(TEXT_ANCHOR_ATTR, json!({ "token": "reel-1", "matched": "approva" }))
                .with_redirect("[data-reel-anchor=\"reel-1\"]", "Approva", "https://shop.test/approved"),
        );
        let primitives = primitives_for(&stub);
        let report = primitives
            .click_by_text(&ctx(&stub, 1_000), &["approve".into(), "approva".into()], None)
            .await
            .expect("click by text");
        assert!(report.value_bool());
        assert_eq!(stub.url(), "https://shop.test/approved");
    }

    #[tokio::test]
    async fn click_by_text_reports_no_match() {
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let report = primitives
            .click_by_text(&ctx(&stub, 1_000), &["approve".into()], Some("button"))
            .await
            .expect("scan runs");
        assert!(!report.value_bool());
        assert_eq!(stub.calls("click"), 0);
    }

    #[test]
    fn scan_script_embeds_candidates_in_order() {
        let script = text_scan_script(&["Login".into(), "Accedi".into()], DEFAULT_TEXT_SCOPE).unwrap();
        assert!(script.contains(r#"["Login","Accedi"]"#));
        assert!(script.contains(TEXT_ANCHOR_ATTR));
    }
}
