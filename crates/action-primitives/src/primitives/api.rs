//! REST fallback primitives
//!
//! Both run inside the page so they reuse the application's origin and the
//! bearer token it keeps in `sessionStorage`.

use crate::{
    errors::ActionError,
    primitives::{js_literal, DefaultActionPrimitives},
    types::{ActionReport, ApiRequest, ExecCtx},
};
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Session-storage keys holding the bearer token, in lookup order.
pub const DEFAULT_TOKEN_KEYS: [&str; 3] = ["camper_token", "isotto_token", "token"];

fn effective_keys(keys: &[String]) -> Vec<String> {
    if keys.is_empty() {
        DEFAULT_TOKEN_KEYS.iter().map(|k| k.to_string()).collect()
    } else {
        keys.to_vec()
    }
}

pub fn token_script(keys: &[String]) -> Result<String, ActionError> {
    Ok(format!(
        "(keys => {{\n    for (const key of keys) {{\n        const value = window.sessionStorage.getItem(key);\n        if (value) {{ return value; }}\n    }}\n    return null;\n}})({})",
        js_literal(&effective_keys(keys))?
    ))
}

pub fn api_fetch_script(request: &ApiRequest) -> Result<String, ActionError> {
    Ok(format!(
        "(async (endpoint, keys, field, needle) => {{\n    let token = null;\n    for (const key of keys) {{\n        token = sessionStorage.getItem(key);\n        if (token) {{ break; }}\n    }}\n    if (!token) {{ return {{ status: 'no-token' }}; }}\n    const resp = await fetch(endpoint, {{ headers: {{ Authorization: 'Bearer ' + token }} }});\n    if (!resp.ok) {{ return {{ status: 'http', code: resp.status }}; }}\n    const body = await resp.json();\n    const rows = Array.isArray(body) ? body : (body.items || body.data || body.results || []);\n    const wanted = needle ? needle.toLowerCase() : null;\n    const hit = rows.find(row => !wanted || String((row || {{}})[field] ?? '').toLowerCase().includes(wanted));\n    return {{ status: 'ok', id: hit ? hit.id : null, count: rows.length }};\n}})({endpoint}, {keys}, {field}, {needle})",
        endpoint = js_literal(&request.endpoint)?,
        keys = js_literal(&effective_keys(&request.token_keys))?,
        field = js_literal(&request.field)?,
        needle = js_literal(&request.contains)?,
    ))
}

/// Execute api_fetch_id primitive
///
/// Steps:
/// 1. Check context
/// 2. Run the authenticated fetch in the page
/// 3. Map `no-token` to `AuthMissing`, HTTP failures to `ScriptFailed`
/// 4. Report the first matching id (or null)
pub async fn execute_api_fetch_id(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    request: &ApiRequest,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        endpoint = %request.endpoint,
        field = %request.field,
        contains = ?request.contains,
        "Executing api_fetch_id primitive"
    );

    ctx.ensure_live()?;

    let expression = api_fetch_script(request)?;
    let value = primitives
        .bounded(
            ctx,
            "api fetch",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, &expression),
        )
        .await?;

    match value.get("status").and_then(Value::as_str) {
        Some("ok") => {}
        Some("no-token") => {
            return Err(ActionError::AuthMissing(format!(
                "no bearer token for {}",
                request.endpoint
            )))
        }
        Some("http") => {
            let code = value.get("code").and_then(Value::as_u64).unwrap_or(0);
            return Err(ActionError::ScriptFailed(format!(
                "{} returned HTTP {}",
                request.endpoint, code
            )));
        }
        other => {
            return Err(ActionError::ScriptFailed(format!(
                "unexpected api fetch result: {:?}",
                other
            )))
        }
    }

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let latency_ms = start_instant.elapsed().as_millis() as u64;
    if id.is_null() {
        let rows = value.get("count").and_then(Value::as_u64).unwrap_or(0);
        warn!(
            action_id = %ctx.action_id,
            endpoint = %request.endpoint,
            rows,
            "api lookup matched no row"
        );
    } else {
        debug!(action_id = %ctx.action_id, id = %id, "api lookup resolved id");
    }
    Ok(ActionReport::success(started_at, latency_ms).with_value(id))
}

pub async fn execute_read_token(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    keys: &[String],
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    ctx.ensure_live()?;
    let expression = token_script(keys)?;
    let value = primitives
        .bounded(
            ctx,
            "read token",
            ActionError::WaitTimeout,
            primitives.cdp().evaluate_script(ctx.page, &expression),
        )
        .await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    debug!(action_id = %ctx.action_id, present = !value.is_null(), "session token probed");
    Ok(ActionReport::success(started_at, latency_ms).with_value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::ActionPrimitives;
    use cdp_adapter::stub::StubPage;
    use serde_json::json;
    use std::sync::Arc;

    fn jobs_request(contains: Option<&str>) -> ApiRequest {
        ApiRequest {
            endpoint: "/api/v1/jobs".into(),
            field: "title".into(),
            contains: contains.map(str::to_string),
            token_keys: Vec::new(),
        }
    }

    #[test]
    fn script_defaults_token_keys() {
        let script = api_fetch_script(&jobs_request(Some("Brake"))).unwrap();
        assert!(script.contains(r#"["camper_token","isotto_token","token"]"#));
        assert!(script.contains("\"Brake\""));
        assert!(script.contains("'Bearer '"));
    }

    #[tokio::test]
    async fn resolves_first_matching_id() {
        let stub = Arc::new(StubPage::new().with_script("Bearer", json!({ "status": "ok", "id": 314, "count": 3 })));
        let primitives = primitives_for(&stub);
        let report = primitives
            .api_fetch_id(&ctx(&stub, 1_000), &jobs_request(Some("brake")))
            .await
            .expect("lookup");
        assert_eq!(report.value_str().as_deref(), Some("314"));
    }

    #[tokio::test]
    async fn no_matching_row_reports_null_id() {
        let stub = Arc::new(StubPage::new().with_script("Bearer", json!({ "status": "ok", "id": null, "count": 7 })));
        let primitives = primitives_for(&stub);
        let report = primitives
            .api_fetch_id(&ctx(&stub, 1_000), &jobs_request(Some("nothing like it")))
            .await
            .expect("lookup");
        assert!(report.ok);
        assert_eq!(report.value_str(), None);
    }

    #[tokio::test]
    async fn missing_token_is_auth_error() {
        let stub = Arc::new(StubPage::new().with_script("Bearer", json!({ "status": "no-token" })));
        let primitives = primitives_for(&stub);
        let err = primitives
            .api_fetch_id(&ctx(&stub, 1_000), &jobs_request(None))
            .await
            .expect_err("no token");
        assert!(matches!(err, ActionError::AuthMissing(_)));
    }

    #[tokio::test]
    async fn read_token_returns_stored_value() {
        let stub = Arc::new(StubPage::new().with_script("window.sessionStorage", json!("eyJhbGci")));
        let primitives = primitives_for(&stub);
        let report = primitives
            .read_token(&ctx(&stub, 1_000), &[])
            .await
            .expect("token");
        assert_eq!(report.value_str().as_deref(), Some("eyJhbGci"));
    }
}
