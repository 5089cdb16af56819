//! Screenshot primitive

use crate::{
    errors::ActionError,
    primitives::DefaultActionPrimitives,
    types::{ActionReport, ExecCtx},
};
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Capture the viewport as PNG and write it to `path`, creating parent directories.
pub async fn execute_screenshot(
    primitives: &DefaultActionPrimitives,
    ctx: &ExecCtx,
    path: &Path,
) -> Result<ActionReport, ActionError> {
    let started_at = Utc::now();
    let start_instant = Instant::now();

    info!(
        action_id = %ctx.action_id,
        path = %path.display(),
        "Executing screenshot primitive"
    );

    ctx.ensure_live()?;

    let bytes = primitives
        .bounded(
            ctx,
            "screenshot",
            ActionError::WaitTimeout,
            primitives
                .cdp()
                .screenshot(ctx.page, ctx.remaining_time()),
        )
        .await?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;

    let latency_ms = start_instant.elapsed().as_millis() as u64;
    info!(
        action_id = %ctx.action_id,
        bytes = bytes.len(),
        latency_ms = latency_ms,
        "Screenshot saved"
    );

    Ok(ActionReport::success(started_at, latency_ms)
        .with_value(Value::String(path.display().to_string())))
}

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::{ctx, primitives_for};
    use crate::ActionPrimitives;
    use cdp_adapter::stub::{StubPage, STUB_PNG};
    use std::sync::Arc;

    #[tokio::test]
    async fn writes_png_into_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shots").join("01-dashboard.png");
        let stub = Arc::new(StubPage::new());
        let primitives = primitives_for(&stub);
        let report = primitives
            .screenshot(&ctx(&stub, 1_000), &path)
            .await
            .expect("screenshot");
        assert_eq!(std::fs::read(&path).unwrap(), STUB_PNG);
        assert_eq!(report.value_str(), Some(path.display().to_string()));
    }
}
