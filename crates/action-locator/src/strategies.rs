//! Target resolution strategies
//!
//! Five strategies in fallback order:
//! 1. Specific - selectors observed for this UI
//! 2. Generic - element-type selectors
//! 3. Text - case-insensitive text scan
//! 4. Api - REST lookup to a deep link
//! 5. FirstMatch - explicit substitute, never implicit

use crate::{errors::LocatorError, types::*};
use action_primitives::{ActionError, ActionPrimitives, ApiRequest, ExecCtx, Readiness};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Strategy trait for target resolution
#[async_trait]
pub trait LocateStrategy: Send + Sync {
    /// Get strategy type
    fn kind(&self) -> StrategyKind;

    /// Whether the target configures anything for this strategy
    fn applies(&self, target: &TargetSpec) -> bool;

    /// Attempt to resolve; `Ok(None)` means "no match, try the next strategy"
    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError>;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// Context for one presence probe: the caller's deadline, capped at `probe`.
fn probe_ctx(ctx: &ExecCtx, probe: Duration) -> ExecCtx {
    let capped = Instant::now() + probe.min(ctx.remaining_time());
    ExecCtx::new(ctx.page, capped, ctx.cancel_token.clone())
}

/// First selector (in list order) with a visible match, probing each briefly.
async fn first_present(
    primitives: &dyn ActionPrimitives,
    ctx: &ExecCtx,
    selectors: &[String],
    probe: Duration,
    kind: StrategyKind,
) -> Result<Option<String>, LocatorError> {
    for selector in selectors {
        if selector.trim().is_empty() {
            continue;
        }
        let readiness = Readiness::Selector(selector.clone());
        match primitives.wait_for(&probe_ctx(ctx, probe), &readiness).await {
            Ok(_) => return Ok(Some(selector.clone())),
            Err(ActionError::WaitTimeout(_)) | Err(ActionError::AnchorNotFound(_)) => {
                debug!(strategy = kind.name(), %selector, "selector absent");
            }
            Err(err) => return Err(LocatorError::strategy_failed(kind.name(), &err)),
        }
    }
    Ok(None)
}

/// Specific selector strategy
pub struct SpecificSelectorStrategy {
    probe: Duration,
}

impl SpecificSelectorStrategy {
    pub fn new(probe: Duration) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl LocateStrategy for SpecificSelectorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Specific
    }

    fn applies(&self, target: &TargetSpec) -> bool {
        !target.selectors.is_empty()
    }

    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError> {
        let hit = first_present(primitives, ctx, &target.selectors, self.probe, self.kind()).await?;
        Ok(hit.map(|selector| Resolution::Element {
            selector,
            strategy: self.kind(),
        }))
    }
}

/// Generic element-type selector strategy
pub struct GenericSelectorStrategy {
    probe: Duration,
}

impl GenericSelectorStrategy {
    pub fn new(probe: Duration) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl LocateStrategy for GenericSelectorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Generic
    }

    fn applies(&self, target: &TargetSpec) -> bool {
        !target.generic.is_empty()
    }

    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError> {
        let hit = first_present(primitives, ctx, &target.generic, self.probe, self.kind()).await?;
        Ok(hit.map(|selector| Resolution::Element {
            selector,
            strategy: self.kind(),
        }))
    }
}

/// Text content scan strategy
pub struct TextScanStrategy;

#[async_trait]
impl LocateStrategy for TextScanStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Text
    }

    fn applies(&self, target: &TargetSpec) -> bool {
        !target.texts.is_empty()
    }

    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError> {
        let hit = primitives
            .find_by_text(ctx, &target.texts, target.text_scope.as_deref())
            .await
            .map_err(|err| LocatorError::strategy_failed(self.name(), &err))?;
        Ok(hit.map(|hit| {
            debug!(matched = %hit.matched, "text scan resolved target");
            Resolution::Element {
                selector: hit.selector,
                strategy: self.kind(),
            }
        }))
    }
}

/// REST lookup strategy
pub struct ApiFallbackStrategy {
    token_keys: Vec<String>,
}

impl ApiFallbackStrategy {
    pub fn new(token_keys: Vec<String>) -> Self {
        Self { token_keys }
    }
}

#[async_trait]
impl LocateStrategy for ApiFallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }

    fn applies(&self, target: &TargetSpec) -> bool {
        target.api.is_some()
    }

    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError> {
        let Some(lookup) = target.api.as_ref() else {
            return Ok(None);
        };
        let request = ApiRequest {
            endpoint: lookup.endpoint.clone(),
            field: lookup.field.clone(),
            contains: lookup.contains.clone(),
            token_keys: self.token_keys.clone(),
        };
        let report = primitives
            .api_fetch_id(ctx, &request)
            .await
            .map_err(|err| LocatorError::strategy_failed(self.name(), &err))?;

        Ok(report.value_str().map(|id| Resolution::ViaFallbackId {
            deep_link: lookup.expand(&id),
            id,
            strategy: self.kind(),
        }))
    }
}

/// Explicit substitute strategy: picks whatever `first_match` finds first
pub struct FirstMatchStrategy {
    probe: Duration,
}

impl FirstMatchStrategy {
    pub fn new(probe: Duration) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl LocateStrategy for FirstMatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FirstMatch
    }

    fn applies(&self, target: &TargetSpec) -> bool {
        target.first_match.is_some()
    }

    async fn resolve(
        &self,
        primitives: &dyn ActionPrimitives,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Option<Resolution>, LocatorError> {
        let Some(selector) = target.first_match.clone() else {
            return Ok(None);
        };
        let hit = first_present(primitives, ctx, &[selector], self.probe, self.kind()).await?;
        Ok(hit.map(|selector| {
            warn!(
                target = %target.name,
                %selector,
                "named target not found; substituting the first match"
            );
            Resolution::Element {
                selector,
                strategy: self.kind(),
            }
        }))
    }
}
