//! Target resolver with fallback chain orchestration

use crate::{errors::LocatorError, strategies::*, types::*};
use action_primitives::{ActionPrimitives, ExecCtx, DEFAULT_TOKEN_KEYS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tuning for the built-in strategies
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Longest wait for any single selector to appear
    pub probe: Duration,
    /// Deadline each strategy gets on its own, so a slow strategy never starves the next
    pub strategy_budget: Duration,
    /// Session-storage keys for the API strategy's bearer token
    pub token_keys: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            probe: Duration::from_millis(1500),
            strategy_budget: Duration::from_millis(5000),
            token_keys: DEFAULT_TOKEN_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Runs strategies strictly in order and stops at the first hit
pub struct TargetResolver {
    primitives: Arc<dyn ActionPrimitives>,
    strategies: Vec<Arc<dyn LocateStrategy>>,
    strategy_budget: Duration,
}

impl TargetResolver {
    /// Create a resolver with the five built-in strategies
    pub fn new(primitives: Arc<dyn ActionPrimitives>, options: ResolverOptions) -> Self {
        let strategies: Vec<Arc<dyn LocateStrategy>> = vec![
            Arc::new(SpecificSelectorStrategy::new(options.probe)),
            Arc::new(GenericSelectorStrategy::new(options.probe)),
            Arc::new(TextScanStrategy),
            Arc::new(ApiFallbackStrategy::new(options.token_keys)),
            Arc::new(FirstMatchStrategy::new(options.probe)),
        ];
        Self::with_strategies(primitives, strategies).with_strategy_budget(options.strategy_budget)
    }

    /// Create a resolver with custom strategies; they are re-sorted into fallback order
    pub fn with_strategies(
        primitives: Arc<dyn ActionPrimitives>,
        mut strategies: Vec<Arc<dyn LocateStrategy>>,
    ) -> Self {
        let rank = |kind: StrategyKind| {
            StrategyKind::fallback_chain()
                .iter()
                .position(|k| *k == kind)
                .unwrap_or(usize::MAX)
        };
        strategies.sort_by_key(|s| rank(s.kind()));
        Self {
            primitives,
            strategies,
            strategy_budget: ResolverOptions::default().strategy_budget,
        }
    }

    pub fn with_strategy_budget(mut self, budget: Duration) -> Self {
        self.strategy_budget = budget;
        self
    }

    pub fn primitives(&self) -> &Arc<dyn ActionPrimitives> {
        &self.primitives
    }

    /// `ctx` supplies the page and cancellation; every strategy runs against
    /// its own `strategy_budget` deadline.
    pub async fn resolve(
        &self,
        ctx: &ExecCtx,
        target: &TargetSpec,
    ) -> Result<Resolution, LocatorError> {
        if target.is_empty() {
            return Err(LocatorError::InvalidTarget(format!(
                "target '{}' has no selectors, texts or api lookup",
                target.name
            )));
        }

        info!(target = %target.name, "Resolving target");

        for strategy in &self.strategies {
            if !strategy.applies(target) {
                continue;
            }
            if ctx.is_cancelled() {
                return Err(LocatorError::Cancelled("context cancelled".to_string()));
            }
            debug!("Trying strategy: {}", strategy.name());

            let strategy_ctx = ctx.renewed(self.strategy_budget);
            match strategy
                .resolve(self.primitives.as_ref(), &strategy_ctx, target)
                .await
            {
                Ok(Some(resolution)) => {
                    info!(
                        target = %target.name,
                        strategy = strategy.name(),
                        "Resolved target"
                    );
                    return Ok(resolution);
                }
                Ok(None) => {
                    debug!("Strategy {} found nothing", strategy.name());
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("Strategy {} failed: {}", strategy.name(), err);
                }
            }
        }

        warn!(target = %target.name, "All strategies exhausted");
        Ok(Resolution::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::DefaultActionPrimitives;
    use async_trait::async_trait;
    use cdp_adapter::stub::StubPage;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    fn ctx_for(stub: &StubPage) -> ExecCtx {
        ExecCtx::with_timeout(stub.page_id(), Duration::from_secs(2), CancellationToken::new())
    }

    fn resolver_for(stub: &Arc<StubPage>) -> TargetResolver {
        let primitives: Arc<dyn ActionPrimitives> =
            Arc::new(DefaultActionPrimitives::new(stub.clone()));
        TargetResolver::new(
            primitives,
            ResolverOptions {
                probe: Duration::from_millis(50),
                strategy_budget: Duration::from_millis(500),
                ..ResolverOptions::default()
            },
        )
    }

    fn approve_target() -> TargetSpec {
        TargetSpec {
            name: "approve".into(),
            selectors: vec!["#approve-quote".into()],
            generic: vec!["button.btn-success".into()],
            texts: vec!["approve".into(), "approva".into()],
            api: Some(ApiLookup {
                endpoint: "/api/v1/quotations".into(),
                field: "title".into(),
                contains: Some("brake".into()),
                deep_link: "/quotations/{id}".into(),
            }),
            ..TargetSpec::default()
        }
    }

    struct SpyStrategy {
        kind: StrategyKind,
        hit: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LocateStrategy for SpyStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn applies(&self, _target: &TargetSpec) -> bool {
            true
        }

        async fn resolve(
            &self,
            _primitives: &dyn ActionPrimitives,
            _ctx: &ExecCtx,
            _target: &TargetSpec,
        ) -> Result<Option<Resolution>, LocatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hit.then(|| Resolution::Element {
                selector: self.kind.name().to_string(),
                strategy: self.kind,
            }))
        }
    }

    #[tokio::test]
    async fn specific_hit_short_circuits_the_chain() {
        let stub = Arc::new(
            StubPage::new()
                .with_element("#approve-quote", "Approve")
                .with_element("button.btn-success", "Approve"),
        );
        let resolver = resolver_for(&stub);
        let resolution = resolver
            .resolve(&ctx_for(&stub), &approve_target())
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Element {
                selector: "#approve-quote".into(),
                strategy: StrategyKind::Specific
            }
        );
        let scripts = stub.evaluated_scripts();
        assert!(!scripts.iter().any(|s| s.contains("data-reel-anchor")));
        assert!(!scripts.iter().any(|s| s.contains("Bearer")));
    }

    #[tokio::test]
    async fn falls_through_to_api_deep_link() {
        let stub = Arc::new(
            StubPage::new().with_script("Bearer", json!({ "status": "ok", "id": "q-17", "count": 4 })),
        );
        let resolver = resolver_for(&stub);
        let resolution = resolver
            .resolve(&ctx_for(&stub), &approve_target())
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::ViaFallbackId {
                id: "q-17".into(),
                deep_link: "/quotations/q-17".into(),
                strategy: StrategyKind::Api
            }
        );
    }

    #[tokio::test]
    async fn api_auth_failure_falls_through_to_not_found() {
        let stub = Arc::new(StubPage::new().with_script("Bearer", json!({ "status": "no-token" })));
        let resolver = resolver_for(&stub);
        let resolution = resolver
            .resolve(&ctx_for(&stub), &approve_target())
            .await
            .unwrap();
        assert_eq!(resolution, Resolution::NotFound);
    }

    #[tokio::test]
    async fn first_match_is_only_used_when_configured() {
        let stub = Arc::new(StubPage::new().with_element("table tbody tr", "JOB-1"));
        let resolver = resolver_for(&stub);

        let mut target = TargetSpec::texts(["Brake service"]);
        let without = resolver.resolve(&ctx_for(&stub), &target).await.unwrap();
        assert_eq!(without, Resolution::NotFound);

        target.first_match = Some("table tbody tr".into());
        let with = resolver.resolve(&ctx_for(&stub), &target).await.unwrap();
        assert_eq!(with.strategy(), Some(StrategyKind::FirstMatch));
    }

    #[tokio::test]
    async fn strategies_run_in_fallback_order_and_stop_at_first_hit() {
        let stub = Arc::new(StubPage::new());
        let counters: Vec<Arc<AtomicUsize>> =
            (0..5).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let spies: Vec<Arc<dyn LocateStrategy>> = vec![
            Arc::new(SpyStrategy { kind: StrategyKind::FirstMatch, hit: true, calls: counters[4].clone() }),
            Arc::new(SpyStrategy { kind: StrategyKind::Api, hit: true, calls: counters[3].clone() }),
            Arc::new(SpyStrategy { kind: StrategyKind::Text, hit: true, calls: counters[2].clone() }),
            Arc::new(SpyStrategy { kind: StrategyKind::Generic, hit: false, calls: counters[1].clone() }),
            Arc::new(SpyStrategy { kind: StrategyKind::Specific, hit: false, calls: counters[0].clone() }),
        ];
        let primitives: Arc<dyn ActionPrimitives> =
            Arc::new(DefaultActionPrimitives::new(stub.clone()));
        let resolver = TargetResolver::with_strategies(primitives, spies);

        let resolution = resolver
            .resolve(&ctx_for(&stub), &TargetSpec::selector("#x"))
            .await
            .unwrap();
        assert_eq!(resolution.strategy(), Some(StrategyKind::Text));
        let calls: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(calls, vec![1, 1, 1, 0, 0]);
    }

    #[tokio::test]
    async fn drifted_selectors_leave_time_for_the_text_scan() {
        let stub = Arc::new(
            StubPage::new()
                .with_script("data-reel-anchor", json!({ "token": "reel-1", "matched": "approve" })),
        );
        let primitives: Arc<dyn ActionPrimitives> =
            Arc::new(DefaultActionPrimitives::new(stub.clone()));
        let resolver = TargetResolver::new(
            primitives,
            ResolverOptions {
                probe: Duration::from_millis(60),
                strategy_budget: Duration::from_secs(1),
                ..ResolverOptions::default()
            },
        );
        let target = TargetSpec {
            name: "approve".into(),
            selectors: vec![
                "#approve-quote".into(),
                "#approve".into(),
                "[data-action=approve]".into(),
                "button[name=approve]".into(),
            ],
            texts: vec!["approve".into()],
            ..TargetSpec::default()
        };
        // The caller's own deadline is shorter than the selector probes combined
        let ctx = ExecCtx::with_timeout(
            stub.page_id(),
            Duration::from_millis(150),
            CancellationToken::new(),
        );

        let resolution = resolver.resolve(&ctx, &target).await.unwrap();
        assert_eq!(resolution.strategy(), Some(StrategyKind::Text));
    }

    #[tokio::test]
    async fn empty_target_is_rejected() {
        let stub = Arc::new(StubPage::new());
        let resolver = resolver_for(&stub);
        let err = resolver
            .resolve(&ctx_for(&stub), &TargetSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LocatorError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn cancellation_stops_the_chain() {
        let stub = Arc::new(StubPage::new());
        let resolver = resolver_for(&stub);
        let token = CancellationToken::new();
        let ctx = ExecCtx::with_timeout(stub.page_id(), Duration::from_secs(2), token.clone());
        token.cancel();
        let err = resolver.resolve(&ctx, &approve_target()).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
