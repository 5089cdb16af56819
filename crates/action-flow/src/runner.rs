//! Scene runner
//!
//! Executes one scene's steps strictly in order. A failing step becomes a
//! failed [`StepOutcome`] and the scene carries on; only cancellation, an
//! operator abort and (under [`AuthFailurePolicy::Abort`]) a missing session
//! token escape as errors.

use crate::{
    config::{AuthFailurePolicy, SequencerConfig},
    errors::FlowError,
    gate::{checkpoint_html, OperatorGate},
    runbook::{CredentialTable, Runbook},
    types::{Pace, Scene, SceneReport, SceneStatus, Step, StepOutcome},
};
use action_locator::{Resolution, ResolverOptions, TargetResolver, TargetSpec};
use action_primitives::{
    ActionError, ActionPrimitives, DefaultActionPrimitives, ExecCtx, Readiness, ScrollBehavior,
};
use cdp_adapter::{Cdp, PageId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Slack added to presentation delays so the context deadline never cuts them short
const PACING_SLACK: Duration = Duration::from_secs(1);

pub struct SceneRunner {
    cdp: Arc<dyn Cdp>,
    page: PageId,
    primitives: Arc<dyn ActionPrimitives>,
    resolver: TargetResolver,
    gate: Arc<dyn OperatorGate>,
    config: SequencerConfig,
    credentials: CredentialTable,
    targets: HashMap<String, TargetSpec>,
    base_url: Option<Url>,
    cancel: CancellationToken,
    shot_counter: u32,
    screenshots: Vec<PathBuf>,
}

impl SceneRunner {
    pub fn new(
        cdp: Arc<dyn Cdp>,
        page: PageId,
        runbook: &Runbook,
        config: SequencerConfig,
        gate: Arc<dyn OperatorGate>,
        cancel: CancellationToken,
    ) -> Self {
        let primitives: Arc<dyn ActionPrimitives> =
            Arc::new(DefaultActionPrimitives::new(cdp.clone()).with_cadence(config.typing));
        let resolver = TargetResolver::new(
            primitives.clone(),
            ResolverOptions {
                probe: config.probe(),
                strategy_budget: Duration::from_millis(config.timeouts.selector_ms),
                token_keys: config.token_keys.clone(),
            },
        );
        Self {
            cdp,
            page,
            primitives,
            resolver,
            gate,
            credentials: runbook.credentials.clone(),
            targets: runbook.targets.clone(),
            base_url: runbook.base_url.as_deref().and_then(|raw| Url::parse(raw).ok()),
            config,
            cancel,
            shot_counter: 0,
            screenshots: Vec::new(),
        }
    }

    /// Screenshots written so far, in order
    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    pub fn into_screenshots(self) -> Vec<PathBuf> {
        self.screenshots
    }

    pub async fn run_scene(&mut self, scene: &Scene) -> Result<SceneReport, FlowError> {
        let started = Instant::now();
        let mut report = SceneReport::new(scene);
        report.status = SceneStatus::Running;

        info!(scene = %scene.id, label = %scene.label, steps = scene.steps.len(), "Scene started");

        for (index, step) in scene.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(FlowError::Cancelled(format!("before step {} of scene '{}'", index + 1, scene.id)));
            }

            let step_started = Instant::now();
            let result = self.execute_step(step).await;
            let latency_ms = step_started.elapsed().as_millis() as u64;

            match result {
                Ok(detail) => {
                    info!(scene = %scene.id, step = index + 1, kind = step.kind(), %detail, latency_ms, "Step ok");
                    report.steps.push(StepOutcome {
                        index,
                        kind: step.kind().to_string(),
                        ok: true,
                        detail,
                        latency_ms,
                    });
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(FlowError::AuthenticationFailed(reason))
                    if self.config.auth_failure == AuthFailurePolicy::Abort =>
                {
                    return Err(FlowError::AuthenticationFailed(reason));
                }
                Err(err) => {
                    let auth_failed = matches!(err, FlowError::AuthenticationFailed(_));
                    warn!(scene = %scene.id, step = index + 1, kind = step.kind(), error = %err, "Step failed, continuing");
                    report.steps.push(StepOutcome {
                        index,
                        kind: step.kind().to_string(),
                        ok: false,
                        detail: err.to_string(),
                        latency_ms,
                    });
                    if auth_failed {
                        warn!(scene = %scene.id, "Skipping the rest of the scene");
                        report.skipped = true;
                        break;
                    }
                }
            }
        }

        if self.config.pad_to_duration {
            if let Some(nominal) = scene.duration_ms.map(Duration::from_millis) {
                let elapsed = started.elapsed();
                if nominal > elapsed {
                    let remaining = nominal - elapsed;
                    debug!(scene = %scene.id, pad_ms = remaining.as_millis() as u64, "Padding scene to nominal duration");
                    let ctx = self.ctx(remaining + PACING_SLACK);
                    self.primitives.present(&ctx, remaining).await?;
                }
            }
        }

        report.status = SceneStatus::Completed;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            scene = %scene.id,
            failed = report.failed_steps(),
            elapsed_ms = report.elapsed_ms,
            "Scene completed"
        );
        Ok(report)
    }

    fn ctx(&self, budget: Duration) -> ExecCtx {
        ExecCtx::with_timeout(self.page, budget, self.cancel.clone())
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    async fn execute_step(&mut self, step: &Step) -> Result<String, FlowError> {
        let timeouts = self.config.timeouts;
        match step {
            Step::Navigate { url, wait } => {
                let readiness = wait.clone().unwrap_or_else(|| self.config.navigate_readiness.clone());
                let report = self
                    .primitives
                    .navigate(&self.ctx(Self::ms(timeouts.navigate_ms)), url, &readiness)
                    .await?;
                Ok(report.post_signals.url_after.unwrap_or_else(|| url.clone()))
            }

            Step::Type { selector, text, clear } => {
                let budget = Self::ms(timeouts.selector_ms) + self.config.typing.budget(text.chars().count());
                self.primitives
                    .human_type(&self.ctx(budget), selector, text, *clear)
                    .await?;
                Ok(format!("typed {} chars into {selector}", text.chars().count()))
            }

            Step::Click {
                selector,
                text,
                target,
                wait,
            } => {
                let spec = self.click_target(selector.as_deref(), text, target.as_deref())?;
                self.click(&spec, wait.as_ref()).await
            }

            Step::Scroll { to, smooth } => {
                let behavior = if smooth.unwrap_or(true) {
                    ScrollBehavior::Smooth
                } else {
                    ScrollBehavior::Instant
                };
                self.primitives
                    .scroll(&self.ctx(Self::ms(timeouts.selector_ms)), to, behavior)
                    .await?;
                Ok(format!("scrolled to {to:?}"))
            }

            Step::Wait { ms, pace } => {
                let duration = match (ms, pace) {
                    (Some(ms), _) => Self::ms(*ms),
                    (None, Some(pace)) => self.config.pacing.duration(*pace),
                    (None, None) => self.config.pacing.duration(Pace::Medium),
                };
                self.primitives
                    .present(&self.ctx(duration + PACING_SLACK), duration)
                    .await?;
                Ok(format!("presented for {} ms", duration.as_millis()))
            }

            Step::WaitFor { until, timeout_ms } => {
                let budget = Self::ms(timeout_ms.unwrap_or(timeouts.selector_ms));
                self.primitives.wait_for(&self.ctx(budget), until).await?;
                Ok(format!("{until:?} reached"))
            }

            Step::RunScript { source } => {
                let report = self
                    .primitives
                    .run_script(&self.ctx(Self::ms(timeouts.script_ms)), source)
                    .await?;
                Ok(report
                    .value
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "null".to_string()))
            }

            Step::Screenshot { label } => {
                let path = self.screenshot_path(label);
                self.primitives
                    .screenshot(&self.ctx(Self::ms(timeouts.screenshot_ms)), &path)
                    .await?;
                self.shot_counter += 1;
                self.screenshots.push(path.clone());
                Ok(path.display().to_string())
            }

            Step::Zoom { factor } => {
                let factor = factor.unwrap_or(self.config.zoom_factor);
                self.primitives
                    .set_zoom(&self.ctx(Self::ms(timeouts.script_ms)), factor)
                    .await?;
                Ok(format!("zoom {}%", (factor * 100.0).round()))
            }

            Step::Login { role, verify_token } => self.login(role, *verify_token).await,

            Step::Logout { url } => {
                self.primitives
                    .clear_session(&self.ctx(Self::ms(timeouts.script_ms)))
                    .await?;
                if let Some(url) = url {
                    self.primitives
                        .navigate(
                            &self.ctx(Self::ms(timeouts.navigate_ms)),
                            url,
                            &self.config.navigate_readiness,
                        )
                        .await?;
                }
                Ok("session cleared".to_string())
            }

            Step::Checkpoint {
                title,
                subtitle,
                countdown_secs,
            } => {
                let html = checkpoint_html(title, subtitle.as_deref());
                self.cdp
                    .set_content(self.page, &html)
                    .await
                    .map_err(ActionError::from)?;
                let prompt = "Press ENTER when the recorder shows the red card full screen...";
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return Err(FlowError::Cancelled(format!("checkpoint '{title}' interrupted")));
                    }
                    confirmed = self.gate.confirm(prompt, &self.cancel) => confirmed?,
                }
                if let Some(secs) = countdown_secs.filter(|secs| *secs > 0) {
                    self.gate.countdown(secs, &self.cancel).await?;
                }
                Ok(format!("checkpoint '{title}' confirmed"))
            }
        }
    }

    fn click_target(
        &self,
        selector: Option<&str>,
        texts: &[String],
        target: Option<&str>,
    ) -> Result<TargetSpec, FlowError> {
        if let Some(name) = target {
            let mut spec = self
                .targets
                .get(name)
                .cloned()
                .ok_or_else(|| FlowError::InvalidRunbook(format!("unknown target '{name}'")))?;
            if spec.name.is_empty() {
                spec.name = name.to_string();
            }
            return Ok(spec);
        }

        let mut spec = TargetSpec::texts(texts.iter().cloned());
        if let Some(selector) = selector {
            spec.name = selector.to_string();
            spec.selectors.push(selector.to_string());
        }
        Ok(spec)
    }

    async fn click(
        &self,
        spec: &TargetSpec,
        wait: Option<&Readiness>,
    ) -> Result<String, FlowError> {
        let timeouts = self.config.timeouts;
        let resolution = self
            .resolver
            .resolve(&self.ctx(Self::ms(timeouts.selector_ms)), spec)
            .await?;

        match resolution {
            Resolution::Element { selector, strategy } => {
                match wait {
                    Some(readiness) => {
                        self.primitives
                            .click_and_wait(&self.ctx(Self::ms(timeouts.navigate_ms)), &selector, readiness)
                            .await?
                    }
                    None => {
                        self.primitives
                            .click(&self.ctx(Self::ms(timeouts.selector_ms)), &selector)
                            .await?
                    }
                };
                Ok(format!("clicked {selector} via {}", strategy.name()))
            }
            Resolution::ViaFallbackId { id, deep_link, .. } => {
                let url = self.deep_link_url(&deep_link).await?;
                info!(target = %spec.name, %id, %url, "Opening deep link from API lookup");
                self.primitives
                    .navigate(
                        &self.ctx(Self::ms(timeouts.navigate_ms)),
                        &url,
                        wait.unwrap_or(&self.config.navigate_readiness),
                    )
                    .await?;
                Ok(format!("opened {url} (id {id})"))
            }
            Resolution::NotFound => Err(FlowError::TargetNotFound(spec.name.clone())),
        }
    }

    /// Deep links are joined to the runbook's base URL, else to the current page
    async fn deep_link_url(&self, deep_link: &str) -> Result<String, FlowError> {
        let base = match &self.base_url {
            Some(base) => Some(base.clone()),
            None => self
                .primitives
                .wait_for(&self.ctx(Self::ms(self.config.timeouts.script_ms)), &Readiness::None)
                .await?
                .post_signals
                .url_after
                .and_then(|raw| Url::parse(&raw).ok()),
        };
        match base {
            Some(base) => base
                .join(deep_link)
                .map(String::from)
                .map_err(|err| FlowError::InvalidRunbook(format!("deep link '{deep_link}': {err}"))),
            None => Url::parse(deep_link)
                .map(String::from)
                .map_err(|err| FlowError::InvalidRunbook(format!("deep link '{deep_link}': {err}"))),
        }
    }

    /// Path of the next screenshot; numbering counts only written files
    fn screenshot_path(&self, label: &str) -> PathBuf {
        let slug: String = label
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '-' })
            .collect();
        self.config
            .screenshot_dir
            .join(format!("{:02}-{}.png", self.shot_counter + 1, slug.trim_matches('-')))
    }

    async fn login(&self, role: &str, verify_token: bool) -> Result<String, FlowError> {
        let credential = self
            .credentials
            .get(role)
            .cloned()
            .ok_or_else(|| FlowError::InvalidRunbook(format!("no credentials for role '{role}'")))?;
        let form = self.config.login.clone();
        let timeouts = self.config.timeouts;

        // The application's own "log in" link, if it shows one.
        match self
            .primitives
            .click_by_text(&self.ctx(Self::ms(timeouts.selector_ms)), &form.entry_texts, None)
            .await
        {
            Ok(report) if report.value_bool() => {
                let settle = Self::ms(form.entry_settle_ms);
                self.primitives.present(&self.ctx(settle + PACING_SLACK), settle).await?;
            }
            Ok(_) => debug!("no login entry link; expecting the form directly"),
            Err(ActionError::Interrupted(reason)) => return Err(FlowError::Cancelled(reason)),
            Err(err) => warn!(error = %err, "login entry click failed, trying the form directly"),
        }

        let form_ready = self
            .primitives
            .wait_for(
                &self.ctx(Self::ms(form.form_timeout_ms)),
                &Readiness::Selector(form.username_selector.clone()),
            )
            .await;

        let submitted = match form_ready {
            Ok(_) => {
                let type_budget = |text: &str| {
                    Self::ms(timeouts.selector_ms) + self.config.typing.budget(text.chars().count())
                };
                self.primitives
                    .human_type(
                        &self.ctx(type_budget(&credential.username)),
                        &form.username_selector,
                        &credential.username,
                        true,
                    )
                    .await?;
                self.primitives
                    .human_type(
                        &self.ctx(type_budget(&credential.password)),
                        &form.password_selector,
                        &credential.password,
                        true,
                    )
                    .await?;
                self.primitives
                    .click(&self.ctx(Self::ms(timeouts.selector_ms)), &form.submit_selector)
                    .await?;
                info!(role, user = %credential.username, "Credentials submitted, waiting for redirect");
                let settle = Self::ms(form.submit_settle_ms);
                self.primitives.present(&self.ctx(settle + PACING_SLACK), settle).await?;
                true
            }
            Err(ActionError::Interrupted(reason)) => return Err(FlowError::Cancelled(reason)),
            Err(err) => {
                warn!(error = %err, "login form not found; may already be authenticated");
                false
            }
        };

        if verify_token {
            let report = self
                .primitives
                .read_token(&self.ctx(Self::ms(timeouts.script_ms)), &self.config.token_keys)
                .await?;
            if report.value_str().is_none() {
                return Err(FlowError::AuthenticationFailed(format!(
                    "no session token after logging in as '{role}'"
                )));
            }
        }

        Ok(if submitted {
            format!("logged in as {role} ({})", credential.username)
        } else {
            format!("login form absent for {role}")
        })
    }
}
