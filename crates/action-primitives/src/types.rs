//! Core data types for action primitives

use cdp_adapter::PageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::errors::ActionError;

/// Execution context for action primitives
///
/// Contains all the runtime context needed to execute an action:
/// - Page the action drives
/// - Deadline for timeout enforcement
/// - Cancellation token for cooperative cancellation
/// - Unique action ID for tracing and correlation
#[derive(Clone, Debug)]
pub struct ExecCtx {
    /// Target page
    pub page: PageId,

    /// Deadline for this operation
    pub deadline: Instant,

    /// Cancellation token for cooperative cancellation
    pub cancel_token: CancellationToken,

    /// Unique identifier for this action
    pub action_id: String,
}

impl ExecCtx {
    /// Create a new execution context
    pub fn new(page: PageId, deadline: Instant, cancel_token: CancellationToken) -> Self {
        Self {
            page,
            deadline,
            cancel_token,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Context whose deadline is `timeout` from now
    pub fn with_timeout(page: PageId, timeout: Duration, cancel_token: CancellationToken) -> Self {
        Self::new(page, Instant::now() + timeout, cancel_token)
    }

    /// Same page, token and action id with a fresh deadline `timeout` from now
    pub fn renewed(&self, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            ..self.clone()
        }
    }

    /// Check if this context has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Check if this context has exceeded its deadline
    pub fn is_timeout(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Get remaining time until deadline
    pub fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Fail fast when the context is already cancelled or expired
    pub fn ensure_live(&self) -> Result<(), ActionError> {
        if self.is_cancelled() {
            return Err(ActionError::Interrupted("Context cancelled".to_string()));
        }
        if self.is_timeout() {
            return Err(ActionError::WaitTimeout(
                "Context deadline exceeded".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_quiet_ms() -> u64 {
    500
}

/// Page readiness conditions, polled until met or the context deadline passes
///
/// - None: no waiting
/// - DomReady: `readyState` is `interactive` or `complete`
/// - Load: `readyState` is `complete`
/// - NetworkIdle: loaded and the resource-timing count unchanged for `quiet_ms`
/// - Selector: at least one visible element matches
/// - Condition: an in-page expression returns a truthy value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    #[default]
    None,
    DomReady,
    Load,
    NetworkIdle {
        #[serde(default = "default_quiet_ms")]
        quiet_ms: u64,
    },
    Selector(String),
    Condition(String),
}

impl Readiness {
    pub fn network_idle() -> Self {
        Readiness::NetworkIdle {
            quiet_ms: default_quiet_ms(),
        }
    }
}

/// Post-action signals captured after execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostSignals {
    /// URL after action
    pub url_after: Option<String>,

    /// Title after action
    pub title_after: Option<String>,
}

/// Action execution report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReport {
    /// Whether the action succeeded
    pub ok: bool,

    /// When the action started
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    /// When the action finished
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,

    /// Total latency in milliseconds
    pub latency_ms: u64,

    /// Post-execution signals
    pub post_signals: PostSignals,

    /// Extracted value (script result, matched flag, resolved id, written path)
    pub value: Option<Value>,

    /// Error details (if failed)
    pub error: Option<String>,
}

impl ActionReport {
    /// Create a successful action report
    pub fn success(started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            ok: true,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            post_signals: PostSignals::default(),
            value: None,
            error: None,
        }
    }

    /// Create a failed action report
    pub fn failure(started_at: DateTime<Utc>, latency_ms: u64, error: &ActionError) -> Self {
        Self {
            ok: false,
            started_at,
            finished_at: Utc::now(),
            latency_ms,
            post_signals: PostSignals::default(),
            value: None,
            error: Some(error.to_string()),
        }
    }

    /// Add post signals
    pub fn with_signals(mut self, signals: PostSignals) -> Self {
        self.post_signals = signals;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// `value` as a string, accepting JSON strings and numbers
    pub fn value_str(&self) -> Option<String> {
        match self.value.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn value_bool(&self) -> bool {
        self.value.as_ref().and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Scroll target specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollTarget {
    /// Scroll to top of page
    Top,

    /// Scroll to bottom of page
    Bottom,

    /// Scroll to an absolute vertical offset in CSS pixels
    Offset { y: i64 },

    /// Scroll element into view
    Element { selector: String },
}

/// Scroll behavior (smooth vs instant)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    /// Smooth animated scroll
    #[default]
    Smooth,

    /// Instant jump to position
    Instant,
}

/// Keystroke pacing for on-camera typing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingCadence {
    /// Pause after focusing before the first key
    pub focus_settle_ms: u64,
    /// Delay between keystrokes
    pub per_key_ms: u64,
}

impl Default for TypingCadence {
    fn default() -> Self {
        Self {
            focus_settle_ms: 300,
            per_key_ms: 90,
        }
    }
}

impl TypingCadence {
    /// Time needed to type `chars` characters, settle included
    pub fn budget(&self, chars: usize) -> Duration {
        Duration::from_millis(self.focus_settle_ms + self.per_key_ms * chars as u64)
    }
}

/// Authenticated in-page REST lookup returning the first matching id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Absolute URL or same-origin path
    pub endpoint: String,
    /// Row field to match
    pub field: String,
    /// Case-insensitive substring; `None` accepts the first row
    pub contains: Option<String>,
    /// Session-storage keys tried in order for the bearer token
    pub token_keys: Vec<String>,
}

/// Element found by an in-page text scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    /// Attribute selector addressing the marked element
    pub selector: String,
    /// Candidate phrase that matched
    pub matched: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_parses_from_yaml_friendly_json() {
        let dom: Readiness = serde_json::from_str("\"dom_ready\"").unwrap();
        assert_eq!(dom, Readiness::DomReady);
        let idle: Readiness = serde_json::from_str(r#"{"network_idle":{}}"#).unwrap();
        assert_eq!(idle, Readiness::network_idle());
        let selector: Readiness = serde_json::from_str(r##"{"selector":"#grid"}"##).unwrap();
        assert_eq!(selector, Readiness::Selector("#grid".into()));
    }

    #[test]
    fn cancelled_context_is_not_live() {
        let token = CancellationToken::new();
        let ctx = ExecCtx::with_timeout(PageId::new(), Duration::from_secs(5), token.clone());
        assert!(ctx.ensure_live().is_ok());
        token.cancel();
        assert!(matches!(ctx.ensure_live(), Err(ActionError::Interrupted(_))));
    }

    #[test]
    fn report_value_accessors() {
        let report = ActionReport::success(Utc::now(), 1).with_value(serde_json::json!(42));
        assert_eq!(report.value_str().as_deref(), Some("42"));
        assert!(!report.value_bool());
        let flag = ActionReport::success(Utc::now(), 1).with_value(Value::Bool(true));
        assert!(flag.value_bool());
    }

    #[test]
    fn typing_budget_covers_every_key() {
        let cadence = TypingCadence::default();
        assert_eq!(cadence.budget(10), Duration::from_millis(300 + 900));
    }
}
