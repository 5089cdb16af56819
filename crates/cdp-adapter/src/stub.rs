//! In-memory page used by tests in place of a live Chromium.
//!
//! Elements are keyed by the exact selector string the caller will use.
//! Scripts are answered from canned responses matched by substring; a few
//! built-in answers (location/title, document readiness) keep the primitives
//! working without configuration.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::adapter::Cdp;
use crate::commands::{Anchor, PrintOptions, Viewport};
use crate::error::{AdapterError, AdapterErrorKind};
use crate::ids::PageId;

/// First bytes of every screenshot the stub returns.
pub const STUB_PNG: &[u8] = b"\x89PNG\r\n\x1a\nstub";
pub const STUB_PDF: &[u8] = b"%PDF-1.4\n%stub\n";

#[derive(Clone, Debug, PartialEq)]
pub enum ClickEffect {
    /// Absolute URL, or a path resolved against the current origin.
    Redirect(String),
}

#[derive(Clone, Debug, Default)]
pub struct StubElement {
    pub text: String,
    pub on_click: Option<ClickEffect>,
}

#[derive(Default)]
struct StubState {
    url: String,
    title: String,
    elements: Vec<(String, Vec<StubElement>)>,
    values: HashMap<String, String>,
    focused: Option<String>,
    scripts: Vec<(String, Value)>,
    evaluated: Vec<String>,
    content: Option<String>,
    viewport: Option<Viewport>,
    hang_navigation: bool,
    calls: HashMap<&'static str, usize>,
}

impl StubState {
    fn bump(&mut self, op: &'static str) {
        *self.calls.entry(op).or_default() += 1;
    }

    fn elements(&self, selector: &str) -> Option<&Vec<StubElement>> {
        self.elements
            .iter()
            .find(|(key, _)| key == selector)
            .map(|(_, elements)| elements)
            .filter(|elements| !elements.is_empty())
    }

    fn resolve_url(&self, target: &str) -> String {
        if target.contains("://") || !target.starts_with('/') {
            return target.to_string();
        }
        match self.url.find("://") {
            Some(scheme_end) => {
                let rest = &self.url[scheme_end + 3..];
                let host_end = rest.find('/').map(|idx| scheme_end + 3 + idx);
                let origin = host_end.map_or(self.url.as_str(), |end| &self.url[..end]);
                format!("{origin}{target}")
            }
            None => target.to_string(),
        }
    }
}

/// Scripted page implementing [`Cdp`].
pub struct StubPage {
    page: PageId,
    state: Mutex<StubState>,
}

impl Default for StubPage {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPage {
    pub fn new() -> Self {
        Self {
            page: PageId::new(),
            state: Mutex::new(StubState {
                url: "about:blank".to_string(),
                ..StubState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn page_id(&self) -> PageId {
        self.page
    }

    pub fn with_element(self, selector: &str, text: &str) -> Self {
        self.push_element(
            selector,
            StubElement {
                text: text.to_string(),
                on_click: None,
            },
        );
        self
    }

    pub fn with_redirect(self, selector: &str, text: &str, target: &str) -> Self {
        self.push_element(
            selector,
            StubElement {
                text: text.to_string(),
                on_click: Some(ClickEffect::Redirect(target.to_string())),
            },
        );
        self
    }

    /// Answer any script containing `marker` with `response`. Earlier registrations win.
    pub fn with_script(self, marker: &str, response: Value) -> Self {
        self.state().scripts.push((marker.to_string(), response));
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.state().title = title.to_string();
        self
    }

    /// Make every `navigate` call hang forever.
    pub fn hanging_navigation(self) -> Self {
        self.state().hang_navigation = true;
        self
    }

    pub fn push_element(&self, selector: &str, element: StubElement) {
        let mut state = self.state();
        match state.elements.iter_mut().find(|(key, _)| key == selector) {
            Some((_, elements)) => elements.push(element),
            None => state.elements.push((selector.to_string(), vec![element])),
        }
    }

    pub fn remove_element(&self, selector: &str) {
        self.state().elements.retain(|(key, _)| key != selector);
    }

    pub fn url(&self) -> String {
        self.state().url.clone()
    }

    pub fn value_of(&self, selector: &str) -> Option<String> {
        self.state().values.get(selector).cloned()
    }

    pub fn content(&self) -> Option<String> {
        self.state().content.clone()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.state().viewport
    }

    pub fn evaluated_scripts(&self) -> Vec<String> {
        self.state().evaluated.clone()
    }

    /// Number of times the named [`Cdp`] operation ran.
    pub fn calls(&self, op: &str) -> usize {
        self.state().calls.get(op).copied().unwrap_or(0)
    }
}

fn not_found(selector: &str) -> AdapterError {
    AdapterError::new(AdapterErrorKind::TargetNotFound)
        .with_hint(format!("stub has no element for '{selector}'"))
}

#[async_trait]
impl Cdp for StubPage {
    async fn navigate(
        &self,
        _page: PageId,
        url: &str,
        _deadline: Duration,
    ) -> Result<(), AdapterError> {
        let hang = {
            let mut state = self.state();
            state.bump("navigate");
            state.hang_navigation
        };
        if hang {
            return std::future::pending().await;
        }
        let mut state = self.state();
        state.url = state.resolve_url(url);
        state.focused = None;
        Ok(())
    }

    async fn query(&self, _page: PageId, selector: &str) -> Result<Vec<Anchor>, AdapterError> {
        let mut state = self.state();
        state.bump("query");
        let anchors = state
            .elements(selector)
            .map(|elements| {
                elements
                    .iter()
                    .enumerate()
                    .map(|(idx, element)| Anchor {
                        x: 100.0,
                        y: 40.0 + idx as f64 * 48.0,
                        width: 120.0,
                        height: 32.0,
                        text: element.text.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(anchors)
    }

    async fn click(
        &self,
        _page: PageId,
        selector: &str,
        _deadline: Duration,
    ) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.bump("click");
        let effect = state
            .elements(selector)
            .ok_or_else(|| not_found(selector))?
            .first()
            .and_then(|element| element.on_click.clone());
        if let Some(ClickEffect::Redirect(target)) = effect {
            state.url = state.resolve_url(&target);
            state.focused = None;
        }
        Ok(())
    }

    async fn focus(
        &self,
        _page: PageId,
        selector: &str,
        _deadline: Duration,
    ) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.bump("focus");
        if state.elements(selector).is_none() {
            return Err(not_found(selector));
        }
        state.focused = Some(selector.to_string());
        Ok(())
    }

    async fn press_key(&self, _page: PageId, key: char) -> Result<(), AdapterError> {
        let mut state = self.state();
        let focused = state.focused.clone().ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint("no focused element")
        })?;
        // only delivered keystrokes count
        state.bump("press_key");
        state.values.entry(focused).or_default().push(key);
        Ok(())
    }

    async fn evaluate_script(
        &self,
        _page: PageId,
        expression: &str,
    ) -> Result<Value, AdapterError> {
        let mut state = self.state();
        state.bump("evaluate_script");
        state.evaluated.push(expression.to_string());

        if let Some((_, response)) = state
            .scripts
            .iter()
            .find(|(marker, _)| expression.contains(marker.as_str()))
        {
            return Ok(response.clone());
        }
        if expression.contains("window.location.href") {
            return Ok(json!({ "url": state.url, "title": state.title }));
        }
        if expression.contains("document.readyState") {
            return Ok(json!({ "state": "complete", "resources": 0 }));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self, _page: PageId, _deadline: Duration) -> Result<Vec<u8>, AdapterError> {
        self.state().bump("screenshot");
        Ok(STUB_PNG.to_vec())
    }

    async fn print_to_pdf(
        &self,
        _page: PageId,
        _options: &PrintOptions,
    ) -> Result<Vec<u8>, AdapterError> {
        self.state().bump("print_to_pdf");
        Ok(STUB_PDF.to_vec())
    }

    async fn set_content(&self, _page: PageId, html: &str) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.bump("set_content");
        state.content = Some(html.to_string());
        Ok(())
    }

    async fn clear_cookies(&self, _page: PageId) -> Result<(), AdapterError> {
        self.state().bump("clear_cookies");
        Ok(())
    }

    async fn set_device_metrics(
        &self,
        _page: PageId,
        viewport: Viewport,
    ) -> Result<(), AdapterError> {
        let mut state = self.state();
        state.bump("set_device_metrics");
        state.viewport = Some(viewport);
        Ok(())
    }

    async fn close(&self) {
        self.state().bump("close");
    }
}
