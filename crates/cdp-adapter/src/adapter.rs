use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::commands::{Anchor, PrintOptions, Viewport};
use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::ids::PageId;
use crate::metrics;
use crate::transport::{CdpTransport, ChromiumTransport, CommandTarget};
use crate::AdapterMode;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Page-level browser operations consumed by the action layers.
#[async_trait]
pub trait Cdp: Send + Sync {
    async fn navigate(&self, page: PageId, url: &str, deadline: Duration)
        -> Result<(), AdapterError>;
    /// Visible elements matching `selector`, in DOM order.
    async fn query(&self, page: PageId, selector: &str) -> Result<Vec<Anchor>, AdapterError>;
    async fn click(&self, page: PageId, selector: &str, deadline: Duration)
        -> Result<(), AdapterError>;
    async fn focus(&self, page: PageId, selector: &str, deadline: Duration)
        -> Result<(), AdapterError>;
    async fn press_key(&self, page: PageId, key: char) -> Result<(), AdapterError>;
    async fn evaluate_script(&self, page: PageId, expression: &str)
        -> Result<Value, AdapterError>;
    async fn screenshot(&self, page: PageId, deadline: Duration) -> Result<Vec<u8>, AdapterError>;
    async fn print_to_pdf(
        &self,
        page: PageId,
        options: &PrintOptions,
    ) -> Result<Vec<u8>, AdapterError>;
    async fn set_content(&self, page: PageId, html: &str) -> Result<(), AdapterError>;
    async fn clear_cookies(&self, page: PageId) -> Result<(), AdapterError>;
    async fn set_device_metrics(&self, page: PageId, viewport: Viewport)
        -> Result<(), AdapterError>;
    async fn close(&self);
}

/// DevTools-backed implementation of [`Cdp`].
pub struct CdpAdapter {
    cfg: CdpConfig,
    transport: Arc<dyn CdpTransport>,
    sessions: RwLock<HashMap<PageId, String>>,
}

impl CdpAdapter {
    pub fn new(cfg: CdpConfig) -> Self {
        let transport: Arc<dyn CdpTransport> = Arc::new(ChromiumTransport::new(cfg.clone()));
        Self::with_transport(cfg, transport)
    }

    pub fn with_transport(cfg: CdpConfig, transport: Arc<dyn CdpTransport>) -> Self {
        Self {
            cfg,
            transport,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> AdapterMode {
        if self.cfg.websocket_url.is_some() {
            AdapterMode::Attached
        } else {
            AdapterMode::Launched
        }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.cfg
    }

    pub async fn start(&self) -> Result<(), AdapterError> {
        self.transport.start().await?;
        info!(
            target: "cdp-adapter",
            mode = self.mode().as_str(),
            headless = self.cfg.headless,
            "browser transport started"
        );

        if self.cfg.ignore_certificate_errors {
            if let Err(err) = self
                .send_command(
                    "Security.setIgnoreCertificateErrors",
                    json!({ "ignore": true }),
                )
                .await
            {
                warn!(target: "cdp-adapter", %err, "certificate bypass not applied via protocol");
            }
        }
        Ok(())
    }

    /// Create a blank page, attach a flat session to it and prepare its domains.
    pub async fn open_page(&self) -> Result<PageId, AdapterError> {
        let created = self
            .send_command("Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
            })?
            .to_string();

        let attached = self
            .send_command(
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint("attachToTarget missing sessionId")
            })?
            .to_string();

        let page = PageId::new();
        self.register_page(page, session_id).await;

        self.send_page_command(page, "Page.enable", json!({})).await?;
        self.send_page_command(page, "Runtime.enable", json!({})).await?;
        if self.cfg.headless {
            self.set_device_metrics(page, self.cfg.window).await?;
        }

        debug!(target: "cdp-adapter", ?page, %target_id, "page attached");
        Ok(page)
    }

    pub async fn register_page(&self, page: PageId, cdp_session: String) {
        self.sessions.write().await.insert(page, cdp_session);
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        self.dispatch(CommandTarget::Browser, method, params).await
    }

    async fn send_page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let session = self.sessions.read().await.get(&page).cloned();
        match session {
            Some(session) => {
                self.dispatch(CommandTarget::Session(session), method, params)
                    .await
            }
            None => Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("missing cdp session for page {page:?}"))),
        }
    }

    async fn dispatch(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let start = std::time::Instant::now();
        metrics::record_command(method);
        match self.transport.send_command(target, method, params).await {
            Ok(value) => {
                metrics::record_command_success(method, start.elapsed());
                Ok(value)
            }
            Err(err) => {
                metrics::record_command_failure(method, err.is_timeout());
                Err(err)
            }
        }
    }

    /// First visible match, scrolled into the viewport centre.
    async fn locate_for_click(
        &self,
        page: PageId,
        selector: &str,
    ) -> Result<Option<Anchor>, AdapterError> {
        let selector_literal = js_literal(selector)?;
        let expression = format!(
            "(() => {{\n    const el = Array.from(document.querySelectorAll({selector})).find(n => {{ const r = n.getBoundingClientRect(); return r.width > 0 && r.height > 0; }});\n    if (!el) {{ return null; }}\n    el.scrollIntoView({{ block: 'center', inline: 'center' }});\n    const r = el.getBoundingClientRect();\n    return {{ x: r.left + r.width / 2, y: r.top + r.height / 2, width: r.width, height: r.height, text: (el.innerText || '').trim().slice(0, 200) }};\n}})()",
            selector = selector_literal,
        );
        let value = self.evaluate_script(page, &expression).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    async fn dispatch_mouse(&self, page: PageId, kind: &str, anchor: &Anchor) -> Result<(), AdapterError> {
        self.send_page_command(
            page,
            "Input.dispatchMouseEvent",
            json!({
                "type": kind,
                "x": anchor.x,
                "y": anchor.y,
                "button": "left",
                "buttons": 1,
                "clickCount": 1,
                "pointerType": "mouse",
            }),
        )
        .await
        .map(|_| ())
    }
}

/// Bound `fut` by `deadline`, mapping expiry to a retriable `NavTimeout`.
async fn within<T, F>(deadline: Duration, what: &str, fut: F) -> Result<T, AdapterError>
where
    F: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint(format!("{what} exceeded {}ms", deadline.as_millis()))
            .retriable(true)),
    }
}

fn js_literal(value: &str) -> Result<String, AdapterError> {
    serde_json::to_string(value)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

fn decode_data(response: &Value, what: &str) -> Result<Vec<u8>, AdapterError> {
    let data = response
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(format!("missing {what} data"))
        })?;
    STANDARD
        .decode(data)
        .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
}

fn key_params(key: char) -> (Value, Value) {
    let (key_name, text) = match key {
        '\n' | '\r' => ("Enter".to_string(), "\r".to_string()),
        '\t' => ("Tab".to_string(), "\t".to_string()),
        other => (other.to_string(), other.to_string()),
    };
    (
        json!({
            "type": "keyDown",
            "key": key_name,
            "text": text,
            "unmodifiedText": text,
        }),
        json!({ "type": "keyUp", "key": key_name }),
    )
}

#[async_trait]
impl Cdp for CdpAdapter {
    async fn navigate(
        &self,
        page: PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let response = within(
            deadline,
            "Page.navigate",
            self.send_page_command(page, "Page.navigate", json!({ "url": url })),
        )
        .await?;

        if let Some(error_text) = response
            .get("errorText")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed: {error_text}")));
        }
        Ok(())
    }

    async fn query(&self, page: PageId, selector: &str) -> Result<Vec<Anchor>, AdapterError> {
        let selector_literal = js_literal(selector)?;
        let expression = format!(
            "(() => Array.from(document.querySelectorAll({selector}))\n    .map(el => {{ const r = el.getBoundingClientRect(); return {{ x: r.left + r.width / 2, y: r.top + r.height / 2, width: r.width, height: r.height, text: (el.innerText || el.value || '').trim().slice(0, 200) }}; }})\n    .filter(a => a.width > 0 && a.height > 0))()",
            selector = selector_literal,
        );
        let value = self.evaluate_script(page, &expression).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value)
            .map_err(|err| AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string()))
    }

    async fn click(
        &self,
        page: PageId,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let deadline_at = Instant::now() + deadline;
        let anchor = loop {
            if let Some(anchor) = self.locate_for_click(page, selector).await? {
                break anchor;
            }
            if Instant::now() >= deadline_at {
                return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("click target not found for selector '{selector}'")));
            }
            sleep(POLL_INTERVAL).await;
        };

        self.dispatch_mouse(page, "mousePressed", &anchor).await?;
        self.dispatch_mouse(page, "mouseReleased", &anchor).await
    }

    async fn focus(
        &self,
        page: PageId,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), AdapterError> {
        let selector_literal = js_literal(selector)?;
        let expression = format!(
            "(() => {{\n    const el = document.querySelector({selector});\n    if (!el) {{ return {{ status: 'not-found' }}; }}\n    if (typeof el.focus === 'function') {{ el.focus(); }}\n    return {{ status: 'focused' }};\n}})()",
            selector = selector_literal,
        );

        let deadline_at = Instant::now() + deadline;
        loop {
            let value = self.evaluate_script(page, &expression).await?;
            match value.get("status").and_then(Value::as_str) {
                Some("focused") => return Ok(()),
                Some("not-found") if Instant::now() < deadline_at => sleep(POLL_INTERVAL).await,
                Some("not-found") => {
                    return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                        .with_hint(format!("selector '{selector}' not found before deadline")))
                }
                other => {
                    return Err(AdapterError::new(AdapterErrorKind::Internal).with_hint(format!(
                        "failed to focus '{selector}' (status: {other:?})"
                    )))
                }
            }
        }
    }

    async fn press_key(&self, page: PageId, key: char) -> Result<(), AdapterError> {
        let (down, up) = key_params(key);
        self.send_page_command(page, "Input.dispatchKeyEvent", down)
            .await?;
        self.send_page_command(page, "Input.dispatchKeyEvent", up)
            .await
            .map(|_| ())
    }

    async fn evaluate_script(
        &self,
        page: PageId,
        expression: &str,
    ) -> Result<Value, AdapterError> {
        let response = self
            .send_page_command(
                page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "awaitPromise": true,
                    "returnByValue": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            return Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint("evaluate_script raised exception")
                .with_data(details.clone()));
        }

        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn screenshot(&self, page: PageId, deadline: Duration) -> Result<Vec<u8>, AdapterError> {
        let response = within(
            deadline,
            "Page.captureScreenshot",
            self.send_page_command(page, "Page.captureScreenshot", json!({ "format": "png" })),
        )
        .await?;
        decode_data(&response, "screenshot")
    }

    async fn print_to_pdf(
        &self,
        page: PageId,
        options: &PrintOptions,
    ) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .send_page_command(page, "Page.printToPDF", options.to_params())
            .await?;
        decode_data(&response, "pdf")
    }

    async fn set_content(&self, page: PageId, html: &str) -> Result<(), AdapterError> {
        let tree = self
            .send_page_command(page, "Page.getFrameTree", json!({}))
            .await?;
        let frame_id = tree
            .pointer("/frameTree/frame/id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("frame tree missing main frame id")
            })?
            .to_string();

        self.send_page_command(
            page,
            "Page.setDocumentContent",
            json!({ "frameId": frame_id, "html": html }),
        )
        .await
        .map(|_| ())
    }

    async fn clear_cookies(&self, page: PageId) -> Result<(), AdapterError> {
        self.send_page_command(page, "Network.clearBrowserCookies", json!({}))
            .await
            .map(|_| ())
    }

    async fn set_device_metrics(
        &self,
        page: PageId,
        viewport: Viewport,
    ) -> Result<(), AdapterError> {
        self.send_page_command(
            page,
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": viewport.width,
                "height": viewport.height,
                "deviceScaleFactor": viewport.device_scale_factor,
                "mobile": false,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn close(&self) {
        self.sessions.write().await.clear();
        self.transport.shutdown().await;
        info!(target: "cdp-adapter", "browser session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    struct MockTransport {
        started: AtomicBool,
        stopped: AtomicBool,
        commands: Mutex<Vec<(CommandTarget, String, Value)>>,
        responses: Mutex<VecDeque<Value>>,
    }

    impl MockTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                commands: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
            })
        }

        async fn commands(&self) -> Vec<(CommandTarget, String, Value)> {
            self.commands.lock().await.clone()
        }

        async fn methods(&self) -> Vec<String> {
            self.commands()
                .await
                .into_iter()
                .map(|(_, method, _)| method)
                .collect()
        }

        async fn push_response(&self, value: Value) {
            self.responses.lock().await.push_back(value);
        }
    }

    #[async_trait]
    impl CdpTransport for MockTransport {
        async fn start(&self) -> Result<(), AdapterError> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send_command(
            &self,
            target: CommandTarget,
            method: &str,
            params: Value,
        ) -> Result<Value, AdapterError> {
            self.commands
                .lock()
                .await
                .push((target, method.to_string(), params));
            Ok(self
                .responses
                .lock()
                .await
                .pop_front()
                .unwrap_or(Value::Null))
        }

        async fn shutdown(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    /// Transport whose commands never answer.
    struct StalledTransport;

    #[async_trait]
    impl CdpTransport for StalledTransport {
        async fn start(&self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn send_command(
            &self,
            _target: CommandTarget,
            _method: &str,
            _params: Value,
        ) -> Result<Value, AdapterError> {
            futures::future::pending().await
        }

        async fn shutdown(&self) {}
    }

    fn test_config() -> CdpConfig {
        CdpConfig {
            headless: true,
            ignore_certificate_errors: false,
            ..CdpConfig::default()
        }
    }

    async fn adapter_with_page(transport: Arc<MockTransport>) -> (CdpAdapter, PageId) {
        let adapter = CdpAdapter::with_transport(test_config(), transport as Arc<dyn CdpTransport>);
        let page = PageId::new();
        adapter.register_page(page, "mock-session".into()).await;
        (adapter, page)
    }

    #[tokio::test]
    async fn open_page_attaches_flat_session() {
        let transport = MockTransport::new();
        transport.push_response(json!({ "targetId": "T1" })).await;
        transport.push_response(json!({ "sessionId": "S1" })).await;
        let adapter = CdpAdapter::with_transport(test_config(), transport.clone() as Arc<dyn CdpTransport>);

        adapter.start().await.expect("start");
        assert!(transport.started.load(Ordering::SeqCst));
        adapter.open_page().await.expect("open page");

        let commands = transport.commands().await;
        assert_eq!(commands[0].1, "Target.createTarget");
        assert_eq!(commands[1].1, "Target.attachToTarget");
        assert_eq!(commands[1].2["flatten"], true);
        let page_commands: Vec<_> = commands[2..]
            .iter()
            .map(|(target, method, _)| {
                assert_eq!(*target, CommandTarget::Session("S1".into()));
                method.as_str()
            })
            .collect();
        assert_eq!(
            page_commands,
            vec!["Page.enable", "Runtime.enable", "Emulation.setDeviceMetricsOverride"]
        );
    }

    #[tokio::test]
    async fn commands_route_through_transport() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;

        transport.push_response(json!({ "frameId": "F" })).await;
        adapter
            .navigate(page, "https://example.test", Duration::from_secs(5))
            .await
            .expect("navigate through transport");

        transport
            .push_response(json!({ "data": STANDARD.encode("img") }))
            .await;
        let bytes = adapter
            .screenshot(page, Duration::from_secs(5))
            .await
            .expect("screenshot through transport");
        assert_eq!(bytes, b"img");

        let methods = transport.methods().await;
        assert_eq!(methods, vec!["Page.navigate", "Page.captureScreenshot"]);
    }

    #[tokio::test]
    async fn navigate_reports_error_text() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        transport
            .push_response(json!({ "frameId": "F", "errorText": "net::ERR_NAME_NOT_RESOLVED" }))
            .await;
        let err = adapter
            .navigate(page, "https://nowhere.test", Duration::from_secs(5))
            .await
            .expect_err("navigation error");
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
        assert!(err.to_string().contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[tokio::test]
    async fn navigate_honours_deadline() {
        let adapter = CdpAdapter::with_transport(test_config(), Arc::new(StalledTransport));
        let page = PageId::new();
        adapter.register_page(page, "stalled".into()).await;

        let started = std::time::Instant::now();
        let err = adapter
            .navigate(page, "https://slow.test", Duration::from_millis(80))
            .await
            .expect_err("deadline");
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn click_dispatches_mouse_events() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        transport
            .push_response(json!({
                "result": { "value": { "x": 40.0, "y": 20.0, "width": 80.0, "height": 40.0, "text": "Save" } }
            }))
            .await;

        adapter
            .click(page, "#save", Duration::from_secs(1))
            .await
            .expect("click");

        let commands = transport.commands().await;
        let mouse: Vec<_> = commands
            .iter()
            .filter(|(_, method, _)| method == "Input.dispatchMouseEvent")
            .collect();
        assert_eq!(mouse.len(), 2);
        assert_eq!(mouse[0].2["type"], "mousePressed");
        assert_eq!(mouse[1].2["type"], "mouseReleased");
        assert_eq!(mouse[0].2["x"], 40.0);
    }

    #[tokio::test]
    async fn click_times_out_when_selector_missing() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        let err = adapter
            .click(page, "#missing", Duration::from_millis(150))
            .await
            .expect_err("missing target");
        assert_eq!(err.kind, AdapterErrorKind::TargetNotFound);
        assert!(!transport
            .methods()
            .await
            .contains(&"Input.dispatchMouseEvent".to_string()));
    }

    #[tokio::test]
    async fn press_key_sends_down_and_up() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        adapter.press_key(page, 'a').await.expect("key a");
        adapter.press_key(page, '\n').await.expect("enter");

        let commands = transport.commands().await;
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].2["type"], "keyDown");
        assert_eq!(commands[0].2["text"], "a");
        assert_eq!(commands[1].2["type"], "keyUp");
        assert_eq!(commands[2].2["key"], "Enter");
        assert_eq!(commands[2].2["text"], "\r");
    }

    #[tokio::test]
    async fn evaluate_exception_becomes_error() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        transport
            .push_response(json!({
                "result": { "type": "object" },
                "exceptionDetails": { "text": "Uncaught ReferenceError" }
            }))
            .await;
        let err = adapter
            .evaluate_script(page, "nope()")
            .await
            .expect_err("exception");
        assert_eq!(err.kind, AdapterErrorKind::Internal);
        assert_eq!(
            err.data.as_ref().and_then(|d| d.get("text")),
            Some(&json!("Uncaught ReferenceError"))
        );
    }

    #[tokio::test]
    async fn set_content_targets_main_frame() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        transport
            .push_response(json!({ "frameTree": { "frame": { "id": "MAIN" } } }))
            .await;
        adapter
            .set_content(page, "<h1>card</h1>")
            .await
            .expect("set content");

        let commands = transport.commands().await;
        assert_eq!(commands[1].1, "Page.setDocumentContent");
        assert_eq!(commands[1].2["frameId"], "MAIN");
        assert_eq!(commands[1].2["html"], "<h1>card</h1>");
    }

    #[tokio::test]
    async fn print_to_pdf_decodes_payload() {
        let transport = MockTransport::new();
        let (adapter, page) = adapter_with_page(transport.clone()).await;
        transport
            .push_response(json!({ "data": STANDARD.encode("%PDF-1.4") }))
            .await;
        let bytes = adapter
            .print_to_pdf(page, &PrintOptions::a4())
            .await
            .expect("pdf");
        assert!(bytes.starts_with(b"%PDF"));

        let commands = transport.commands().await;
        assert_eq!(commands[0].1, "Page.printToPDF");
        assert_eq!(commands[0].2["printBackground"], true);
    }

    #[tokio::test]
    async fn missing_session_is_reported() {
        let transport = MockTransport::new();
        let adapter = CdpAdapter::with_transport(test_config(), transport as Arc<dyn CdpTransport>);
        let err = adapter
            .clear_cookies(PageId::new())
            .await
            .expect_err("no session");
        assert!(err.to_string().contains("missing cdp session"));
    }

    #[tokio::test]
    async fn close_shuts_transport_down() {
        let transport = MockTransport::new();
        let (adapter, _page) = adapter_with_page(transport.clone()).await;
        adapter.close().await;
        assert!(transport.stopped.load(Ordering::SeqCst));
    }
}
