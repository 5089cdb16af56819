use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, Message, MethodId, Response};
use futures::{future::BoxFuture, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::util::extract_ws_url;

/// Routing for a single protocol command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

/// Wire-level seam: everything above this trait is protocol-agnostic JSON.
#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn start(&self) -> Result<(), AdapterError>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
    async fn shutdown(&self);
}

type RuntimeFactory = Arc<
    dyn Fn(CdpConfig) -> BoxFuture<'static, Result<Arc<RuntimeState>, AdapterError>> + Send + Sync,
>;

/// Transport backed by a Chromium child process (or an existing websocket endpoint).
#[derive(Clone)]
pub struct ChromiumTransport {
    cfg: CdpConfig,
    state: Arc<Mutex<Option<Arc<RuntimeState>>>>,
    factory: RuntimeFactory,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        let factory: RuntimeFactory = Arc::new(|cfg: CdpConfig| {
            Box::pin(async move {
                let state = RuntimeState::start(cfg).await?;
                Ok(Arc::new(state))
            })
        });

        Self {
            cfg,
            state: Arc::new(Mutex::new(None)),
            factory,
        }
    }

    /// Returns the live runtime, relaunching when the previous one has died.
    async fn runtime(&self) -> Result<Arc<RuntimeState>, AdapterError> {
        let mut guard = self.state.lock().await;

        if let Some(rt) = guard.as_ref() {
            if rt.is_alive() {
                return Ok(rt.clone());
            }
            warn!(target: "cdp-transport", "chromium runtime is gone; relaunching");
        }

        let runtime = (self.factory)(self.cfg.clone()).await?;
        *guard = Some(runtime.clone());
        Ok(runtime)
    }

    #[cfg(test)]
    fn with_factory(cfg: CdpConfig, factory: RuntimeFactory) -> Self {
        Self {
            cfg,
            state: Arc::new(Mutex::new(None)),
            factory,
        }
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        self.runtime().await.map(|_| ())
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let runtime = self.runtime().await?;
        runtime
            .send_internal(
                target,
                method,
                params,
                Duration::from_millis(self.cfg.default_deadline_ms),
            )
            .await
    }

    async fn shutdown(&self) {
        let runtime = self.state.lock().await.take();
        if let Some(runtime) = runtime {
            runtime.terminate().await;
        }
    }
}

struct ControlMessage {
    target: CommandTarget,
    method: String,
    params: Value,
    responder: oneshot::Sender<Result<Value, AdapterError>>,
}

type Inflight = HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>>;

struct RuntimeState {
    command_tx: mpsc::Sender<ControlMessage>,
    loop_task: JoinHandle<()>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl RuntimeState {
    async fn start(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let (child, ws_url) = match cfg.websocket_url.clone() {
            Some(url) => (None, url),
            None => {
                let browser_cfg = Self::browser_config(&cfg)?;
                Self::launch_browser(browser_cfg).await?
            }
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(128);
        let alive = Arc::new(AtomicBool::new(true));
        let loop_alive = alive.clone();

        let loop_task = tokio::spawn(async move {
            let result = Self::run_loop(conn, command_rx).await;
            loop_alive.store(false, Ordering::Relaxed);
            if let Err(err) = result {
                error!(target: "cdp-transport", ?err, "transport loop terminated with error");
            }
        });

        info!(target: "cdp-transport", url = %ws_url, "chromium connection established");

        Ok(Self {
            command_tx,
            loop_task,
            child: Mutex::new(child),
            alive,
        })
    }

    #[cfg(test)]
    fn test_stub() -> (Arc<Self>, Arc<AtomicBool>) {
        let (command_tx, _command_rx) = mpsc::channel(8);
        let alive = Arc::new(AtomicBool::new(true));
        let loop_task = tokio::spawn(futures::future::pending::<()>());

        (
            Arc::new(Self {
                command_tx,
                loop_task,
                child: Mutex::new(None),
                alive: alive.clone(),
            }),
            alive,
        )
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn send_internal(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        let message = ControlMessage {
            target,
            method: method.to_string(),
            params,
            responder: resp_tx,
        };

        self.command_tx
            .send(message)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, resp_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint("command response channel closed")),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{method} timed out"))),
        }
    }

    async fn terminate(&self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();
        if let Some(mut child) = self.child.lock().await.take() {
            match child.kill().await {
                Ok(_) => info!(target: "cdp-transport", "chromium process stopped"),
                Err(err) => warn!(target: "cdp-transport", ?err, "failed to kill chromium child"),
            }
        }
    }

    fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
        if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!(
                    "chrome executable not found at {}",
                    cfg.executable.display()
                ))
                .with_data(json!({
                    "expected": cfg.executable,
                    "hint": "Set REELBROWSER_CHROME to the full path of chrome/chromium."
                })));
        }

        let profile_dir = if cfg.user_data_dir.is_absolute() {
            cfg.user_data_dir.clone()
        } else {
            let cwd = std::env::current_dir().map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("failed to resolve cwd for user-data-dir: {err}"))
            })?;
            cwd.join(&cfg.user_data_dir)
        };
        fs::create_dir_all(&profile_dir).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to ensure user-data-dir: {err}"))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
            .launch_timeout(Duration::from_secs(20));

        if !cfg.headless {
            builder = builder.with_head();
        }

        if std::env::var("REELBROWSER_DISABLE_SANDBOX")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
        {
            builder = builder.no_sandbox();
        }

        builder = builder.args(launch_args(cfg));

        if !cfg.executable.as_os_str().is_empty() {
            builder = builder.chrome_executable(cfg.executable.clone());
        }
        builder = builder.user_data_dir(profile_dir);

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("browser config error: {err}"))
        })
    }

    async fn launch_browser(
        config: BrowserConfig,
    ) -> Result<(Option<Child>, String), AdapterError> {
        let mut child = config.launch().map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("failed to launch chromium: {err}"))
        })?;

        let ws_url = extract_ws_url(&mut child)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        Ok((Some(child), ws_url))
    }

    async fn run_loop(
        mut conn: Connection<CdpEventMessage>,
        mut command_rx: mpsc::Receiver<ControlMessage>,
    ) -> Result<(), AdapterError> {
        let mut inflight = Inflight::new();

        loop {
            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(cmd) => Self::handle_command(&mut conn, cmd, &mut inflight)?,
                        None => {
                            debug!(target: "cdp-transport", "command channel closed");
                            return Ok(());
                        }
                    }
                }
                message = conn.next() => {
                    match message {
                        Some(Ok(Message::Response(resp))) => {
                            Self::handle_response(resp, &mut inflight);
                        }
                        Some(Ok(Message::Event(_))) => {
                            // Pages are driven by polling; protocol events are not consumed.
                            trace!(target: "cdp-transport", "cdp event ignored");
                        }
                        Some(Err(err)) => {
                            let adapter_err = map_cdp_error(err);
                            fail_inflight(&mut inflight, &adapter_err);
                            return Err(adapter_err);
                        }
                        None => {
                            let err = AdapterError::new(AdapterErrorKind::CdpIo)
                                .with_hint("cdp connection closed");
                            fail_inflight(&mut inflight, &err);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    fn handle_command(
        conn: &mut Connection<CdpEventMessage>,
        cmd: ControlMessage,
        inflight: &mut Inflight,
    ) -> Result<(), AdapterError> {
        let session = match cmd.target {
            CommandTarget::Browser => None,
            CommandTarget::Session(session_id) => Some(CdpSessionId::from(session_id)),
        };

        let method_id: MethodId = cmd.method.into();
        match conn.submit_command(method_id, session, cmd.params) {
            Ok(call_id) => {
                inflight.insert(call_id, cmd.responder);
                Ok(())
            }
            Err(err) => {
                let adapter_err =
                    AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
                let _ = cmd.responder.send(Err(adapter_err.clone()));
                Err(adapter_err)
            }
        }
    }

    fn handle_response(resp: Response, inflight: &mut Inflight) {
        let entry = inflight.remove(&resp.id);
        let result = extract_payload(resp);

        if let Some(sender) = entry {
            let _ = sender.send(result);
        }
    }
}

impl Drop for RuntimeState {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.loop_task.abort();

        if let Ok(mut guard) = self.child.try_lock() {
            if let Some(mut child) = guard.take() {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "cdp-transport", ?err, "failed to kill chromium child");
                        }
                    });
                } else {
                    debug!(target: "cdp-transport", "no tokio runtime available to kill chromium child");
                }
            }
        }
    }
}

/// Chromium command-line flags for the recording browser.
pub(crate) fn launch_args(cfg: &CdpConfig) -> Vec<String> {
    let mut args: Vec<String> = [
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-component-update",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--no-first-run",
        "--no-default-browser-check",
        "--password-store=basic",
        "--remote-allow-origins=*",
        "--use-mock-keychain",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    args.push(cfg.window.window_size_arg());
    if cfg.ignore_certificate_errors {
        args.push("--ignore-certificate-errors".to_string());
    }
    if cfg.headless {
        args.push("--headless=new".to_string());
        args.push("--hide-scrollbars".to_string());
        args.push("--mute-audio".to_string());
    } else if cfg.fullscreen {
        args.push("--start-fullscreen".to_string());
    }
    args.extend(cfg.extra_args.iter().cloned());
    args
}

fn fail_inflight(inflight: &mut Inflight, err: &AdapterError) {
    for (_, sender) in inflight.drain() {
        let _ = sender.send(Err(err.clone()));
    }
}

fn extract_payload(resp: Response) -> Result<Value, AdapterError> {
    if let Some(result) = resp.result {
        Ok(result)
    } else if let Some(error) = resp.error {
        let retriable = error.code >= 500;
        Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("cdp error {}: {}", error.code, error.message))
            .retriable(retriable))
    } else {
        Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
    }
}

fn map_cdp_error(err: CdpError) -> AdapterError {
    let hint = err.to_string();
    match err {
        CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint(hint)
            .retriable(true),
        CdpError::Serde(_) | CdpError::JavascriptException(_) => {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(hint)
        }
        _ => AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(hint)
            .retriable(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Viewport;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tokio::sync::Mutex as TokioMutex;

    #[tokio::test]
    async fn recreates_runtime_when_dead() {
        let spawn_count = Arc::new(AtomicUsize::new(0));
        let alive_flags = Arc::new(TokioMutex::new(Vec::<Arc<AtomicBool>>::new()));

        let factory: RuntimeFactory = {
            let spawn_count = spawn_count.clone();
            let alive_flags = alive_flags.clone();
            Arc::new(move |_cfg: CdpConfig| {
                let spawn_count = spawn_count.clone();
                let alive_flags = alive_flags.clone();
                Box::pin(async move {
                    spawn_count.fetch_add(1, AtomicOrdering::SeqCst);
                    let (runtime, alive) = RuntimeState::test_stub();
                    alive_flags.lock().await.push(alive);
                    Ok(runtime)
                })
            })
        };

        let transport = ChromiumTransport::with_factory(CdpConfig::default(), factory);

        let rt1 = transport.runtime().await.expect("runtime #1");
        let again = transport.runtime().await.expect("runtime reused");
        assert!(Arc::ptr_eq(&rt1, &again));
        assert_eq!(spawn_count.load(AtomicOrdering::SeqCst), 1);

        alive_flags.lock().await[0].store(false, AtomicOrdering::SeqCst);

        let rt2 = transport.runtime().await.expect("runtime #2");
        assert_eq!(spawn_count.load(AtomicOrdering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&rt1, &rt2));
    }

    #[tokio::test]
    async fn shutdown_drops_runtime() {
        let factory: RuntimeFactory = Arc::new(|_cfg: CdpConfig| {
            Box::pin(async move { Ok(RuntimeState::test_stub().0) })
        });
        let transport = ChromiumTransport::with_factory(CdpConfig::default(), factory);
        transport.start().await.expect("start");
        transport.shutdown().await;
        assert!(transport.state.lock().await.is_none());
    }

    #[test]
    fn headful_fullscreen_args() {
        let cfg = CdpConfig {
            headless: false,
            fullscreen: true,
            window: Viewport::full_hd(),
            ignore_certificate_errors: true,
            ..CdpConfig::default()
        };
        let args = launch_args(&cfg);
        assert!(args.contains(&"--start-fullscreen".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--ignore-certificate-errors".to_string()));
        assert!(!args.iter().any(|arg| arg.starts_with("--headless")));
    }

    #[test]
    fn headless_ignores_fullscreen() {
        let cfg = CdpConfig {
            headless: true,
            fullscreen: true,
            ignore_certificate_errors: false,
            ..CdpConfig::default()
        };
        let args = launch_args(&cfg);
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(!args.contains(&"--start-fullscreen".to_string()));
        assert!(!args.contains(&"--ignore-certificate-errors".to_string()));
    }
}
