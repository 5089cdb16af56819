//! Operator checkpoints
//!
//! A checkpoint puts a full-screen red card in the browser so the operator can
//! line up the external screen recorder, then blocks until they confirm.

use crate::errors::FlowError;
use async_trait::async_trait;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[async_trait]
pub trait OperatorGate: Send + Sync {
    /// Block until the operator confirms; a refusal is `OperatorAborted`,
    /// a cancelled token is `Cancelled`
    async fn confirm(&self, prompt: &str, cancel: &CancellationToken) -> Result<(), FlowError>;

    /// Visible countdown before recording starts
    async fn countdown(&self, secs: u64, cancel: &CancellationToken) -> Result<(), FlowError>;
}

/// Reads ENTER from stdin
#[derive(Default)]
pub struct TerminalGate;

#[async_trait]
impl OperatorGate for TerminalGate {
    async fn confirm(&self, prompt: &str, cancel: &CancellationToken) -> Result<(), FlowError> {
        print!("  >>> {prompt} ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        let read = tokio::select! {
            _ = cancel.cancelled() => {
                println!();
                return Err(FlowError::Cancelled("checkpoint interrupted".into()));
            }
            read = stdin.read_line(&mut line) => read?,
        };
        if read == 0 {
            return Err(FlowError::OperatorAborted("stdin closed".into()));
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "q" | "quit" | "n" | "no" => Err(FlowError::OperatorAborted(format!(
                "operator answered '{}'",
                line.trim()
            ))),
            _ => Ok(()),
        }
    }

    async fn countdown(&self, secs: u64, cancel: &CancellationToken) -> Result<(), FlowError> {
        let mut out = std::io::stdout();
        for remaining in (1..=secs).rev() {
            write!(out, "\r  >>> Demo starts in {remaining} seconds...  ")?;
            out.flush()?;
            tokio::select! {
                _ = cancel.cancelled() => {
                    writeln!(out)?;
                    return Err(FlowError::Cancelled("countdown interrupted".into()));
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
        }
        writeln!(out, "\r  >>> GO!                              ")?;
        Ok(())
    }
}

/// Confirms immediately; used for unattended runs
#[derive(Default)]
pub struct AutoGate {
    confirmations: AtomicUsize,
}

impl AutoGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmations(&self) -> usize {
        self.confirmations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperatorGate for AutoGate {
    async fn confirm(&self, prompt: &str, cancel: &CancellationToken) -> Result<(), FlowError> {
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled("checkpoint interrupted".into()));
        }
        self.confirmations.fetch_add(1, Ordering::SeqCst);
        info!(%prompt, "checkpoint auto-confirmed");
        Ok(())
    }

    async fn countdown(&self, _secs: u64, cancel: &CancellationToken) -> Result<(), FlowError> {
        if cancel.is_cancelled() {
            return Err(FlowError::Cancelled("countdown interrupted".into()));
        }
        Ok(())
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Red full-screen card shown while the operator checks the recorder
pub fn checkpoint_html(title: &str, subtitle: Option<&str>) -> String {
    let subtitle = subtitle
        .map(|s| {
            format!(
                r#"<div style="font-size:28px;margin-top:40px;background:rgba(0,0,0,0.3);padding:16px 40px;border-radius:8px;">{}</div>"#,
                escape_html(s)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body style="margin:0;background:#DC2626;display:flex;align-items:center;justify-content:center;height:100vh;font-family:sans-serif;">
  <div style="text-align:center;color:white;">
    <div style="font-size:140px;font-weight:900;text-shadow:4px 4px 0 #000;">{title}</div>
    <div style="font-size:56px;margin:40px 0;background:#e67e22;color:#000;padding:24px 80px;border-radius:16px;font-weight:bold;">DO YOU SEE THIS FULLSCREEN IN THE RECORDER?</div>
    <div style="font-size:36px;margin-top:30px;">YES &rarr; start recording, then press ENTER in the terminal</div>
    <div style="font-size:36px;margin-top:10px;">NO &rarr; stop and fix the capture source first</div>
    {subtitle}
  </div>
</body></html>"#,
        title = escape_html(title),
        subtitle = subtitle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_card_escapes_text() {
        let html = checkpoint_html("REC CHECK", Some("Camper & Tour <EP2>"));
        assert!(html.contains("REC CHECK"));
        assert!(html.contains("Camper &amp; Tour &lt;EP2&gt;"));
        assert!(html.contains("#DC2626"));
        assert!(!checkpoint_html("x", None).contains("rgba(0,0,0,0.3)"));
    }

    #[tokio::test]
    async fn auto_gate_counts_and_honours_cancellation() {
        let gate = AutoGate::new();
        let token = CancellationToken::new();
        gate.confirm("ready?", &token).await.unwrap();
        gate.confirm("ready?", &token).await.unwrap();
        assert_eq!(gate.confirmations(), 2);

        gate.countdown(15, &token).await.unwrap();
        token.cancel();
        assert!(matches!(
            gate.confirm("ready?", &token).await,
            Err(FlowError::Cancelled(_))
        ));
        assert_eq!(gate.confirmations(), 2);
        assert!(matches!(
            gate.countdown(15, &token).await,
            Err(FlowError::Cancelled(_))
        ));
    }
}
