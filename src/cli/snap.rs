use std::path::{Path, PathBuf};
use std::time::Duration;

use action_flow::resolve_location;
use action_primitives::{ActionPrimitives, DefaultActionPrimitives, ExecCtx, Readiness};
use anyhow::{Context, Result};
use cdp_adapter::Viewport;
use clap::Args;
use reelbrowser_cli::session::close_session;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct SnapArgs {
    /// Page URL or local HTML file
    pub target: String,

    /// PNG file to write
    pub output: PathBuf,

    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Extra settle time after the page is idle, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub wait_ms: u64,

    /// Overall deadline, e.g. "45s" or "2m"
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

pub async fn cmd_snap(args: SnapArgs, ctx: &CliContext) -> Result<()> {
    let url = resolve_location(&args.target, None, Path::new("."))
        .with_context(|| format!("Cannot open '{}'", args.target))?;
    let viewport = Viewport {
        width: args.width,
        height: args.height,
        device_scale_factor: 1.0,
    };

    let session = ctx
        .open_browser(|cfg| {
            cfg.headless = true;
            cfg.window = viewport;
        })
        .await?;
    let primitives = DefaultActionPrimitives::new(session.cdp.clone());
    let exec = ExecCtx::with_timeout(session.page, args.timeout, CancellationToken::new());

    let result = async {
        primitives
            .navigate(&exec, &url, &Readiness::network_idle())
            .await?;
        if args.wait_ms > 0 {
            primitives
                .present(&exec, Duration::from_millis(args.wait_ms))
                .await?;
        }
        primitives.screenshot(&exec, &args.output).await
    }
    .await;
    close_session(&session).await;
    result.with_context(|| format!("Failed to capture {url}"))?;

    info!(output = %args.output.display(), "Snapshot written");
    println!("Saved: {} ({}x{})", args.output.display(), args.width, args.height);
    Ok(())
}
