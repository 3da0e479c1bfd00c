//! serve command - Run the webhook server

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::build_pipeline;
use crate::cli::Context;
use crate::server::{self, AppState};
use crate::webhook::Dispatcher;

/// Run the webhook server until interrupted.
pub fn serve(ctx: &Context, bind: Option<&str>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| ctx.config.bind());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address '{bind}'"))?;

    let secret = ctx.secrets.require_webhook_secret()?.to_string();
    let pipeline = build_pipeline(ctx)?;
    let dispatcher = Dispatcher::from(&ctx.config);
    tracing::info!(
        repo = %pipeline.settings().repo_path.display(),
        branch = %pipeline.settings().integration_branch,
        "serving changelog automation"
    );

    let state = Arc::new(AppState::new(dispatcher, pipeline, secret));
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(server::serve(addr, state))?;
    Ok(())
}
