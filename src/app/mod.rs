//! Process wiring: the long-running webhook server and the one-shot CLI path.

pub mod line;
pub mod webhook;

use std::sync::Arc;

use anyhow::Context as _;

use crate::browser::BrowserSource;
use crate::cli::{AskArgs, ServeArgs};
use crate::router::QueryRouter;

/// Start the webhook server: one shared browser, one router, one listener.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = line::LineConfig::from_env().context("load platform credentials")?;

    let source = Arc::new(BrowserSource::launch());
    let router = Arc::new(QueryRouter::new(source));
    let state = webhook::AppState {
        router,
        line: Arc::new(line::LineClient::new(config.channel_access_token)),
        channel_secret: config.channel_secret,
    };

    let app = webhook::app(state);
    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Answer a single query from the terminal. Spins up its own browser and
/// runs the same pipeline the webhook uses.
pub async fn ask(args: AskArgs) -> anyhow::Result<()> {
    let source = Arc::new(BrowserSource::launch());
    let router = QueryRouter::new(source);
    let answer = router.answer(args.text.trim()).await;
    println!("{answer}");
    Ok(())
}
