use std::sync::Arc;

use anyhow::{Context, Result};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tower::ServiceBuilder;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;

mod app_state;
mod config;
mod consts;
mod middleware;
pub mod videogen;

use app_state::AppState;

async fn main_impl(conf: AppConfig) -> Result<()> {
    let shared_state = Arc::new(AppState::new(conf.clone()).await?);

    log::info!(
        "Video generation backend: {:?}, storage: {:?}, provider timeout: {:?}",
        shared_state.generator.provider_kind(),
        conf.storage_mode,
        conf.provider_timeout()
    );

    let sentry_tower_layer = ServiceBuilder::new()
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::with_transaction());

    let http = videogen::app_router(shared_state)
        .layer(axum::middleware::from_fn(
            crate::middleware::http_logging_middleware,
        )) // HTTP logging before Sentry
        .layer(sentry_tower_layer);

    let addr = conf.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    log::info!("listening on {addr}");

    axum::serve(listener, http).await.context("Server error")?;

    Ok(())
}

fn main() -> Result<()> {
    let conf = AppConfig::load()?;

    let _guard = sentry::init((
        conf.sentry_dsn.clone(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: std::env::var("SENTRY_TRACES_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.5),
            send_default_pii: false,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    // Only errors become Sentry events; warnings are kept as breadcrumbs
    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,tower_http=warn,axum::rejection=warn,hyper=warn,reqwest=warn",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(main_impl(conf))
}
