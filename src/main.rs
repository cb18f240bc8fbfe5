//! Relay service binary entrypoint.
//! Boots the Axum HTTP server, wires shared state, and starts the polling scheduler.

use gunbound_rank_relay::{
    api, build_state,
    metrics::Metrics,
    scheduler::{Scheduler, SchedulerCfg},
    AppConfig,
};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gunbound_rank_relay=info,warn"));

    // The hosting runtime may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load()?;
    tracing::info!(
        base_url = %cfg.base_url,
        region = %cfg.region,
        ranking_every = cfg.ranking_interval_secs,
        news_every = cfg.news_interval_secs,
        "config loaded"
    );

    let state = build_state(&cfg).await?;

    let scheduler = Scheduler::start(state.monitor.clone(), SchedulerCfg::from(&cfg));
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler failed");
        }
        scheduler.shutdown().await;
    });

    let mut router = api::with_assets(api::router(state), &cfg.assets_dir);

    if std::env::var("METRICS_ENABLED").ok().as_deref() == Some("1") {
        let metrics = Metrics::install()?;
        router = router.merge(metrics.router());
    }

    Ok(router.into())
}
