use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if a recorder is already set.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    /// `/metrics` in Prometheus text format, with the content type scrapers expect.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self.handle.clone())
    }
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_requests_total", "Outbound requests to the scraped site.");
        describe_counter!("scrape_errors_total", "Failed outbound requests to the scraped site.");
        describe_histogram!("scrape_duration_ms", "Latency of one scraped page in milliseconds.");
        describe_counter!("check_runs_total", "Check cycles run, by kind.");
        describe_counter!("check_failures_total", "Check cycles that failed, by kind.");
        describe_counter!("change_events_total", "Changes detected, by kind.");
        describe_counter!("push_sent_total", "Push messages accepted by the provider.");
        describe_counter!("push_failed_total", "Push messages that failed or were skipped.");
        describe_gauge!("snapshot_entries", "Entries in the current snapshot, by kind.");
    });
}
