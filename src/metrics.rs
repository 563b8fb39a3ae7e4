use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

pub const RATINGS_SUBMITTED: &str = "ratings_submitted_total";
pub const RATINGS_REJECTED: &str = "ratings_rejected_total";
pub const RATINGS_STORED: &str = "ratings_stored";
pub const ADMIN_AUTH_FAILURES: &str = "admin_auth_failures_total";
pub const MYSTERY_VERIFY: &str = "mystery_verify_total";

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Only the first call in a process
    /// installs; later calls share its handle. `None` if some other recorder
    /// got there first.
    pub fn init() -> Option<Self> {
        static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();
        HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    describe();
                    Some(handle)
                }
                Err(e) => {
                    warn!(error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .clone()
            .map(|handle| Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!(RATINGS_SUBMITTED, "Ratings accepted and stored.");
    describe_counter!(
        RATINGS_REJECTED,
        "Submissions refused, labelled by reason (validation, duplicate, storage)."
    );
    describe_gauge!(RATINGS_STORED, "Ratings in the store after the last write.");
    describe_counter!(ADMIN_AUTH_FAILURES, "Privileged calls with a wrong admin password.");
    describe_counter!(MYSTERY_VERIFY, "Mystery code checks, labelled by outcome.");
}
