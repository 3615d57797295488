//! # Prometheus Metrics
//!
//! Exposes sale metrics for the presale node. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] under
//! the `presale` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use presale_contracts::{NftPresale, SalePhase};
use presale_protocol::config::WEI_PER_GWEI;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct PresaleMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Accepted mint calls.
    pub mints_total: IntCounter,
    /// Tokens minted across all accepted calls.
    pub tokens_minted_total: IntCounter,
    /// Rejected calls, labelled by operation and rejection reason.
    pub rejected_calls_total: IntCounterVec,
    /// Tokens currently in existence.
    pub total_supply: IntGauge,
    /// Collection ceiling.
    pub maximum_supply: IntGauge,
    /// Addresses admitted to the presale.
    pub whitelist_size: IntGauge,
    /// Unwithdrawn proceeds, in gwei.
    pub proceeds_gwei: IntGauge,
    /// 0 while in presale, 1 once public.
    pub sale_phase: IntGauge,
    /// Time spent applying and persisting a mint.
    pub mint_latency_seconds: Histogram,
}

impl PresaleMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("presale".into()), None)
            .expect("failed to create prometheus registry");

        let mints_total = IntCounter::new("mints_total", "Total number of accepted mint calls")
            .expect("metric creation");
        registry
            .register(Box::new(mints_total.clone()))
            .expect("metric registration");

        let tokens_minted_total =
            IntCounter::new("tokens_minted_total", "Total number of tokens minted")
                .expect("metric creation");
        registry
            .register(Box::new(tokens_minted_total.clone()))
            .expect("metric registration");

        let rejected_calls_total = IntCounterVec::new(
            Opts::new(
                "rejected_calls_total",
                "Contract calls rejected, by operation and reason",
            ),
            &["operation", "reason"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(rejected_calls_total.clone()))
            .expect("metric registration");

        let total_supply = IntGauge::new("total_supply", "Tokens minted so far")
            .expect("metric creation");
        registry
            .register(Box::new(total_supply.clone()))
            .expect("metric registration");

        let maximum_supply = IntGauge::new("maximum_supply", "Collection supply ceiling")
            .expect("metric creation");
        registry
            .register(Box::new(maximum_supply.clone()))
            .expect("metric registration");

        let whitelist_size =
            IntGauge::new("whitelist_size", "Addresses admitted to the presale")
                .expect("metric creation");
        registry
            .register(Box::new(whitelist_size.clone()))
            .expect("metric registration");

        let proceeds_gwei =
            IntGauge::new("proceeds_gwei", "Unwithdrawn sale proceeds in gwei")
                .expect("metric creation");
        registry
            .register(Box::new(proceeds_gwei.clone()))
            .expect("metric registration");

        let sale_phase = IntGauge::new("sale_phase", "0 during presale, 1 during public sale")
            .expect("metric creation");
        registry
            .register(Box::new(sale_phase.clone()))
            .expect("metric registration");

        let mint_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mint_latency_seconds",
                "Time to validate, apply and persist a mint, in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(mint_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            mints_total,
            tokens_minted_total,
            rejected_calls_total,
            total_supply,
            maximum_supply,
            whitelist_size,
            proceeds_gwei,
            sale_phase,
            mint_latency_seconds,
        }
    }

    /// Refreshes every gauge from the current ledger.
    pub fn observe(&self, ledger: &NftPresale) {
        self.total_supply.set(clamp_i64(ledger.total_supply() as u128));
        self.maximum_supply
            .set(clamp_i64(ledger.maximum_nft_supply() as u128));
        self.whitelist_size
            .set(clamp_i64(ledger.whitelist_len() as u128));
        self.proceeds_gwei
            .set(clamp_i64(ledger.proceeds().as_u128() / WEI_PER_GWEI));
        self.sale_phase.set(match ledger.phase() {
            SalePhase::Presale => 0,
            SalePhase::Public => 1,
        });
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn clamp_i64(value: u128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<PresaleMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
