/*!
 * # Metrics
 *
 * Prometheus counters for the storefront, registered once in a process-wide
 * registry and exposed in text format at `/metrics`.
 */

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("storefront_http_requests_total", "HTTP requests by method and status"),
        &["method", "status"],
    )
    .expect("http request counter can be created")
});

static ORDERS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("storefront_orders_created_total", "Orders placed")
        .expect("orders counter can be created")
});

static ORDER_STATUS_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storefront_order_status_changes_total",
            "Order status changes by new status",
        ),
        &["status"],
    )
    .expect("status change counter can be created")
});

static MAIL_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("storefront_mail_sent_total", "Outgoing mail by outcome"),
        &["outcome"],
    )
    .expect("mail counter can be created")
});

static GATEWAY_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storefront_gateway_calls_total",
            "Third-party API calls by gateway and outcome",
        ),
        &["gateway", "outcome"],
    )
    .expect("gateway counter can be created")
});

static DB_KEEPALIVE: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("storefront_db_keepalive_total", "Database keep-alive pings by outcome"),
        &["outcome"],
    )
    .expect("keep-alive counter can be created")
});

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(ORDERS_CREATED.clone()),
        Box::new(ORDER_STATUS_CHANGES.clone()),
        Box::new(MAIL_SENT.clone()),
        Box::new(GATEWAY_CALLS.clone()),
        Box::new(DB_KEEPALIVE.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!(error = %e, "failed to register metric");
        }
    }
    registry
});

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

pub fn record_http_request(method: &str, status: u16) {
    let status = status.to_string();
    HTTP_REQUESTS
        .with_label_values(&[method, status.as_str()])
        .inc();
}

pub fn record_order_created() {
    ORDERS_CREATED.inc();
}

pub fn record_status_change(status: &str) {
    ORDER_STATUS_CHANGES.with_label_values(&[status]).inc();
}

pub fn record_mail(sent: bool) {
    MAIL_SENT
        .with_label_values(&[if sent { "sent" } else { "failed" }])
        .inc();
}

pub fn record_gateway_call(gateway: &str, ok: bool) {
    GATEWAY_CALLS
        .with_label_values(&[gateway, outcome(ok)])
        .inc();
}

pub fn record_db_keepalive(ok: bool) {
    DB_KEEPALIVE.with_label_values(&[outcome(ok)]).inc();
}

/// Renders every registered metric in Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

// HTTP endpoint handler for metrics
pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Counts every response by method and status code.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let response = next.run(request).await;
    record_http_request(&method, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_counters_are_rendered() {
        record_order_created();
        record_status_change("DELIVERED");
        record_gateway_call("paystation", false);
        record_mail(true);
        record_db_keepalive(true);
        record_http_request("GET", 200);

        let text = render().unwrap();
        assert!(text.contains("storefront_orders_created_total"));
        assert!(text.contains(r#"storefront_order_status_changes_total{status="DELIVERED"}"#));
        assert!(text.contains(r#"gateway="paystation",outcome="error""#));
        assert!(text.contains(r#"storefront_mail_sent_total{outcome="sent"}"#));
        assert!(text.contains(r#"storefront_http_requests_total{method="GET",status="200"}"#));
    }
}
