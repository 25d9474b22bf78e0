use std::net::SocketAddr;

use crate::tools::ToolCall;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total tool calls handled. Labels: tool, status.
pub const TOOL_CALLS_TOTAL: &str = "spacebook_tool_calls_total";

/// Histogram: tool call latency in seconds. Labels: tool.
pub const TOOL_DURATION_SECONDS: &str = "spacebook_tool_duration_seconds";

/// Counter: reservation attempts. Labels: outcome.
pub const RESERVATIONS_TOTAL: &str = "spacebook_reservations_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "spacebook_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "spacebook_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "spacebook_connections_rejected_total";

/// Histogram: atomic file save duration in seconds. Labels: file.
pub const PERSIST_DURATION_SECONDS: &str = "spacebook_persist_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a ToolCall variant to a short label for metrics.
pub fn tool_label(call: &ToolCall) -> &'static str {
    match call {
        ToolCall::CheckAvailability(_) => "check_availability",
        ToolCall::GetAvailableSlots(_) => "get_available_slots",
        ToolCall::MakeReservation(_) => "make_reservation",
        ToolCall::CollectContact(_) => "collect_contact",
        ToolCall::ListTools {} => "list_tools",
    }
}
