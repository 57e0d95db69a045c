//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use std::net::SocketAddr;
use std::sync::OnceLock;

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 促销选择耗时直方图的桶（秒）
pub const SELECTION_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0];

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("promotion_selection_duration_seconds".to_string()),
            SELECTION_DURATION_BUCKETS,
        )?
        .install_recorder()?;

    // 保存到全局，供其他地方获取指标快照
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标
fn register_common_metrics(service_name: &str) {
    // 这些描述会出现在 /metrics 端点的 HELP 注释中
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "promotion_requests_total",
        "Total number of promotion requests"
    );
    metrics::describe_histogram!(
        "promotion_selection_duration_seconds",
        "Duration of promotion selection in seconds"
    );
    metrics::describe_counter!("rule_matches_total", "Total number of rule matches");
    metrics::describe_counter!(
        "rules_reloaded_total",
        "Total number of times rules were reloaded"
    );
    metrics::describe_counter!(
        "rules_reload_failures_total",
        "Total number of failed rule reloads"
    );
    metrics::describe_gauge!("rules_loaded", "Number of active rules in the current snapshot");

    // 记录服务启动
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录促销请求结果
#[inline]
pub fn record_promotion_request(method: &str, status_code: u16) {
    metrics::counter!(
        "promotion_requests_total",
        "method" => method.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// 记录促销选择耗时
#[inline]
pub fn record_selection_duration(duration_secs: f64) {
    metrics::histogram!("promotion_selection_duration_seconds").record(duration_secs);
}

/// 记录规则命中
#[inline]
pub fn record_rule_match(rule_id: &str) {
    metrics::counter!("rule_matches_total", "rule_id" => rule_id.to_string()).increment(1);
}

/// 记录规则重新加载
#[inline]
pub fn record_rules_reload(success: bool, active_rules: Option<usize>) {
    if success {
        metrics::counter!("rules_reloaded_total").increment(1);
    } else {
        metrics::counter!("rules_reload_failures_total").increment(1);
    }

    if let Some(count) = active_rules {
        set_rules_loaded(count);
    }
}

/// 更新当前生效规则数
#[inline]
pub fn set_rules_loaded(count: usize) {
    metrics::gauge!("rules_loaded").set(count as f64);
}
