//! HTTP 处理器

use std::time::Instant;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use promo_shared::observability::metrics;
use promotion_engine::RuleStats;
use serde_json::Value;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dto::{HealthResponse, PromotionRequest, PromotionResponse, ReloadResponse},
    error::{ApiError, Result},
    state::AppState,
};

/// 为玩家选择促销
///
/// POST /api/v1/promotions/promotion
pub async fn select_promotion(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PromotionResponse>> {
    let start = Instant::now();

    let parsed = match payload {
        Ok(Json(body)) => PromotionRequest::from_json(body).map_err(ApiError::Validation),
        Err(rejection) => Err(rejection.into()),
    };
    let request = match parsed {
        Ok(request) => request.normalize(),
        Err(e) => {
            metrics::record_promotion_request("POST", StatusCode::BAD_REQUEST.as_u16());
            return Err(e);
        }
    };

    if let Err(errors) = request.validate() {
        metrics::record_promotion_request("POST", StatusCode::BAD_REQUEST.as_u16());
        return Err(errors.into());
    }

    let player_id = request.player_id.clone().unwrap_or_default();
    let player = request.into_player();

    let Some(matched) = state.engine.select_promotion(&player) else {
        debug!(player_id = %player_id, "没有匹配的促销规则");
        metrics::record_promotion_request("POST", StatusCode::NOT_FOUND.as_u16());
        return Err(ApiError::NoPromotion);
    };

    let elapsed = start.elapsed();
    metrics::record_selection_duration(elapsed.as_secs_f64());
    metrics::record_promotion_request("POST", StatusCode::OK.as_u16());
    metrics::record_rule_match(&matched.rule_id);

    debug!(player_id = %player_id, rule_id = %matched.rule_id, "促销选择完成");

    Ok(Json(PromotionResponse::new(
        player_id,
        matched,
        elapsed.as_secs_f64() * 1000.0,
    )))
}

/// 热加载规则文件
///
/// POST /api/v1/promotions/reload-rules
pub async fn reload_rules(State(state): State<AppState>) -> Result<Json<ReloadResponse>> {
    let engine = state.engine.clone();

    // 读文件与解析是阻塞操作
    let result = tokio::task::spawn_blocking(move || engine.reload_rules())
        .await
        .map_err(|e| ApiError::internal(e.to_string(), state.is_development()))?;

    match result {
        Ok(summary) => {
            metrics::record_rules_reload(true, Some(summary.count));
            info!(count = summary.count, version = summary.version, "规则热加载成功");
            Ok(Json(ReloadResponse::from(summary)))
        }
        Err(e) => {
            metrics::record_rules_reload(false, None);
            warn!(error = %e, "规则热加载失败，继续使用当前规则");
            Err(e.into())
        }
    }
}

/// 当前规则统计
///
/// GET /api/v1/promotions/rules/stats
pub async fn rules_stats(State(state): State<AppState>) -> Json<RuleStats> {
    Json(state.engine.stats())
}

/// 存活探针
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.engine.snapshot();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.environment.clone(),
        rules_loaded: snapshot.len(),
        rules_version: snapshot.version(),
    })
}

/// Prometheus 指标（与独立指标端口内容一致）
pub async fn metrics() -> Response {
    match metrics::get_handle() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// 未匹配路由
pub async fn not_found(uri: Uri) -> ApiError {
    let target = uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_else(|| uri.path());
    ApiError::RouteNotFound(target.to_string())
}
