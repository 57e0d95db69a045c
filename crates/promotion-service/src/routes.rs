//! 路由配置模块

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use promo_shared::{config::ServerConfig, observability::middleware as obs_middleware};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};
use tracing::info;

use crate::{handlers, middleware as service_middleware, state::AppState};

/// 促销相关路由，挂载在 /api/v1/promotions 下
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/promotion", post(handlers::select_promotion))
        .route("/reload-rules", post(handlers::reload_rules))
        .route("/rules/stats", get(handlers::rules_stats))
}

/// 根据配置构建 CORS 层；"*" 表示允许全部来源
pub fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins.trim() == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<_> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 构建完整的应用路由
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let expose_errors = state.is_development();

    Router::new()
        .nest("/api/v1/promotions", promotion_routes())
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(CatchPanicLayer::custom(service_middleware::panic_response(
            expose_errors,
        )))
        .layer(middleware::from_fn(service_middleware::security_headers))
        .layer(cors_layer(&server.cors_origins))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
