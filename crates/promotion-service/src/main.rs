//! 促销规则引擎服务
//!
//! 加载规则文件后对外提供促销选择 REST API。

use std::sync::Arc;

use anyhow::Context;
use promo_shared::{
    config::AppConfig,
    load_dotenv,
    observability::{self, metrics},
};
use promotion_engine::{PromotionEngine, RuleLoader};
use promotion_service::{AppState, build_router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let config = AppConfig::load("promotion-engine").context("加载配置失败")?;

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!(
        environment = %config.environment,
        rules_file = %config.rules.file.display(),
        "Starting promotion-engine on {}",
        config.server_addr()
    );

    // 首次加载失败时没有可服务的规则集，直接退出
    let loader = RuleLoader::new(&config.rules.file);
    let engine = PromotionEngine::bootstrap(loader)
        .with_context(|| format!("加载规则文件 {} 失败", config.rules.file.display()))?;
    metrics::set_rules_loaded(engine.snapshot().len());

    if config.is_production() && config.server.cors_origins.trim() == "*" {
        warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
    }

    let state = AppState::new(Arc::new(engine), config.environment.clone());
    let app = build_router(state, &config.server);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号（SIGTERM 或 Ctrl+C）
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
