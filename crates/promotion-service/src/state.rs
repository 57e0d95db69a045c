//! 应用状态定义

use std::sync::Arc;
use std::time::Instant;

use promotion_engine::PromotionEngine;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PromotionEngine>,
    /// 运行环境（development / production ...）
    pub environment: String,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<PromotionEngine>, environment: impl Into<String>) -> Self {
        Self {
            engine,
            environment: environment.into(),
            started_at: Instant::now(),
        }
    }

    /// 开发环境下错误响应包含内部错误详情
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}
