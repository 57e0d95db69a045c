//! 促销服务错误类型定义

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use promotion_engine::RuleError;
use serde_json::json;

use crate::dto::FieldError;

/// 生产环境下内部错误的通用提示
pub const GENERIC_INTERNAL_MESSAGE: &str = "Something went wrong";

/// 促销服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数验证失败: {} 个字段", .0.len())]
    Validation(Vec<FieldError>),

    #[error("没有匹配的促销")]
    NoPromotion,

    #[error("规则重新加载失败: {0}")]
    Reload(#[from] RuleError),

    #[error("路由不存在: {0}")]
    RouteNotFound(String),

    /// `expose` 为 false 时响应中只返回通用提示
    #[error("内部错误: {message}")]
    Internal { message: String, expose: bool },
}

impl ApiError {
    pub fn internal(message: impl Into<String>, expose: bool) -> Self {
        Self::Internal {
            message: message.into(),
            expose,
        }
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NoPromotion | Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Reload(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Self::Validation(details) => json!({
                "error": "Validation failed",
                "details": details,
            }),
            Self::NoPromotion => json!({
                "error": "No promotion found",
                "message": "No matching rules found for the provided player data",
            }),
            Self::Reload(e) => json!({
                "error": "Failed to reload rules",
                "message": e.to_string(),
                "kind": e.kind(),
            }),
            Self::RouteNotFound(path) => json!({
                "error": "Not found",
                "message": format!("Route {} not found", path),
            }),
            Self::Internal { message, expose } => {
                tracing::error!(error = %message, "内部错误");
                json!({
                    "error": "Internal server error",
                    "message": if expose { message } else { GENERIC_INTERNAL_MESSAGE.to_string() },
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// 从 validator 错误转换，按字段名排序保证输出稳定
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("\"{}\" is invalid", field));
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        Self::Validation(details)
    }
}

/// 请求体不是合法 JSON 或缺少 JSON Content-Type
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(vec![FieldError::new("body", rejection.body_text())])
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
