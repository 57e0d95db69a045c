//! 服务级中间件

use std::any::Any;

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// 为所有响应注入 HTTP 安全头
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    headers.insert("x-dns-prefetch-control", HeaderValue::from_static("off"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));

    response
}

/// 将 handler 中的 panic 转换为 500 响应
///
/// 仅当 `expose` 为 true（开发环境）时响应中包含 panic 信息。
pub fn panic_response(expose: bool) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone {
    move |panic: Box<dyn Any + Send + 'static>| {
        let message = if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic".to_string()
        };

        ApiError::internal(message, expose).into_response()
    }
}
