//! 可观测性模块集成测试
//!
//! 测试 metrics 记录函数和 HTTP 中间件。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use promo_shared::observability::metrics::{
        record_http_request, record_promotion_request, record_rule_match, record_rules_reload,
        record_selection_duration, set_rules_loaded,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, 0.001);
        record_http_request("POST", "/api/v1/promotions/promotion", 200, 0.004);
        record_http_request("POST", "/api/v1/promotions/promotion", 400, 0.001);
        record_http_request("POST", "/api/v1/promotions/reload-rules", 500, 0.02);
    }

    #[test]
    fn test_record_promotion_outcomes() {
        record_promotion_request("POST", 200);
        record_promotion_request("POST", 404);
        record_promotion_request("POST", 500);
        record_selection_duration(0.0005);
        record_selection_duration(0.2);
        record_rule_match("high_spender_vip");
        record_rule_match("default_promotion");
    }

    #[test]
    fn test_record_rules_reload() {
        record_rules_reload(true, Some(7));
        record_rules_reload(false, None);
        set_rules_loaded(0);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use axum::{
        Router,
        body::Body,
        extract::Extension,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use promo_shared::observability::middleware::{
        REQUEST_ID_HEADER, RequestId, http_tracing, request_id,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(id): Extension<RequestId>| async move { id.as_str().to_string() }),
            )
            .layer(middleware::from_fn(http_tracing))
            .layer(middleware::from_fn(request_id))
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let header = response.headers().get(REQUEST_ID_HEADER).unwrap().to_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&header).is_ok());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, header.as_bytes());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/echo")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers().get(REQUEST_ID_HEADER).unwrap(), "req-123");
    }

    #[tokio::test]
    async fn test_tracing_passes_through_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
