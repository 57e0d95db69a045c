//! 促销规则引擎 HTTP 服务
//!
//! 在规则引擎之上提供促销选择、规则热加载和统计查询的 REST API。

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
