//! 共享库
//!
//! 包含服务共用的配置加载与可观测性基础设施代码。

pub mod config;
pub mod observability;

/// 加载工作目录下的 `.env` 文件（不存在时忽略）
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "已加载 .env 文件");
    }
}
