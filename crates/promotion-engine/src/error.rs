//! 规则引擎错误类型

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// 规则文档结构不合法：缺少 `rules` 序列、字段缺失或类型错误、条件形状无法识别
    #[error("规则定义格式错误: {0}")]
    MalformedDefinition(String),

    #[error("无法读取规则文件 {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RuleError {
    /// 错误类别，供 HTTP 层和日志使用
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedDefinition(_) => "MalformedDefinition",
            Self::SourceUnavailable { .. } => "SourceUnavailable",
        }
    }
}

impl From<serde_yaml::Error> for RuleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::MalformedDefinition(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
