//! 促销规则引擎
//!
//! 根据玩家属性，在按优先级排序的声明式规则中选出唯一一个促销，支持：
//! - YAML/JSON 规则定义的加载与结构校验
//! - 精确值、集合、范围三种条件匹配
//! - 按优先级首个命中的选择策略
//! - 基于不可变快照的原子热加载

pub mod condition;
pub mod engine;
pub mod error;
pub mod loader;
pub mod models;
pub mod selector;
pub mod store;

pub use condition::ConditionMatcher;
pub use engine::{PromotionEngine, ReloadSummary, RuleStats, RuleSummary};
pub use error::{Result, RuleError};
pub use loader::RuleLoader;
pub use models::{ConditionSpec, Player, PromotionMatch, RangeSpec, Rule, RuleDocument, Scalar};
pub use selector::Selector;
pub use store::{RuleSet, RuleStore};
