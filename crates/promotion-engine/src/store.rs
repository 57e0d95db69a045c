//! 规则存储管理
//!
//! 使用 ArcSwap 持有当前生效的规则快照。读取端只做一次原子 load，
//! 重新加载时构造全新的不可变快照整体替换，读者要么看到旧列表要么看到新列表。

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::Rule;

/// 不可变规则快照
///
/// 规则已过滤掉未启用项，并按优先级降序排列（同优先级保持文档顺序）。
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    loaded_at: DateTime<Utc>,
    version: u64,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>, version: u64) -> Self {
        Self {
            rules,
            loaded_at: Utc::now(),
            version,
        }
    }

    /// 空快照，版本号为 0
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 快照生成时间
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// 快照版本号，每次替换递增
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }
}

/// 规则存储
#[derive(Clone)]
pub struct RuleStore {
    current: Arc<ArcSwap<RuleSet>>,
}

impl RuleStore {
    /// 用已排序的规则列表创建存储
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RuleSet::new(rules, 1))),
        }
    }

    /// 获取当前快照（无锁）
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// 以新的规则列表整体替换当前快照，返回新快照
    ///
    /// 通过 rcu 基于旧快照计算版本号，并发替换时每个快照的版本号唯一。
    /// 发生竞争时闭包会重试，规则列表随之克隆。
    pub fn replace(&self, rules: Vec<Rule>) -> Arc<RuleSet> {
        let mut installed: Option<Arc<RuleSet>> = None;

        self.current.rcu(|current| {
            let next = Arc::new(RuleSet::new(rules.clone(), current.version() + 1));
            installed = Some(Arc::clone(&next));
            next
        });

        // rcu 至少执行一次闭包
        let next = installed.unwrap_or_else(|| self.snapshot());
        info!(version = next.version(), count = next.len(), "规则快照已替换");
        next
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RuleSet::empty())),
        }
    }
}
