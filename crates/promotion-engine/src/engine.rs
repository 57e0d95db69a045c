//! 促销引擎
//!
//! 对外的窄接口：选择促销、重新加载规则、查询统计。
//! 加载先在新列表上完成，成功后才替换存储；失败时旧规则继续生效。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::loader::RuleLoader;
use crate::models::{Player, PromotionMatch, Rule};
use crate::selector::Selector;
use crate::store::{RuleSet, RuleStore};

/// 重新加载结果
#[derive(Debug, Clone, Serialize)]
pub struct ReloadSummary {
    pub message: String,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
}

impl From<&RuleSet> for ReloadSummary {
    fn from(set: &RuleSet) -> Self {
        Self {
            message: "Rules reloaded successfully".to_string(),
            count: set.len(),
            timestamp: set.loaded_at(),
            version: set.version(),
        }
    }
}

/// 单条规则概要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    pub id: String,
    pub priority: i64,
    pub active: bool,
}

/// 规则统计信息，反映最近一次成功加载的快照
#[derive(Debug, Clone, Serialize)]
pub struct RuleStats {
    pub total_rules: usize,
    pub active_rules: usize,
    pub rules_by_priority: Vec<RuleSummary>,
}

impl From<&RuleSet> for RuleStats {
    fn from(set: &RuleSet) -> Self {
        Self {
            total_rules: set.len(),
            active_rules: set.rules().iter().filter(|r| r.active).count(),
            rules_by_priority: set
                .rules()
                .iter()
                .map(|r| RuleSummary {
                    id: r.id.clone(),
                    priority: r.priority,
                    active: r.active,
                })
                .collect(),
        }
    }
}

/// 促销引擎
pub struct PromotionEngine {
    loader: RuleLoader,
    store: RuleStore,
    /// 串行化重新加载的替换步骤，选择操作不经过此锁
    reload_lock: Mutex<()>,
}

impl PromotionEngine {
    /// 首次加载规则并创建引擎
    ///
    /// 首次加载失败时没有可用的规则集，错误应终止启动流程。
    #[instrument(skip(loader), fields(path = %loader.path().display()))]
    pub fn bootstrap(loader: RuleLoader) -> Result<Self> {
        let rules = loader.load().inspect_err(|e| {
            error!(error = %e, "初始规则加载失败");
        })?;

        info!(count = rules.len(), "Loaded {} active rules", rules.len());
        Ok(Self::with_rules(loader, rules))
    }

    /// 用已排序的规则创建引擎
    pub fn with_rules(loader: RuleLoader, rules: Vec<Rule>) -> Self {
        Self {
            loader,
            store: RuleStore::new(rules),
            reload_lock: Mutex::new(()),
        }
    }

    /// 为玩家选择促销
    pub fn select_promotion(&self, player: &Player) -> Option<PromotionMatch> {
        let snapshot = self.store.snapshot();
        Selector::select(&snapshot, player)
    }

    /// 从规则文件重新加载
    #[instrument(skip(self), fields(path = %self.loader.path().display()))]
    pub fn reload_rules(&self) -> Result<ReloadSummary> {
        let rules = self.loader.load().inspect_err(|e| {
            error!(error = %e, kind = e.kind(), "规则重新加载失败，保留当前规则");
        })?;
        Ok(self.swap(rules))
    }

    /// 从给定内容重新加载（不读取规则文件）
    pub fn reload_from_str(&self, content: &str) -> Result<ReloadSummary> {
        let rules = RuleLoader::load_from_str(content).inspect_err(|e| {
            error!(error = %e, kind = e.kind(), "规则重新加载失败，保留当前规则");
        })?;
        Ok(self.swap(rules))
    }

    fn swap(&self, rules: Vec<Rule>) -> ReloadSummary {
        let _guard = self.reload_lock.lock();
        let snapshot = self.store.replace(rules);
        let summary = ReloadSummary::from(snapshot.as_ref());

        info!(count = summary.count, version = summary.version, "Rules reloaded");
        summary
    }

    /// 当前规则统计，只读，不会触发加载
    pub fn stats(&self) -> RuleStats {
        RuleStats::from(self.store.snapshot().as_ref())
    }

    /// 当前规则快照
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.store.snapshot()
    }
}
