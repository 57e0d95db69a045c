//! 促销选择器
//!
//! 按优先级顺序遍历快照，返回第一条全部条件命中的规则。
//! 选择过程没有隐藏状态、随机性或时间依赖，相同输入总是得到相同结果。

use tracing::trace;

use crate::condition::ConditionMatcher;
use crate::models::{Player, PromotionMatch, Rule};
use crate::store::RuleSet;

impl Rule {
    /// 规则的每个条件都命中时规则命中；没有条件的规则无条件命中
    pub fn matches(&self, player: &Player) -> bool {
        self.conditions
            .iter()
            .all(|(field, spec)| ConditionMatcher::matches(spec, player.get(field)))
    }
}

/// 促销选择器
pub struct Selector;

impl Selector {
    /// 选择促销，没有任何规则命中时返回 None
    pub fn select(rules: &RuleSet, player: &Player) -> Option<PromotionMatch> {
        Self::first_match(rules.rules(), player).map(PromotionMatch::from)
    }

    /// 在有序规则列表中查找第一条命中的规则
    pub fn first_match<'a>(rules: &'a [Rule], player: &Player) -> Option<&'a Rule> {
        let matched = rules.iter().find(|rule| rule.matches(player));

        match matched {
            Some(rule) => trace!(rule_id = %rule.id, priority = rule.priority, "规则命中"),
            None => trace!(evaluated = rules.len(), "没有规则命中"),
        }

        matched
    }
}
