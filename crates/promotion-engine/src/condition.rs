//! 条件匹配器
//!
//! 判断单个玩家属性是否满足一个条件。匹配是纯函数且没有失败路径：
//! 属性缺失或类型不兼容一律视为不匹配，不会返回错误。

use std::cmp::Ordering;

use crate::models::{ConditionSpec, RangeSpec, Scalar};

/// 条件匹配器
pub struct ConditionMatcher;

impl ConditionMatcher {
    /// 匹配条件
    ///
    /// # Arguments
    /// * `spec` - 规则中定义的条件
    /// * `value` - 玩家的属性值，属性不存在时为 None
    pub fn matches(spec: &ConditionSpec, value: Option<&Scalar>) -> bool {
        // 属性缺失时所有变体都不匹配（范围条件同样按失败关闭处理）
        let Some(value) = value else {
            return false;
        };

        match spec {
            ConditionSpec::Set(candidates) => Self::in_set(candidates, value),
            ConditionSpec::Range(range) => Self::in_range(range, value),
            ConditionSpec::Exact(expected) => value == expected,
        }
    }

    /// 集合成员检查
    fn in_set(candidates: &[Scalar], value: &Scalar) -> bool {
        candidates.iter().any(|c| c == value)
    }

    /// 闭区间范围检查，无法比较的值视为不匹配
    fn in_range(range: &RangeSpec, value: &Scalar) -> bool {
        if let Some(min) = &range.min {
            match value.compare(min) {
                Some(Ordering::Less) | None => return false,
                _ => {}
            }
        }

        if let Some(max) = &range.max {
            match value.compare(max) {
                Some(Ordering::Greater) | None => return false,
                _ => {}
            }
        }

        true
    }
}
