//! 规则加载器
//!
//! 将外部规则文档（YAML，JSON 作为 YAML 子集同样可用）解析为按优先级排序的
//! 启用规则列表。加载只产出新列表，替换规则存储由调用方完成。

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::{Result, RuleError};
use crate::models::{ConditionSpec, Rule, RuleDocument};

/// 规则加载器
#[derive(Debug, Clone)]
pub struct RuleLoader {
    path: PathBuf,
}

impl RuleLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// 规则文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取并解析规则文件
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<Rule>> {
        let bytes = std::fs::read(&self.path).map_err(|source| RuleError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;

        let rules = Self::load_from_slice(&bytes)?;
        info!(count = rules.len(), "规则文件已加载");
        Ok(rules)
    }

    /// 从字节内容解析规则
    pub fn load_from_slice(bytes: &[u8]) -> Result<Vec<Rule>> {
        let document: RuleDocument = serde_yaml::from_slice(bytes)?;
        Self::prepare(document)
    }

    /// 从字符串解析规则
    pub fn load_from_str(content: &str) -> Result<Vec<Rule>> {
        let document: RuleDocument = serde_yaml::from_str(content)?;
        Self::prepare(document)
    }

    /// 校验、过滤未启用规则并按优先级降序稳定排序
    fn prepare(document: RuleDocument) -> Result<Vec<Rule>> {
        Self::validate(&document)?;

        let total = document.rules.len();
        let mut rules: Vec<Rule> = document.rules.into_iter().filter(|r| r.active).collect();

        // sort_by_key 是稳定排序，同优先级保持文档中的先后顺序
        rules.sort_by_key(|r| Reverse(r.priority));

        debug!(total, active = rules.len(), "规则过滤排序完成");
        Ok(rules)
    }

    /// 验证文档结构
    fn validate(document: &RuleDocument) -> Result<()> {
        let mut seen = HashSet::with_capacity(document.rules.len());

        for (index, rule) in document.rules.iter().enumerate() {
            if rule.id.trim().is_empty() {
                return Err(RuleError::MalformedDefinition(format!(
                    "rules[{}] 的 id 不能为空",
                    index
                )));
            }

            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::MalformedDefinition(format!(
                    "规则 id 重复: '{}'",
                    rule.id
                )));
            }

            for (field, spec) in &rule.conditions {
                Self::validate_condition(rule, field, spec)?;
            }
        }

        Ok(())
    }

    /// 范围条件的上下界必须是同一可比较类型
    fn validate_condition(rule: &Rule, field: &str, spec: &ConditionSpec) -> Result<()> {
        if let ConditionSpec::Range(range) = spec {
            if let (Some(min), Some(max)) = (&range.min, &range.max) {
                if min.compare(max).is_none() {
                    return Err(RuleError::MalformedDefinition(format!(
                        "规则 '{}' 的条件 '{}' 上下界类型不一致: {} / {}",
                        rule.id,
                        field,
                        min.type_name(),
                        max.type_name()
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromotionMatch;
    use serde_json::json;

    const SAMPLE: &str = r#"
rules:
  - id: low
    description: low priority
    priority: 10
    active: true
    conditions: {}
    promotion: { id: low_offer }
  - id: disabled
    description: never loaded
    priority: 1000
    active: false
    conditions:
      country: US
    promotion: { id: disabled_offer }
  - id: high
    description: high priority
    priority: 90
    active: true
    conditions:
      spend_tier: [GOLD, PLATINUM]
    promotion: { id: high_offer }
  - id: tie_first
    priority: 50
    active: true
    promotion: { id: tie_first_offer }
  - id: tie_second
    priority: 50
    active: true
    promotion: { id: tie_second_offer }
"#;

    fn ids(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_load_filters_and_orders() {
        let rules = RuleLoader::load_from_str(SAMPLE).unwrap();
        assert_eq!(ids(&rules), vec!["high", "tie_first", "tie_second", "low"]);
    }

    #[test]
    fn test_load_keeps_promotion_payload() {
        let rules = RuleLoader::load_from_str(SAMPLE).unwrap();
        assert_eq!(rules[0].promotion, json!({"id": "high_offer"}));
        assert_eq!(rules[0].description.as_deref(), Some("high priority"));
        assert_eq!(rules[1].description, None);
    }

    #[test]
    fn test_null_description_loads_as_none() {
        let yaml = r#"
rules:
  - id: tilde
    description: ~
    priority: 2
    active: true
    promotion: { id: a }
  - id: null_word
    description: null
    priority: 1
    active: true
    promotion: { id: b }
"#;
        let rules = RuleLoader::load_from_str(yaml).unwrap();
        assert!(rules.iter().all(|r| r.description.is_none()));

        let text = serde_json::to_value(&rules[0]).unwrap();
        assert_eq!(text["description"], serde_json::Value::Null);
        assert_eq!(PromotionMatch::from(&rules[1]).rule_description, None);
    }

    #[test]
    fn test_load_accepts_json() {
        let json = r#"{"rules": [{"id": "a", "priority": 1, "active": true, "promotion": {"id": "x"}}]}"#;
        let rules = RuleLoader::load_from_slice(json.as_bytes()).unwrap();
        assert_eq!(ids(&rules), vec!["a"]);
    }

    #[test]
    fn test_missing_rules_key_is_malformed() {
        let err = RuleLoader::load_from_str("other: []").unwrap_err();
        assert!(matches!(err, RuleError::MalformedDefinition(_)));
    }

    #[test]
    fn test_rules_not_a_sequence_is_malformed() {
        let err = RuleLoader::load_from_str("rules: not-a-list").unwrap_err();
        assert!(matches!(err, RuleError::MalformedDefinition(_)));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        let yaml = r#"
rules:
  - id: no_priority
    active: true
    promotion: {}
"#;
        let err = RuleLoader::load_from_str(yaml).unwrap_err();
        assert!(matches!(err, RuleError::MalformedDefinition(_)));
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let yaml = r#"
rules:
  - id: bad_active
    priority: 1
    active: "yes please"
    promotion: {}
"#;
        assert!(RuleLoader::load_from_str(yaml).is_err());
    }

    #[test]
    fn test_unknown_condition_shape_is_malformed() {
        let yaml = r#"
rules:
  - id: bad_condition
    priority: 1
    active: true
    conditions:
      total_spend_30d: { above: 100 }
    promotion: {}
"#;
        let err = RuleLoader::load_from_str(yaml).unwrap_err();
        assert_eq!(err.kind(), "MalformedDefinition");
    }

    #[test]
    fn test_null_condition_is_malformed() {
        let yaml = r#"
rules:
  - id: null_condition
    priority: 1
    active: true
    conditions:
      country: ~
    promotion: {}
"#;
        assert!(RuleLoader::load_from_str(yaml).is_err());
    }

    #[test]
    fn test_mixed_range_bounds_are_malformed() {
        let yaml = r#"
rules:
  - id: mixed
    priority: 1
    active: true
    conditions:
      player_level: { min: 1, max: "ten" }
    promotion: {}
"#;
        assert!(RuleLoader::load_from_str(yaml).is_err());
    }

    #[test]
    fn test_duplicate_ids_are_malformed() {
        let yaml = r#"
rules:
  - id: same
    priority: 1
    active: true
    promotion: {}
  - id: same
    priority: 2
    active: false
    promotion: {}
"#;
        let err = RuleLoader::load_from_str(yaml).unwrap_err();
        assert!(err.to_string().contains("same"));
    }

    #[test]
    fn test_empty_id_is_malformed() {
        let yaml = r#"
rules:
  - id: "  "
    priority: 1
    active: true
    promotion: {}
"#;
        assert!(RuleLoader::load_from_str(yaml).is_err());
    }

    #[test]
    fn test_empty_rule_list_is_valid() {
        let rules = RuleLoader::load_from_str("rules: []").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let loader = RuleLoader::new("/nonexistent/rules.yml");
        let err = loader.load().unwrap_err();
        assert_eq!(err.kind(), "SourceUnavailable");
    }
}
