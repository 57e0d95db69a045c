//! 规则引擎领域模型

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

/// 玩家属性与条件中使用的标量值
///
/// `Int` 与 `Float` 同属数值类型，比较时按数值进行；其余类型之间严格区分，
/// 字符串 `"5"` 不等于数值 `5`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// 从 JSON 值转换，非标量（null、数组、对象）返回 None
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// 类型名称，用于错误信息
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "number",
            Self::Text(_) => "string",
        }
    }

    /// 有序比较：仅数值与数值、字符串与字符串之间可比
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Scalar {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// 范围条件，上下界均为闭区间，缺省的一侧不做约束
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RangeSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Scalar>,
}

impl RangeSpec {
    pub fn new(min: Option<Scalar>, max: Option<Scalar>) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: impl Into<Scalar>) -> Self {
        Self::new(Some(min.into()), None)
    }

    pub fn at_most(max: impl Into<Scalar>) -> Self {
        Self::new(None, Some(max.into()))
    }

    pub fn between(min: impl Into<Scalar>, max: impl Into<Scalar>) -> Self {
        Self::new(Some(min.into()), Some(max.into()))
    }
}

/// 单个玩家属性的匹配策略
///
/// 规则文档中的形状与变体一一对应：序列为 `Set`，仅含 `min`/`max` 键的对象为
/// `Range`，标量为 `Exact`。其他形状（null、嵌套结构、未知键）在加载时被拒绝。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    Set(Vec<Scalar>),
    Range(RangeSpec),
    Exact(Scalar),
}

impl ConditionSpec {
    pub fn exact(value: impl Into<Scalar>) -> Self {
        Self::Exact(value.into())
    }

    pub fn one_of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Self::Set(values.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<Value> for ConditionSpec {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    Scalar::from_value(item)
                        .ok_or_else(|| format!("集合条件只能包含标量值，发现: {}", item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Set),
            Value::Object(map) => {
                let mut range = RangeSpec::default();
                for (key, bound) in map {
                    let parsed = match Scalar::from_value(&bound) {
                        Some(s) if !matches!(s, Scalar::Bool(_)) => s,
                        _ => return Err(format!("范围条件 '{}' 必须是数值或字符串: {}", key, bound)),
                    };
                    match key.as_str() {
                        "min" => range.min = Some(parsed),
                        "max" => range.max = Some(parsed),
                        other => return Err(format!("范围条件不支持的键: '{}'", other)),
                    }
                }
                Ok(Self::Range(range))
            }
            Value::Null => Err("条件值不能为 null".to_string()),
            scalar => Scalar::from_value(&scalar)
                .map(Self::Exact)
                .ok_or_else(|| format!("无法识别的条件值: {}", scalar)),
        }
    }
}

impl<'de> Deserialize<'de> for ConditionSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Self::try_from(raw).map_err(de::Error::custom)
    }
}

/// 规则定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// 缺省或 null 时为 None，序列化为 null
    #[serde(default)]
    pub description: Option<String>,
    pub priority: i64,
    pub active: bool,
    /// 条件为空表示无条件命中（兜底规则）
    #[serde(default)]
    pub conditions: BTreeMap<String, ConditionSpec>,
    /// 命中后原样返回给调用方，引擎不解释其结构
    pub promotion: Value,
}

impl Rule {
    pub fn new(id: impl Into<String>, priority: i64, promotion: Value) -> Self {
        Self {
            id: id.into(),
            description: None,
            priority,
            active: true,
            conditions: BTreeMap::new(),
            promotion,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_condition(mut self, field: impl Into<String>, spec: ConditionSpec) -> Self {
        self.conditions.insert(field.into(), spec);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// 规则文档，即外部持久化的唯一数据格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    pub rules: Vec<Rule>,
}

/// 玩家属性
///
/// 字段是否必填、取值范围由上游校验层负责，引擎只做匹配。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Player {
    attributes: BTreeMap<String, Scalar>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.attributes.get(name)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Player
where
    K: Into<String>,
    V: Into<Scalar>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut player = Self::new();
        for (k, v) in iter {
            player.insert(k, v);
        }
        player
    }
}

/// 选择结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromotionMatch {
    pub rule_id: String,
    pub rule_description: Option<String>,
    pub promotion: Value,
}

impl From<&Rule> for PromotionMatch {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_description: rule.description.clone(),
            promotion: rule.promotion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_equality_is_type_strict() {
        assert_eq!(Scalar::from("GOLD"), Scalar::from("GOLD"));
        assert_ne!(Scalar::from("5"), Scalar::from(5));
        assert_ne!(Scalar::from(true), Scalar::from(1));
        assert_eq!(Scalar::from(1500), Scalar::from(1500.0));
    }

    #[test]
    fn test_scalar_compare() {
        assert_eq!(Scalar::from(3).compare(&Scalar::from(3.5)), Some(Ordering::Less));
        assert_eq!(Scalar::from("b").compare(&Scalar::from("a")), Some(Ordering::Greater));
        assert_eq!(Scalar::from("3").compare(&Scalar::from(3)), None);
        assert_eq!(Scalar::from(true).compare(&Scalar::from(true)), None);
    }

    #[test]
    fn test_condition_spec_shapes() {
        assert_eq!(
            ConditionSpec::try_from(json!(["GOLD", "PLATINUM"])).unwrap(),
            ConditionSpec::one_of(["GOLD", "PLATINUM"])
        );
        assert_eq!(
            ConditionSpec::try_from(json!({"min": 1000})).unwrap(),
            ConditionSpec::Range(RangeSpec::at_least(1000))
        );
        assert_eq!(
            ConditionSpec::try_from(json!({})).unwrap(),
            ConditionSpec::Range(RangeSpec::default())
        );
        assert_eq!(
            ConditionSpec::try_from(json!("US")).unwrap(),
            ConditionSpec::exact("US")
        );
        assert_eq!(
            ConditionSpec::try_from(json!(false)).unwrap(),
            ConditionSpec::exact(false)
        );
    }

    #[test]
    fn test_condition_spec_rejects_unknown_shapes() {
        assert!(ConditionSpec::try_from(json!(null)).is_err());
        assert!(ConditionSpec::try_from(json!({"min": 1, "step": 2})).is_err());
        assert!(ConditionSpec::try_from(json!({"min": true})).is_err());
        assert!(ConditionSpec::try_from(json!({"max": null})).is_err());
        assert!(ConditionSpec::try_from(json!([["nested"]])).is_err());
        assert!(ConditionSpec::try_from(json!([{"min": 1}])).is_err());
    }

    #[test]
    fn test_rule_deserialization() {
        let json = r#"
        {
            "id": "high_spender_vip",
            "description": "VIP offer for high spenders",
            "priority": 100,
            "active": true,
            "conditions": {
                "spend_tier": ["GOLD", "PLATINUM"],
                "total_spend_30d": {"min": 1000}
            },
            "promotion": {"id": "vip_mega_bonus", "type": "bonus_coins", "value": 5000}
        }
        "#;

        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.id, "high_spender_vip");
        assert_eq!(rule.priority, 100);
        assert_eq!(rule.conditions.len(), 2);
        assert_eq!(rule.promotion["id"], json!("vip_mega_bonus"));
    }

    #[test]
    fn test_rule_without_conditions_is_unconditional() {
        let json = r#"{"id": "default_promotion", "priority": 0, "active": true, "promotion": {}}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(rule.is_unconditional());
        assert_eq!(rule.description, None);
    }

    #[test]
    fn test_rule_serialization_roundtrip() {
        let rule = Rule::new("r1", 10, json!({"id": "p1"}))
            .with_description("demo")
            .with_condition("country", ConditionSpec::exact("US"))
            .with_condition("player_level", ConditionSpec::Range(RangeSpec::between(1, 10)));

        let text = serde_json::to_string(&rule).unwrap();
        let parsed: Rule = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, rule);
    }

    #[test]
    fn test_player_from_json() {
        let player = Player::from_json(
            r#"{"player_id": "p1", "player_level": 55, "spend_tier": "GOLD", "total_spend_30d": 12.5}"#,
        )
        .unwrap();

        assert_eq!(player.get("spend_tier"), Some(&Scalar::from("GOLD")));
        assert_eq!(player.get("player_level"), Some(&Scalar::Int(55)));
        assert_eq!(player.get("total_spend_30d"), Some(&Scalar::Float(12.5)));
        assert_eq!(player.get("country"), None);
    }
}
