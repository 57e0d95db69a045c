//! 请求与响应 DTO 定义

use chrono::{DateTime, Utc};
use promotion_engine::{Player, PromotionMatch, ReloadSummary};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Number, Value};
use validator::{Validate, ValidationError};

/// 允许的消费等级
pub const SPEND_TIERS: &[&str] = &["BRONZE", "SILVER", "GOLD", "PLATINUM"];

/// 请求体允许出现的字段
pub const REQUEST_FIELDS: &[&str] = &[
    "player_id",
    "player_level",
    "spend_tier",
    "country",
    "days_since_last_purchase",
    "days_since_registration",
    "total_spend_30d",
];

/// 超过该绝对值的浮点数无法无损转换为整数
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// 促销选择请求
///
/// 必填字段以 Option 承载，缺失时由 `required` 校验给出字段级错误。
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PromotionRequest {
    #[validate(
        required(message = "\"player_id\" is required"),
        length(min = 1, message = "\"player_id\" is not allowed to be empty")
    )]
    pub player_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_integer")]
    #[validate(
        required(message = "\"player_level\" is required"),
        range(min = 1, message = "\"player_level\" must be greater than or equal to 1")
    )]
    pub player_level: Option<i64>,

    #[validate(
        required(message = "\"spend_tier\" is required"),
        custom(function = "validate_spend_tier")
    )]
    pub spend_tier: Option<String>,

    #[validate(
        required(message = "\"country\" is required"),
        length(equal = 2, message = "\"country\" length must be 2 characters long")
    )]
    pub country: Option<String>,

    #[serde(default, deserialize_with = "deserialize_integer")]
    #[validate(
        required(message = "\"days_since_last_purchase\" is required"),
        range(min = 0, message = "\"days_since_last_purchase\" must be greater than or equal to 0")
    )]
    pub days_since_last_purchase: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_integer")]
    #[validate(range(min = 0, message = "\"days_since_registration\" must be greater than or equal to 0"))]
    pub days_since_registration: Option<i64>,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "\"total_spend_30d\" must be greater than or equal to 0"))]
    pub total_spend_30d: f64,
}

fn validate_spend_tier(value: &str) -> Result<(), ValidationError> {
    if SPEND_TIERS.contains(&value) {
        return Ok(());
    }

    let mut error = ValidationError::new("any.only");
    error.message = Some(
        format!("\"spend_tier\" must be one of [{}]", SPEND_TIERS.join(", ")).into(),
    );
    Err(error)
}

/// 整数字段同时接受小数部分为 0 的数字（如 `5.0`）
fn deserialize_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if let Some(value) = number.as_i64() {
        return Ok(Some(value));
    }

    match number.as_f64() {
        Some(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER => {
            Ok(Some(value as i64))
        }
        _ => Err(de::Error::custom(format!("must be an integer, got {}", number))),
    }
}

impl PromotionRequest {
    /// 从 JSON 值解析请求，错误定位到具体字段
    ///
    /// 未知字段逐个报告；类型错误使用出错字段的路径，无法定位时记为 `body`。
    pub fn from_json(value: Value) -> Result<Self, Vec<FieldError>> {
        if let Value::Object(map) = &value {
            let unknown: Vec<FieldError> = map
                .keys()
                .filter(|key| !REQUEST_FIELDS.contains(&key.as_str()))
                .map(|key| FieldError::new(key.clone(), format!("\"{}\" is not allowed", key)))
                .collect();
            if !unknown.is_empty() {
                return Err(unknown);
            }
        }

        serde_path_to_error::deserialize(value).map_err(|e| {
            let path = e.path().to_string();
            let field = if path == "." { "body".to_string() } else { path };
            vec![FieldError::new(field, e.into_inner().to_string())]
        })
    }

    /// 规范化输入：国家代码统一转为大写
    pub fn normalize(mut self) -> Self {
        if let Some(country) = self.country.as_mut() {
            *country = country.trim().to_uppercase();
        }
        self
    }

    /// 转换为引擎使用的玩家属性
    pub fn into_player(self) -> Player {
        let mut player = Player::new();

        if let Some(id) = self.player_id {
            player.insert("player_id", id);
        }
        if let Some(level) = self.player_level {
            player.insert("player_level", level);
        }
        if let Some(tier) = self.spend_tier {
            player.insert("spend_tier", tier);
        }
        if let Some(country) = self.country {
            player.insert("country", country);
        }
        if let Some(days) = self.days_since_last_purchase {
            player.insert("days_since_last_purchase", days);
        }
        if let Some(days) = self.days_since_registration {
            player.insert("days_since_registration", days);
        }
        player.insert("total_spend_30d", self.total_spend_30d);

        player
    }
}

/// 命中的规则
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchedRuleDto {
    pub id: String,
    pub description: Option<String>,
}

/// 促销选择响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PromotionResponse {
    pub success: bool,
    pub player_id: String,
    pub selected_promotion: Value,
    pub matched_rule: MatchedRuleDto,
    pub selection_time_ms: f64,
}

impl PromotionResponse {
    pub fn new(player_id: String, matched: PromotionMatch, selection_time_ms: f64) -> Self {
        Self {
            success: true,
            player_id,
            selected_promotion: matched.promotion,
            matched_rule: MatchedRuleDto {
                id: matched.rule_id,
                description: matched.rule_description,
            },
            selection_time_ms,
        }
    }
}

/// 规则重新加载响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
}

impl From<ReloadSummary> for ReloadResponse {
    fn from(summary: ReloadSummary) -> Self {
        Self {
            success: true,
            message: summary.message,
            count: summary.count,
            timestamp: summary.timestamp,
            version: summary.version,
        }
    }
}

/// 健康检查响应
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// 进程运行时长（秒）
    pub uptime: f64,
    pub environment: String,
    pub rules_loaded: usize,
    pub rules_version: u64,
}

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
