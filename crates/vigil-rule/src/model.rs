use serde::{Deserialize, Serialize};
use vigil_types::{FieldValue, Severity};

/// 告警规则定义
///
/// 规则本体由外部配置存储拥有和版本化，引擎只消费解析后的快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningRule {
    /// 规则 ID
    pub id: String,

    /// 规则名称
    pub name: String,

    /// 监控的字段名（如 temperature / voltage / humidity）
    pub field: String,

    /// 条件表达式（如 `> 25`、`>= 70 OR < 30`、`== "error"`）
    pub condition: String,

    /// 告警种类（与设备 ID 一起构成告警指纹，如 temperature_high）
    pub warning_kind: String,

    /// 严重级别
    pub severity: Severity,

    /// 消息模板，支持 {value} {field} {device} {threshold} 占位符
    pub message: String,

    /// 是否启用
    pub enabled: bool,
}

impl WarningRule {
    pub fn new(
        field: impl Into<String>,
        condition: impl Into<String>,
        warning_kind: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let field = field.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: String::new(),
            field,
            condition: condition.into(),
            warning_kind: warning_kind.into(),
            severity,
            message: message.into(),
            enabled: true,
        }
    }

    /// 渲染告警消息
    pub fn render_message(&self, value: &FieldValue, device_name: &str) -> String {
        self.message
            .replace("{value}", &value.to_string())
            .replace("{field}", &self.field)
            .replace("{device}", device_name)
            .replace("{threshold}", &self.condition)
    }
}
