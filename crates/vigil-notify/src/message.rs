use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use vigil_types::Severity;
use vigil_warn::Warning;

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// 信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
    /// 严重
    Critical,
}

impl From<Severity> for NotifyLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Minor => NotifyLevel::Info,
            Severity::Moderate => NotifyLevel::Warning,
            Severity::Major => NotifyLevel::Error,
            Severity::Critical => NotifyLevel::Critical,
        }
    }
}

/// 通知渠道
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifyChannel {
    /// 邮件
    Email,
    /// Webhook
    Webhook,
    /// 短信
    Sms,
}

/// 通知消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyMessage {
    /// 标题
    pub title: String,

    /// 内容
    pub content: String,

    /// 级别
    pub level: NotifyLevel,

    /// 时间
    pub timestamp: DateTime<Utc>,

    /// 额外数据
    pub metadata: Option<serde_json::Value>,
}

impl NotifyMessage {
    pub fn new(title: impl Into<String>, content: impl Into<String>, level: NotifyLevel) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            level,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// 从告警快照组装某个升级级别的通知
    ///
    /// 派发器在发送前取告警的当前快照，因此刷新后的最新测量值
    /// 会体现在消息里
    pub fn from_warning(warning: &Warning, level: u32) -> Self {
        let title = format!(
            "[{}] {} - {}",
            warning.severity, warning.device_name, warning.warning_kind
        );

        Self::new(title, warning.message.clone(), warning.severity.into()).with_metadata(json!({
            "device_id": warning.device_id,
            "warning_kind": warning.warning_kind,
            "warning_id": warning.id,
            "escalation_level": level,
            "measured_value": warning.measured_value,
            "threshold": warning.threshold,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::FieldValue;

    #[test]
    fn test_level_mapping() {
        assert_eq!(NotifyLevel::from(Severity::Minor), NotifyLevel::Info);
        assert_eq!(NotifyLevel::from(Severity::Critical), NotifyLevel::Critical);
    }

    #[test]
    fn test_from_warning() {
        let warning = Warning::new(
            "dev-1",
            "temperature_high",
            "sensor",
            "机房温度计",
            Severity::Major,
            FieldValue::Number(28.0),
            "> 25",
            "temperature reached 28",
            Utc::now(),
        );

        let message = NotifyMessage::from_warning(&warning, 2);

        assert_eq!(message.level, NotifyLevel::Error);
        assert_eq!(message.content, "temperature reached 28");
        let metadata = message.metadata.unwrap();
        assert_eq!(metadata["escalation_level"], 2);
        assert_eq!(metadata["device_id"], "dev-1");
    }
}
