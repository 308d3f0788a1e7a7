use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 全局配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub escalation: EscalationSettings,

    #[serde(default)]
    pub dispatch: DispatchSettings,

    #[serde(default)]
    pub retention: RetentionSettings,

    #[serde(default)]
    pub notify: NotifySettings,
}

/// 系统配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemConfig {
    pub name: String,
    pub version: String,
}

/// 升级通知配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EscalationSettings {
    /// 各级通知相对告警创建时刻的延迟（分钟），必须严格递增且首项非负
    pub offsets_minutes: Vec<i64>,
}

/// 通知派发配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchSettings {
    /// 派发周期（秒）
    pub tick_seconds: u64,

    /// 单次投递超时（秒），超时按投递失败处理
    pub delivery_timeout_seconds: u64,
}

/// 通知渠道配置
///
/// 未配置的渠道不注册，派发器对没有任何可用渠道的投递按失败处理
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifySettings {
    pub email: Option<EmailSettings>,
    pub webhook: Option<WebhookSettings>,
}

/// 邮件渠道配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,

    /// 收件人列表，不能为空
    pub to: Vec<String>,
}

/// Webhook 渠道配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookSettings {
    pub url: String,

    /// 附加请求头（如认证 token）
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// 保留清理配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetentionSettings {
    /// 已恢复告警的保留天数
    pub resolved_max_age_days: i64,

    /// 已发送/失败通知条目的保留天数
    pub entry_max_age_days: i64,

    /// 清理周期（秒）
    pub sweep_interval_seconds: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            escalation: EscalationSettings::default(),
            dispatch: DispatchSettings::default(),
            retention: RetentionSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "VIGIL Monitoring Platform".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            offsets_minutes: vec![0, 5, 15, 30, 60],
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            tick_seconds: 60,
            delivery_timeout_seconds: 30,
        }
    }
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            resolved_max_age_days: 30,
            entry_max_age_days: 7,
            sweep_interval_seconds: 86400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_global_config() {
        let config = GlobalConfig::default();
        assert_eq!(config.system.name, "VIGIL Monitoring Platform");
        assert_eq!(config.escalation.offsets_minutes, vec![0, 5, 15, 30, 60]);
        assert_eq!(config.dispatch.tick_seconds, 60);
        assert_eq!(config.retention.resolved_max_age_days, 30);
        assert_eq!(config.retention.entry_max_age_days, 7);

        // 缺省不配置任何通知渠道
        assert!(config.notify.email.is_none());
        assert!(config.notify.webhook.is_none());
    }
}
