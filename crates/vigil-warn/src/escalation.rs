use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use vigil_config::EscalationSettings;

use crate::model::NotificationEntry;

/// 升级通知策略
///
/// 每个级别一个相对告警创建时刻的延迟偏移，序列必须严格递增
/// 且首项非负；缺省 0/5/15/30/60 分钟
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    offsets: Vec<Duration>,
}

impl EscalationPolicy {
    /// 从配置创建策略，校验偏移序列
    pub fn new(settings: &EscalationSettings) -> Result<Self> {
        let minutes = &settings.offsets_minutes;

        if minutes.is_empty() {
            return Err(anyhow!("escalation offsets must not be empty"));
        }
        if minutes[0] < 0 {
            return Err(anyhow!(
                "first escalation offset must be non-negative, got {}",
                minutes[0]
            ));
        }
        for pair in minutes.windows(2) {
            if pair[1] <= pair[0] {
                return Err(anyhow!(
                    "escalation offsets must be strictly ascending ({} followed by {})",
                    pair[0],
                    pair[1]
                ));
            }
        }

        Ok(Self {
            offsets: minutes.iter().map(|m| Duration::minutes(*m)).collect(),
        })
    }

    /// 升级级别数
    pub fn levels(&self) -> usize {
        self.offsets.len()
    }

    /// 为新建告警生成完整的通知计划
    ///
    /// 每级一条 scheduled 条目；计划与告警创建在同一次存储写入中
    /// 落盘，保证不会出现没有通知计划的告警
    pub fn plan(&self, warning_id: Uuid, created_at: DateTime<Utc>) -> Vec<NotificationEntry> {
        self.offsets
            .iter()
            .enumerate()
            .map(|(index, offset)| {
                NotificationEntry::new(warning_id, index as u32 + 1, created_at + *offset)
            })
            .collect()
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        // 缺省序列来自缺省配置，必然合法
        Self::new(&EscalationSettings::default()).expect("default escalation settings are valid")
    }
}
