use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigil_types::{FieldValue, Severity};

/// 告警指纹
///
/// (设备 ID, 告警种类) 唯一标识一个逻辑告警条件；
/// 任意时刻每个指纹至多存在一条 active 告警（核心不变量）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub device_id: String,
    pub warning_kind: String,
}

impl Fingerprint {
    pub fn new(device_id: impl Into<String>, warning_kind: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            warning_kind: warning_kind.into(),
        }
    }
}

/// 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningStatus {
    Active,
    Resolved,
}

/// 告警记录（聚合根）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// 告警 ID
    pub id: Uuid,

    /// 设备 ID
    pub device_id: String,

    /// 告警种类
    pub warning_kind: String,

    /// 设备类型（创建时冗余记录，刷新不改写）
    pub device_type: String,

    /// 设备名称（创建时冗余记录，刷新不改写）
    pub device_name: String,

    /// 严重级别（创建时由触发规则确定，之后不变）
    pub severity: Severity,

    /// 最近一次违例的测量值（每次刷新覆盖）
    pub measured_value: FieldValue,

    /// 触发的阈值表达式（每次刷新覆盖）
    pub threshold: String,

    /// 告警消息（每次刷新覆盖）
    pub message: String,

    /// 状态：active -> resolved，单向且只发生一次
    pub status: WarningStatus,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 最近一次违例观测时间
    pub last_observed_at: DateTime<Utc>,

    /// 恢复时间
    pub resolved_at: Option<DateTime<Utc>>,

    /// 确认人（运维操作，引擎本身不写入）
    pub acknowledged_by: Option<String>,

    /// 处理备注
    pub resolution_notes: Option<String>,
}

impl Warning {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device_id: impl Into<String>,
        warning_kind: impl Into<String>,
        device_type: impl Into<String>,
        device_name: impl Into<String>,
        severity: Severity,
        measured_value: FieldValue,
        threshold: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id: device_id.into(),
            warning_kind: warning_kind.into(),
            device_type: device_type.into(),
            device_name: device_name.into(),
            severity,
            measured_value,
            threshold: threshold.into(),
            message: message.into(),
            status: WarningStatus::Active,
            created_at: now,
            last_observed_at: now,
            resolved_at: None,
            acknowledged_by: None,
            resolution_notes: None,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.device_id.clone(), self.warning_kind.clone())
    }

    /// 刷新：只覆盖最近观测相关字段，severity / created_at 保持不变
    pub fn refresh(
        &mut self,
        measured_value: FieldValue,
        threshold: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.measured_value = measured_value;
        self.threshold = threshold.into();
        self.message = message.into();
        self.last_observed_at = now;
    }

    /// 恢复：active -> resolved，不可逆
    pub fn resolve(&mut self, now: DateTime<Utc>) {
        self.status = WarningStatus::Resolved;
        self.resolved_at = Some(now);
    }

    /// 运维确认
    pub fn acknowledge(&mut self, user: impl Into<String>, notes: Option<String>) {
        self.acknowledged_by = Some(user.into());
        self.resolution_notes = notes;
    }
}

/// 通知条目状态
///
/// scheduled -> sent / failed；Sending 是派发器认领条目时的
/// 瞬态标记，保证同一条目不会被重叠的 tick 处理两次
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Scheduled,
    Sending,
    Sent,
    Failed,
}

/// 通知条目
///
/// 告警创建时按升级策略一次性生成全套条目，刷新不追加；
/// 告警恢复后未发送的条目由派发器判为作废（void）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub id: Uuid,

    /// 所属告警
    pub warning_id: Uuid,

    /// 升级级别（1 起始的序号）
    pub level: u32,

    /// 到期时间，到期后条目进入可派发状态
    pub scheduled_for: DateTime<Utc>,

    pub status: EntryStatus,

    /// 成功发送时间
    pub sent_at: Option<DateTime<Utc>>,

    /// 失败/作废原因
    pub error: Option<String>,
}

impl NotificationEntry {
    pub fn new(warning_id: Uuid, level: u32, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            warning_id,
            level,
            scheduled_for,
            status: EntryStatus::Scheduled,
            sent_at: None,
            error: None,
        }
    }
}

/// 状态机输出的变更记录
///
/// 供审计日志、看板推送等外部协作方消费；引擎自身的职责
/// 在状态转移提交后即结束
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum WarningChange {
    Created(Warning),
    Refreshed(Warning),
    Resolved(Warning),
}

impl WarningChange {
    /// 事件总线主题
    pub fn topic(&self) -> &'static str {
        match self {
            WarningChange::Created(_) => "warning/created",
            WarningChange::Refreshed(_) => "warning/refreshed",
            WarningChange::Resolved(_) => "warning/resolved",
        }
    }

    pub fn warning(&self) -> &Warning {
        match self {
            WarningChange::Created(w) | WarningChange::Refreshed(w) | WarningChange::Resolved(w) => {
                w
            }
        }
    }
}

/// 单条规则对一次观测的判定结果
#[derive(Debug, Clone)]
pub struct RuleVerdict {
    pub warning_kind: String,
    pub severity: Severity,
    pub measured_value: FieldValue,
    pub threshold: String,
    pub message: String,
    pub violated: bool,
}
