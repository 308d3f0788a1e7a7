use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;
use vigil_core::VigilError;

use crate::model::{
    EntryStatus, Fingerprint, NotificationEntry, RuleVerdict, Warning, WarningChange,
    WarningStatus,
};

/// 创建告警时的设备上下文
#[derive(Debug, Clone)]
pub struct DeviceContext {
    pub device_id: String,
    pub device_type: String,
    pub device_name: String,
}

impl DeviceContext {
    pub fn new(
        device_id: impl Into<String>,
        device_type: impl Into<String>,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: device_type.into(),
            device_name: device_name.into(),
        }
    }
}

/// 清理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// 清理的已恢复告警数（连带其通知条目）
    pub warnings_purged: usize,

    /// 独立清理的已发送/失败通知条目数
    pub entries_purged: usize,
}

struct StoreInner {
    warnings: HashMap<Uuid, Warning>,

    /// active 告警索引：指纹 -> 告警 ID
    ///
    /// 不变量：每个指纹至多一条 active 告警；所有写路径都在
    /// inner 的写锁内完成，对同一指纹的并发观测因此被线性化
    active: HashMap<Fingerprint, Uuid>,

    entries: HashMap<Uuid, NotificationEntry>,
}

/// 告警存储（内存实现）
///
/// Warning / NotificationEntry 两张表构成持久化契约；任何满足
/// §不变量的存储引擎都可以替换本实现。create-or-refresh、认领、
/// 清理等多步操作都在单次写锁内完成（等价于单写事务）
pub struct WarningStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl WarningStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                warnings: HashMap::new(),
                active: HashMap::new(),
                entries: HashMap::new(),
            })),
        }
    }

    /// 违例观测的 create-or-refresh 决策
    ///
    /// 指纹无 active 告警时创建新告警并原子写入完整通知计划
    /// （由 `plan` 生成，全有或全无）；已有 active 告警时只刷新
    /// 最近观测字段，不追加条目
    pub async fn open_or_refresh<F>(
        &self,
        ctx: &DeviceContext,
        verdict: &RuleVerdict,
        now: DateTime<Utc>,
        plan: F,
    ) -> WarningChange
    where
        F: FnOnce(Uuid, DateTime<Utc>) -> Vec<NotificationEntry>,
    {
        let fingerprint = Fingerprint::new(ctx.device_id.clone(), verdict.warning_kind.clone());
        let mut inner = self.inner.write().await;

        if let Some(existing_id) = inner.active.get(&fingerprint).copied() {
            match inner.warnings.get_mut(&existing_id) {
                Some(warning) => {
                    warning.refresh(
                        verdict.measured_value.clone(),
                        verdict.threshold.clone(),
                        verdict.message.clone(),
                        now,
                    );
                    return WarningChange::Refreshed(warning.clone());
                }
                None => {
                    // 索引指向的告警不存在，修复索引后按新建处理
                    warn!(
                        device_id = %fingerprint.device_id,
                        warning_kind = %fingerprint.warning_kind,
                        "Active index pointed at missing warning, repairing"
                    );
                    inner.active.remove(&fingerprint);
                }
            }
        }

        let warning = Warning::new(
            ctx.device_id.clone(),
            verdict.warning_kind.clone(),
            ctx.device_type.clone(),
            ctx.device_name.clone(),
            verdict.severity,
            verdict.measured_value.clone(),
            verdict.threshold.clone(),
            verdict.message.clone(),
            now,
        );

        for entry in plan(warning.id, warning.created_at) {
            inner.entries.insert(entry.id, entry);
        }
        inner.active.insert(fingerprint, warning.id);
        inner.warnings.insert(warning.id, warning.clone());

        WarningChange::Created(warning)
    }

    /// 恢复指纹对应的 active 告警
    ///
    /// 无 active 告警时是幂等的 no-op，返回 None
    pub async fn resolve(
        &self,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Option<Warning> {
        let mut inner = self.inner.write().await;

        let warning_id = inner.active.remove(fingerprint)?;
        let warning = inner.warnings.get_mut(&warning_id)?;
        warning.resolve(now);
        Some(warning.clone())
    }

    /// 认领到期的通知条目（claim-then-act）
    ///
    /// 在一次写锁内把所有到期的 scheduled 条目置为 sending 并返回，
    /// 重叠的 tick 或多实例派发器不可能认领到同一条目
    pub async fn claim_due(&self, now: DateTime<Utc>) -> Vec<NotificationEntry> {
        let mut inner = self.inner.write().await;

        let mut claimed: Vec<NotificationEntry> = Vec::new();
        for entry in inner.entries.values_mut() {
            if entry.status == EntryStatus::Scheduled && entry.scheduled_for <= now {
                entry.status = EntryStatus::Sending;
                claimed.push(entry.clone());
            }
        }

        claimed.sort_by(|a, b| {
            a.scheduled_for
                .cmp(&b.scheduled_for)
                .then(a.level.cmp(&b.level))
        });
        claimed
    }

    /// 读取告警的实时状态（派发器发送前必须重读）
    pub async fn warning_status(&self, warning_id: Uuid) -> Option<WarningStatus> {
        let inner = self.inner.read().await;
        inner.warnings.get(&warning_id).map(|w| w.status)
    }

    /// 读取告警当前快照
    pub async fn warning(&self, warning_id: Uuid) -> Option<Warning> {
        let inner = self.inner.read().await;
        inner.warnings.get(&warning_id).cloned()
    }

    /// 标记条目发送成功
    pub async fn mark_sent(&self, entry_id: Uuid, now: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(&entry_id) {
            Some(entry) => {
                entry.status = EntryStatus::Sent;
                entry.sent_at = Some(now);
            }
            None => warn!(entry_id = %entry_id, "mark_sent: entry not found"),
        }
    }

    /// 标记条目发送失败（或因告警恢复而作废）
    pub async fn mark_failed(&self, entry_id: Uuid, reason: impl Into<String>) {
        let mut inner = self.inner.write().await;
        match inner.entries.get_mut(&entry_id) {
            Some(entry) => {
                entry.status = EntryStatus::Failed;
                entry.error = Some(reason.into());
            }
            None => warn!(entry_id = %entry_id, "mark_failed: entry not found"),
        }
    }

    /// 运维确认告警
    pub async fn acknowledge(
        &self,
        warning_id: Uuid,
        user: &str,
        notes: Option<String>,
    ) -> Result<Warning, VigilError> {
        let mut inner = self.inner.write().await;
        let warning = inner
            .warnings
            .get_mut(&warning_id)
            .ok_or_else(|| VigilError::NotFound(format!("warning {}", warning_id)))?;
        warning.acknowledge(user, notes);
        Ok(warning.clone())
    }

    /// 保留清理
    ///
    /// 删除恢复时间早于 `now - resolved_max_age` 的告警（连带其全部
    /// 通知条目），并独立删除完成时间早于 `now - entry_max_age` 的
    /// sent/failed 条目（父告警是否仍在与此无关）
    pub async fn sweep(
        &self,
        now: DateTime<Utc>,
        resolved_max_age: Duration,
        entry_max_age: Duration,
    ) -> SweepStats {
        let mut inner = self.inner.write().await;
        let mut stats = SweepStats::default();

        let warning_cutoff = now - resolved_max_age;
        let expired: Vec<Uuid> = inner
            .warnings
            .values()
            .filter(|w| {
                w.status == WarningStatus::Resolved
                    && w.resolved_at.map(|t| t < warning_cutoff).unwrap_or(false)
            })
            .map(|w| w.id)
            .collect();

        for warning_id in expired {
            inner.warnings.remove(&warning_id);
            inner.entries.retain(|_, e| e.warning_id != warning_id);
            stats.warnings_purged += 1;
        }

        let entry_cutoff = now - entry_max_age;
        let before = inner.entries.len();
        inner.entries.retain(|_, e| {
            let finished = matches!(e.status, EntryStatus::Sent | EntryStatus::Failed);
            // failed 条目没有发送时间，用计划时间衡量年龄
            let age_anchor = e.sent_at.unwrap_or(e.scheduled_for);
            !(finished && age_anchor < entry_cutoff)
        });
        stats.entries_purged = before - inner.entries.len();

        stats
    }

    /// 指纹当前的 active 告警
    pub async fn active_for(&self, fingerprint: &Fingerprint) -> Option<Warning> {
        let inner = self.inner.read().await;
        let warning_id = inner.active.get(fingerprint)?;
        inner.warnings.get(warning_id).cloned()
    }

    /// 所有 active 告警
    pub async fn active_warnings(&self) -> Vec<Warning> {
        let inner = self.inner.read().await;
        inner
            .active
            .values()
            .filter_map(|id| inner.warnings.get(id).cloned())
            .collect()
    }

    /// 告警的全部通知条目（按级别排序）
    pub async fn entries_for(&self, warning_id: Uuid) -> Vec<NotificationEntry> {
        let inner = self.inner.read().await;
        let mut entries: Vec<NotificationEntry> = inner
            .entries
            .values()
            .filter(|e| e.warning_id == warning_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.level);
        entries
    }

    /// 告警总数（含已恢复）
    pub async fn warning_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.warnings.len()
    }

    /// 通知条目总数
    pub async fn entry_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.entries.len()
    }
}

impl Default for WarningStore {
    fn default() -> Self {
        Self::new()
    }
}
