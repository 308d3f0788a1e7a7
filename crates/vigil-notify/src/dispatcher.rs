use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};
use vigil_config::DispatchSettings;
use vigil_warn::{WarningStatus, WarningStore};

use crate::manager::NotifyManager;
use crate::message::NotifyMessage;

/// 一次派发 tick 的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 成功发送数
    pub sent: usize,

    /// 因告警已恢复而作废数
    pub voided: usize,

    /// 投递失败数（含超时）
    pub failed: usize,
}

/// 通知派发器
///
/// 独立于摄入路径的周期任务：每个 tick 认领所有到期的通知条目，
/// 发送前重读所属告警的实时状态——已恢复的告警不再发送，其条目
/// 被记为作废（这是恢复对未来升级通知的唯一取消路径）
pub struct NotifyDispatcher {
    /// 告警存储
    store: Arc<WarningStore>,

    /// 投递渠道
    manager: Arc<NotifyManager>,

    /// 派发配置
    settings: DispatchSettings,

    /// 是否正在运行
    running: Arc<RwLock<bool>>,
}

impl NotifyDispatcher {
    pub fn new(
        store: Arc<WarningStore>,
        manager: Arc<NotifyManager>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            store,
            manager,
            settings,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 启动派发循环
    pub async fn start(self: &Arc<Self>) {
        let mut running = self.running.write().await;
        if *running {
            warn!("Notify dispatcher is already running");
            return;
        }
        *running = true;
        drop(running);

        info!(
            tick_seconds = self.settings.tick_seconds,
            delivery_timeout_seconds = self.settings.delivery_timeout_seconds,
            "Notify dispatcher started"
        );

        let dispatcher = self.clone();
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(dispatcher.settings.tick_seconds));

            loop {
                tick.tick().await;

                let is_running = *dispatcher.running.read().await;
                if !is_running {
                    info!("Notify dispatcher stopped");
                    break;
                }

                let report = dispatcher.tick_once(Utc::now()).await;
                if report != DeliveryReport::default() {
                    info!(
                        sent = report.sent,
                        voided = report.voided,
                        failed = report.failed,
                        "Dispatch tick finished"
                    );
                }
            }
        });
    }

    /// 停止派发循环
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Notify dispatcher stopping...");
    }

    /// 执行一个派发 tick
    ///
    /// 认领是原子的（scheduled -> sending），重叠执行的 tick 不会
    /// 重复发送同一条目；单条投递失败不中断本 tick 其余条目
    pub async fn tick_once(&self, now: DateTime<Utc>) -> DeliveryReport {
        let claimed = self.store.claim_due(now).await;
        if claimed.is_empty() {
            return DeliveryReport::default();
        }

        debug!(count = claimed.len(), "Claimed due notification entries");
        let mut report = DeliveryReport::default();

        for entry in claimed {
            // 发送前重读所属告警的当前状态和快照
            let warning = match self.store.warning(entry.warning_id).await {
                Some(warning) => warning,
                None => {
                    warn!(
                        entry_id = %entry.id,
                        warning_id = %entry.warning_id,
                        "Owning warning missing, entry voided"
                    );
                    self.store
                        .mark_failed(entry.id, "voided by resolution")
                        .await;
                    report.voided += 1;
                    continue;
                }
            };

            if warning.status == WarningStatus::Resolved {
                debug!(
                    entry_id = %entry.id,
                    warning_id = %warning.id,
                    level = entry.level,
                    "Warning already resolved, entry voided"
                );
                self.store
                    .mark_failed(entry.id, "voided by resolution")
                    .await;
                report.voided += 1;
                continue;
            }

            // 投递带超时上限，超时按失败处理，本 tick 内不重试
            let message = NotifyMessage::from_warning(&warning, entry.level);
            let deadline = Duration::from_secs(self.settings.delivery_timeout_seconds);

            match timeout(deadline, self.manager.broadcast(&message)).await {
                Ok(result) if result.success => {
                    info!(
                        warning_id = %warning.id,
                        device_id = %warning.device_id,
                        warning_kind = %warning.warning_kind,
                        level = entry.level,
                        "Escalation notification sent"
                    );
                    self.store.mark_sent(entry.id, Utc::now()).await;
                    report.sent += 1;
                }
                Ok(result) => {
                    warn!(
                        warning_id = %warning.id,
                        level = entry.level,
                        reason = %result.message,
                        "Escalation notification failed"
                    );
                    self.store.mark_failed(entry.id, result.message).await;
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        warning_id = %warning.id,
                        level = entry.level,
                        "Escalation notification timed out"
                    );
                    self.store.mark_failed(entry.id, "delivery timed out").await;
                    report.failed += 1;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NotifyChannel;
    use crate::notifier::{Notifier, NotifyResult};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use tokio::sync::Mutex;
    use vigil_types::{FieldValue, Severity};
    use vigil_warn::{DeviceContext, EntryStatus, Fingerprint, RuleVerdict};

    /// 记录所有发送的测试通知器
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<NotifyMessage>>>,
        mode: Mode,
    }

    enum Mode {
        Succeed,
        Fail,
        Hang,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
            match self.mode {
                Mode::Succeed => {
                    self.sent.lock().await.push(message.clone());
                    Ok(NotifyResult::success())
                }
                Mode::Fail => Ok(NotifyResult::failure("gateway rejected")),
                Mode::Hang => {
                    tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                    Ok(NotifyResult::success())
                }
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    async fn manager_with(mode: Mode) -> (Arc<NotifyManager>, Arc<Mutex<Vec<NotifyMessage>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let manager = Arc::new(NotifyManager::new());
        manager
            .register(
                NotifyChannel::Webhook,
                Box::new(RecordingNotifier {
                    sent: sent.clone(),
                    mode,
                }),
            )
            .await;
        (manager, sent)
    }

    fn verdict(kind: &str) -> RuleVerdict {
        RuleVerdict {
            warning_kind: kind.to_string(),
            severity: Severity::Major,
            measured_value: FieldValue::Number(28.0),
            threshold: "> 25".to_string(),
            message: "temperature reached 28".to_string(),
            violated: true,
        }
    }

    fn ctx() -> DeviceContext {
        DeviceContext::new("dev-1", "sensor", "机房温度计")
    }

    fn settings() -> DispatchSettings {
        DispatchSettings {
            tick_seconds: 60,
            delivery_timeout_seconds: 1,
        }
    }

    fn plan_of(count: u32) -> impl FnOnce(uuid::Uuid, DateTime<Utc>) -> Vec<vigil_warn::NotificationEntry> {
        move |warning_id, created_at| {
            (1..=count)
                .map(|level| {
                    vigil_warn::NotificationEntry::new(
                        warning_id,
                        level,
                        created_at + ChronoDuration::minutes(level as i64 - 1),
                    )
                })
                .collect()
        }
    }

    #[tokio::test]
    async fn test_due_entries_are_sent() {
        let store = Arc::new(WarningStore::new());
        let (manager, sent) = manager_with(Mode::Succeed).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        let change = store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::minutes(1), plan_of(3))
            .await;

        // 级别 1、2 到期（0 和 1 分钟偏移），级别 3 未到期
        let report = dispatcher.tick_once(now).await;
        assert_eq!(report.sent, 2);
        assert_eq!(report.voided, 0);
        assert_eq!(sent.lock().await.len(), 2);

        let entries = store.entries_for(change.warning().id).await;
        assert_eq!(entries[0].status, EntryStatus::Sent);
        assert!(entries[0].sent_at.is_some());
        assert_eq!(entries[1].status, EntryStatus::Sent);
        assert_eq!(entries[2].status, EntryStatus::Scheduled);
    }

    // 作废路径：告警恢复后剩余条目不再发送，下一个 tick 记为 failed
    #[tokio::test]
    async fn test_void_on_resolve() {
        let store = Arc::new(WarningStore::new());
        let (manager, sent) = manager_with(Mode::Succeed).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        let change = store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::hours(1), plan_of(3))
            .await;
        let warning_id = change.warning().id;

        store
            .resolve(&Fingerprint::new("dev-1", "temperature_high"), now)
            .await;

        let report = dispatcher.tick_once(now).await;
        assert_eq!(report.sent, 0);
        assert_eq!(report.voided, 3);
        assert!(sent.lock().await.is_empty());

        let entries = store.entries_for(warning_id).await;
        for entry in entries {
            assert_eq!(entry.status, EntryStatus::Failed);
            assert_eq!(entry.error.as_deref(), Some("voided by resolution"));
            assert!(entry.sent_at.is_none());
        }
    }

    // 场景 D：已发送的级别 1 不被重复派发，只有到期的级别 2 被发送
    #[tokio::test]
    async fn test_already_sent_entry_untouched() {
        let store = Arc::new(WarningStore::new());
        let (manager, sent) = manager_with(Mode::Succeed).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        let change = store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::minutes(1), plan_of(2))
            .await;
        let warning_id = change.warning().id;

        // 第一个 tick 发送级别 1（级别 2 尚未到期）
        let report = dispatcher.tick_once(now - ChronoDuration::seconds(30)).await;
        assert_eq!(report.sent, 1);

        // 第二个 tick：级别 2 到期，级别 1 已 sent，不会被再次认领
        let report = dispatcher.tick_once(now).await;
        assert_eq!(report.sent, 1);
        assert_eq!(sent.lock().await.len(), 2);

        let entries = store.entries_for(warning_id).await;
        assert_eq!(entries[0].status, EntryStatus::Sent);
        assert_eq!(entries[1].status, EntryStatus::Sent);
    }

    // 单条投递失败不中断 tick，失败条目不自动重试
    #[tokio::test]
    async fn test_delivery_failure_is_recorded_not_retried() {
        let store = Arc::new(WarningStore::new());
        let (manager, _sent) = manager_with(Mode::Fail).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        let change = store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::hours(1), plan_of(2))
            .await;

        let report = dispatcher.tick_once(now).await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.sent, 0);

        let entries = store.entries_for(change.warning().id).await;
        for entry in &entries {
            assert_eq!(entry.status, EntryStatus::Failed);
            assert_eq!(entry.error.as_deref(), Some("gateway rejected"));
        }

        // 失败条目已离开 scheduled 状态，后续 tick 不再处理
        let report = dispatcher.tick_once(now).await;
        assert_eq!(report, DeliveryReport::default());
    }

    // 投递超时按失败处理
    #[tokio::test(start_paused = true)]
    async fn test_delivery_timeout_marks_failed() {
        let store = Arc::new(WarningStore::new());
        let (manager, _sent) = manager_with(Mode::Hang).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        let change = store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::hours(1), plan_of(1))
            .await;

        let report = dispatcher.tick_once(now).await;
        assert_eq!(report.failed, 1);

        let entries = store.entries_for(change.warning().id).await;
        assert_eq!(entries[0].status, EntryStatus::Failed);
        assert_eq!(entries[0].error.as_deref(), Some("delivery timed out"));
    }

    // 重叠 tick 不会重复发送同一条目
    #[tokio::test]
    async fn test_overlapping_ticks_do_not_double_send() {
        let store = Arc::new(WarningStore::new());
        let (manager, sent) = manager_with(Mode::Succeed).await;
        let dispatcher = Arc::new(NotifyDispatcher::new(store.clone(), manager, settings()));

        let now = Utc::now();
        store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::hours(1), plan_of(4))
            .await;

        let a = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.tick_once(now).await }
        });
        let b = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.tick_once(now).await }
        });

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a.sent + b.sent, 4);
        assert_eq!(sent.lock().await.len(), 4);
    }

    // 派发器读取的是告警当前（可能已刷新）的快照
    #[tokio::test]
    async fn test_sends_refreshed_snapshot() {
        let store = Arc::new(WarningStore::new());
        let (manager, sent) = manager_with(Mode::Succeed).await;
        let dispatcher = NotifyDispatcher::new(store.clone(), manager, settings());

        let now = Utc::now();
        store
            .open_or_refresh(&ctx(), &verdict("temperature_high"), now - ChronoDuration::minutes(5), plan_of(1))
            .await;

        // 刷新为更新的测量值
        let mut refreshed = verdict("temperature_high");
        refreshed.measured_value = FieldValue::Number(31.0);
        refreshed.message = "temperature reached 31".to_string();
        store.open_or_refresh(&ctx(), &refreshed, now, plan_of(1)).await;

        dispatcher.tick_once(now).await;

        let messages = sent.lock().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "temperature reached 31");
    }
}
