use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{info, warn};
use vigil_config::RetentionSettings;

use crate::store::{SweepStats, WarningStore};

/// 保留清理器
///
/// 长周期（缺省一天）的后台清理任务：删除过期的已恢复告警及其
/// 条目，并独立删除过期的已发送/失败条目。清理是尽力而为的
/// housekeeping，失败只记日志，不影响摄入和派发路径
pub struct RetentionSweeper {
    /// 告警存储
    store: Arc<WarningStore>,

    /// 保留配置
    settings: RetentionSettings,

    /// 是否正在运行
    running: Arc<RwLock<bool>>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<WarningStore>, settings: RetentionSettings) -> Self {
        Self {
            store,
            settings,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 启动清理器
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            warn!("Retention sweeper is already running");
            return;
        }
        *running = true;
        drop(running);

        info!(
            resolved_max_age_days = self.settings.resolved_max_age_days,
            entry_max_age_days = self.settings.entry_max_age_days,
            sweep_interval_seconds = self.settings.sweep_interval_seconds,
            "Retention sweeper started"
        );

        let store = self.store.clone();
        let settings = self.settings.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut sweep_interval =
                interval(std::time::Duration::from_secs(settings.sweep_interval_seconds));
            // 第一个 tick 立即返回，跳过以避免启动即清理
            sweep_interval.tick().await;

            loop {
                sweep_interval.tick().await;

                let is_running = *running.read().await;
                if !is_running {
                    info!("Retention sweeper stopped");
                    break;
                }

                let stats = Self::run_sweep(&store, &settings, Utc::now()).await;
                info!(
                    warnings_purged = stats.warnings_purged,
                    entries_purged = stats.entries_purged,
                    "Retention sweep finished"
                );
            }
        });
    }

    /// 停止清理器
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Retention sweeper stopping...");
    }

    /// 执行一次清理
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepStats {
        Self::run_sweep(&self.store, &self.settings, now).await
    }

    async fn run_sweep(
        store: &WarningStore,
        settings: &RetentionSettings,
        now: DateTime<Utc>,
    ) -> SweepStats {
        store
            .sweep(
                now,
                Duration::days(settings.resolved_max_age_days),
                Duration::days(settings.entry_max_age_days),
            )
            .await
    }
}
