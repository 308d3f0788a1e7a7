use crate::message::{NotifyChannel, NotifyMessage};
use crate::notifier::{Notifier, NotifyResult};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// 通知管理器
///
/// 渠道注册表；派发器对一条通知只关心"是否送达到了至少一个
/// 渠道"，因此广播返回聚合结果而不是逐渠道结果
pub struct NotifyManager {
    /// 通知器列表
    notifiers: Arc<RwLock<HashMap<NotifyChannel, Box<dyn Notifier>>>>,
}

impl NotifyManager {
    pub fn new() -> Self {
        Self {
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册通知器
    pub async fn register(&self, channel: NotifyChannel, notifier: Box<dyn Notifier>) {
        let mut notifiers = self.notifiers.write().await;
        info!("Registered notifier: {}", notifier.name());
        notifiers.insert(channel, notifier);
    }

    /// 广播通知到所有启用的渠道
    ///
    /// 至少一个渠道成功即视为投递成功；没有可用渠道或全部失败
    /// 视为投递失败
    pub async fn broadcast(&self, message: &NotifyMessage) -> NotifyResult {
        let notifiers = self.notifiers.read().await;

        let mut attempted = 0;
        let mut delivered = 0;
        let mut last_error = String::new();

        for notifier in notifiers.values() {
            if !notifier.is_enabled() {
                continue;
            }
            attempted += 1;

            match notifier.send(message).await {
                Ok(result) => {
                    if result.success {
                        info!("Notification sent via {}: {}", notifier.name(), message.title);
                        delivered += 1;
                    } else {
                        error!(
                            "Notification failed via {}: {}",
                            notifier.name(),
                            result.message
                        );
                        last_error = result.message;
                    }
                }
                Err(e) => {
                    error!("Notification error via {}: {}", notifier.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        if attempted == 0 {
            NotifyResult::failure("no notifier registered")
        } else if delivered > 0 {
            NotifyResult::success()
        } else {
            NotifyResult::failure(last_error)
        }
    }
}

impl Default for NotifyManager {
    fn default() -> Self {
        Self::new()
    }
}
