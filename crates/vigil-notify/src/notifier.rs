use crate::message::NotifyMessage;
use anyhow::Result;
use async_trait::async_trait;

/// 投递协作方的统一入口
///
/// 派发器只依赖这个 trait：它在外层用 `tokio::time::timeout` 给
/// 每次 `send` 加时限，失败不重试，所以实现方可以同步阻塞也可以
/// 慢，超时由调用方兜底。渠道内部错误（SMTP 响应码、HTTP 状态）
/// 应折叠进 `NotifyResult` 而不是向上抛 Err，Err 留给构造请求
/// 这类编程性失败
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 投递一条通知
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult>;

    /// 渠道名（日志用）
    fn name(&self) -> &str;

    /// 渠道是否参与广播
    fn is_enabled(&self) -> bool {
        true
    }
}

/// 单次投递的结论
///
/// 两个字段正好对应通知条目的终态：送达与否，以及失败时写回
/// 条目 `error` 字段的原因文本
#[derive(Debug, Clone)]
pub struct NotifyResult {
    pub success: bool,
    pub message: String,
}

impl NotifyResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "Notification sent successfully".to_string(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
