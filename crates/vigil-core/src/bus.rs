use std::sync::Arc;
use tokio::sync::broadcast;
use vigil_types::Message;

/// 事件总线
///
/// 告警状态变更（created / refreshed / resolved）通过总线广播给
/// 审计日志、看板推送等外部订阅者，发布端不关心是否有人订阅
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Message>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    pub fn publish(&self, message: Message) -> Result<usize, broadcast::error::SendError<Message>> {
        self.sender.send(message)
    }
}

pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_eventbus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let msg = Message::new("warning/created", json!({"device_id": "dev-1"}));

        // 发布消息
        let result = bus.publish(msg.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1); // 1 个订阅者

        // 接收消息
        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout waiting for message")
            .expect("Failed to receive message");

        assert_eq!(received.topic, "warning/created");
        assert_eq!(received.payload["device_id"], "dev-1");
    }

    #[tokio::test]
    async fn test_eventbus_no_subscribers() {
        let bus = EventBus::new(16);

        // 没有订阅者时发布失败，发布端应忽略该错误
        let result = bus.publish(Message::new("warning/resolved", json!({})));
        assert!(result.is_err());
    }
}
