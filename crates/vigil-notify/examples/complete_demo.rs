use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use vigil_config::DispatchSettings;
use vigil_notify::{
    Notifier, NotifyChannel, NotifyDispatcher, NotifyManager, NotifyMessage, NotifyResult,
};
use vigil_rule::{RuleRegistry, WarningRule};
use vigil_types::{DeviceReading, FieldValue, Severity};
use vigil_warn::{EscalationPolicy, WarningEngine, WarningStore};

/// 控制台通知器（演示用投递协作方）
struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<NotifyResult> {
        println!("  📨 {} | {}", message.title, message.content);
        Ok(NotifyResult::success())
    }

    fn name(&self) -> &str {
        "console"
    }
}

fn reading(temperature: f64) -> DeviceReading {
    let mut values = HashMap::new();
    values.insert("temperature".to_string(), FieldValue::Number(temperature));
    DeviceReading::new("dev-1", "sensor", "机房温度计", values)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    println!("🚀 VIGIL - 告警去重与升级通知引擎演示\n");

    // 组装组件
    let store = Arc::new(WarningStore::new());
    let registry = Arc::new(RuleRegistry::new());
    registry
        .set_device_rules(
            "dev-1",
            vec![WarningRule::new(
                "temperature",
                "> 25",
                "temperature_high",
                Severity::Major,
                "{device}: {field} 达到 {value}（阈值 {threshold}）",
            )],
        )
        .await;

    let engine = WarningEngine::new(store.clone(), registry, EscalationPolicy::default());

    let manager = Arc::new(NotifyManager::new());
    manager
        .register(NotifyChannel::Webhook, Box::new(ConsoleNotifier))
        .await;
    let dispatcher = NotifyDispatcher::new(store.clone(), manager, DispatchSettings::default());

    println!("{}", "=".repeat(60));
    println!("示例 1: 连续违例被折叠为一条 active 告警");
    println!("{}", "=".repeat(60));

    for temperature in [28.0, 29.0, 28.5] {
        let changes = engine.handle_reading(&reading(temperature)).await;
        for change in &changes {
            println!("  -> {} ({})", change.topic(), change.warning().message);
        }
    }
    println!(
        "✅ active 告警数: {}，通知条目数: {}\n",
        store.active_warnings().await.len(),
        store.entry_count().await
    );

    println!("{}", "=".repeat(60));
    println!("示例 2: 派发到期的升级通知");
    println!("{}", "=".repeat(60));

    // 把时间拨到十分钟后，前两级（0 / 5 分钟偏移）到期
    let report = dispatcher.tick_once(Utc::now() + Duration::minutes(10)).await;
    println!(
        "✅ 已发送 {} 条，作废 {} 条，失败 {} 条\n",
        report.sent, report.voided, report.failed
    );

    println!("{}", "=".repeat(60));
    println!("示例 3: 恢复后剩余通知被作废");
    println!("{}", "=".repeat(60));

    let changes = engine.handle_reading(&reading(20.0)).await;
    for change in &changes {
        println!("  -> {}", change.topic());
    }
    let report = dispatcher.tick_once(Utc::now() + Duration::hours(2)).await;
    println!(
        "✅ 已发送 {} 条，作废 {} 条（告警已恢复）",
        report.sent, report.voided
    );

    Ok(())
}
