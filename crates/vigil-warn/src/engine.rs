use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use vigil_core::SharedEventBus;
use vigil_rule::{Condition, RuleRegistry, WarningRule};
use vigil_types::{DeviceReading, Message};

use crate::escalation::EscalationPolicy;
use crate::model::{Fingerprint, RuleVerdict, WarningChange};
use crate::store::{DeviceContext, WarningStore};

/// 告警状态引擎
///
/// 对每次设备上报做 create / refresh / resolve 决策：同一指纹的
/// 连续违例折叠为一条 active 告警的原地刷新（防骚扰去重），首次
/// 违例创建告警并一次性生成升级通知计划，违例消失时自动恢复
pub struct WarningEngine {
    /// 告警存储
    store: Arc<WarningStore>,

    /// 规则注册表
    registry: Arc<RuleRegistry>,

    /// 升级通知策略
    policy: EscalationPolicy,

    /// 变更事件总线（fire-and-forget，可选）
    bus: Option<SharedEventBus>,
}

impl WarningEngine {
    pub fn new(
        store: Arc<WarningStore>,
        registry: Arc<RuleRegistry>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            store,
            registry,
            policy,
            bus: None,
        }
    }

    /// 挂接变更事件总线
    pub fn with_bus(mut self, bus: SharedEventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// 摄入路径入口：处理一次设备上报
    pub async fn handle_reading(&self, reading: &DeviceReading) -> Vec<WarningChange> {
        let rules = self
            .registry
            .rules_for(&reading.device_id, &reading.device_type)
            .await;

        if rules.is_empty() {
            debug!(device_id = %reading.device_id, "No rules configured for device");
            return Vec::new();
        }

        let verdicts = self.evaluate_rules(reading, &rules);
        let ctx = DeviceContext::new(
            reading.device_id.clone(),
            reading.device_type.clone(),
            reading.device_name.clone(),
        );
        self.observe(&ctx, verdicts).await
    }

    /// 对规则集逐条求值并按告警种类折叠
    ///
    /// 坏规则（表达式解析失败、值无法比较）只记日志并跳过，绝不
    /// 影响同设备其余规则的评估；同种类多条规则并发违例时取第一条
    /// 违例规则的判定（severity 先写者生效）
    pub fn evaluate_rules(
        &self,
        reading: &DeviceReading,
        rules: &[WarningRule],
    ) -> Vec<RuleVerdict> {
        let mut order: Vec<String> = Vec::new();
        let mut by_kind: HashMap<String, RuleVerdict> = HashMap::new();

        for rule in rules {
            let Some(value) = reading.value(&rule.field) else {
                debug!(
                    device_id = %reading.device_id,
                    rule_id = %rule.id,
                    field = %rule.field,
                    "Field not present in reading, rule skipped"
                );
                continue;
            };

            let condition = match Condition::parse(&rule.condition) {
                Ok(condition) => condition,
                Err(e) => {
                    error!(
                        device_id = %reading.device_id,
                        rule_id = %rule.id,
                        warning_kind = %rule.warning_kind,
                        error = %e,
                        "Invalid rule condition, rule skipped"
                    );
                    continue;
                }
            };

            let violated = match condition.evaluate(value) {
                Ok(violated) => violated,
                Err(e) => {
                    error!(
                        device_id = %reading.device_id,
                        rule_id = %rule.id,
                        warning_kind = %rule.warning_kind,
                        error = %e,
                        "Rule evaluation failed, rule skipped"
                    );
                    continue;
                }
            };

            let verdict = RuleVerdict {
                warning_kind: rule.warning_kind.clone(),
                severity: rule.severity,
                measured_value: value.clone(),
                threshold: rule.condition.clone(),
                message: rule.render_message(value, &reading.device_name),
                violated,
            };

            match by_kind.entry(rule.warning_kind.clone()) {
                Entry::Vacant(slot) => {
                    order.push(rule.warning_kind.clone());
                    slot.insert(verdict);
                }
                Entry::Occupied(mut slot) => {
                    // 同种类里第一条违例的规则胜出
                    if !slot.get().violated && violated {
                        slot.insert(verdict);
                    }
                }
            }
        }

        order
            .into_iter()
            .filter_map(|kind| by_kind.remove(&kind))
            .collect()
    }

    /// 对折叠后的判定结果应用状态机
    ///
    /// 每个种类独立处理，单个种类出错不影响同一次观测里的其余种类
    pub async fn observe(
        &self,
        ctx: &DeviceContext,
        verdicts: Vec<RuleVerdict>,
    ) -> Vec<WarningChange> {
        let now = Utc::now();
        let mut changes = Vec::new();

        for verdict in verdicts {
            if verdict.violated {
                let change = self
                    .store
                    .open_or_refresh(ctx, &verdict, now, |warning_id, created_at| {
                        self.policy.plan(warning_id, created_at)
                    })
                    .await;

                match &change {
                    WarningChange::Created(w) => {
                        info!(
                            device_id = %w.device_id,
                            warning_kind = %w.warning_kind,
                            severity = %w.severity,
                            value = %w.measured_value,
                            "Warning created"
                        );
                    }
                    WarningChange::Refreshed(w) => {
                        debug!(
                            device_id = %w.device_id,
                            warning_kind = %w.warning_kind,
                            value = %w.measured_value,
                            "Warning refreshed"
                        );
                    }
                    WarningChange::Resolved(_) => {}
                }

                self.publish(&change);
                changes.push(change);
            } else {
                let fingerprint = Fingerprint::new(&ctx.device_id, &verdict.warning_kind);
                if let Some(warning) = self.store.resolve(&fingerprint, now).await {
                    info!(
                        device_id = %warning.device_id,
                        warning_kind = %warning.warning_kind,
                        "Warning resolved"
                    );
                    let change = WarningChange::Resolved(warning);
                    self.publish(&change);
                    changes.push(change);
                }
            }
        }

        changes
    }

    /// 发布变更到事件总线
    ///
    /// 不能阻塞状态转移：序列化失败只记日志，无订阅者的发送错误直接忽略
    fn publish(&self, change: &WarningChange) {
        let Some(bus) = &self.bus else {
            return;
        };

        match serde_json::to_value(change.warning()) {
            Ok(payload) => {
                let _ = bus.publish(Message::new(change.topic(), payload));
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize warning change");
            }
        }
    }
}
