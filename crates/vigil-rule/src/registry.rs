use crate::model::WarningRule;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// 规则注册表（内存实现）
///
/// 按设备 ID 保存有序的规则列表，支持按设备类型设置缺省规则集；
/// 设备级规则存在时优先于类型级规则
pub struct RuleRegistry {
    device_rules: Arc<RwLock<HashMap<String, Vec<WarningRule>>>>,
    type_rules: Arc<RwLock<HashMap<String, Vec<WarningRule>>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            device_rules: Arc::new(RwLock::new(HashMap::new())),
            type_rules: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 设置设备级规则集
    pub async fn set_device_rules(&self, device_id: &str, rules: Vec<WarningRule>) {
        info!(device_id = %device_id, count = rules.len(), "Device rules updated");
        let mut map = self.device_rules.write().await;
        map.insert(device_id.to_string(), rules);
    }

    /// 设置类型级规则集
    pub async fn set_type_rules(&self, device_type: &str, rules: Vec<WarningRule>) {
        info!(device_type = %device_type, count = rules.len(), "Type rules updated");
        let mut map = self.type_rules.write().await;
        map.insert(device_type.to_string(), rules);
    }

    /// 移除设备级规则集
    pub async fn remove_device_rules(&self, device_id: &str) {
        let mut map = self.device_rules.write().await;
        map.remove(device_id);
    }

    /// 解析某台设备当前生效的规则列表（仅启用的规则，保持配置顺序）
    pub async fn rules_for(&self, device_id: &str, device_type: &str) -> Vec<WarningRule> {
        let device_map = self.device_rules.read().await;
        if let Some(rules) = device_map.get(device_id) {
            return rules.iter().filter(|r| r.enabled).cloned().collect();
        }
        drop(device_map);

        let type_map = self.type_rules.read().await;
        type_map
            .get(device_type)
            .map(|rules| rules.iter().filter(|r| r.enabled).cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::Severity;

    fn rule(kind: &str) -> WarningRule {
        WarningRule::new("temperature", "> 25", kind, Severity::Major, "{value}")
    }

    #[tokio::test]
    async fn test_device_rules_override_type_rules() {
        let registry = RuleRegistry::new();

        registry.set_type_rules("sensor", vec![rule("type_level")]).await;
        registry
            .set_device_rules("dev-1", vec![rule("device_level")])
            .await;

        let rules = registry.rules_for("dev-1", "sensor").await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].warning_kind, "device_level");

        // 其他设备回落到类型级规则
        let rules = registry.rules_for("dev-2", "sensor").await;
        assert_eq!(rules[0].warning_kind, "type_level");
    }

    #[tokio::test]
    async fn test_disabled_rules_are_skipped() {
        let registry = RuleRegistry::new();

        let mut disabled = rule("disabled_kind");
        disabled.enabled = false;
        registry
            .set_device_rules("dev-1", vec![disabled, rule("enabled_kind")])
            .await;

        let rules = registry.rules_for("dev-1", "sensor").await;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].warning_kind, "enabled_kind");
    }

    #[tokio::test]
    async fn test_unknown_device_has_no_rules() {
        let registry = RuleRegistry::new();
        assert!(registry.rules_for("dev-x", "unknown").await.is_empty());
    }
}
