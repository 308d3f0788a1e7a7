use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 遥测字段值
///
/// 设备上报的单个测量值，数值（电压、温度等）或文本（状态字符串）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    /// 转换为浮点数（用于数值比较）
    ///
    /// 数值文本可以解析，布尔值映射为 0/1
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    /// 转换为文本（用于字符串比较）
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// 设备遥测上报
///
/// ETL 层解码后的一次周期性上报，字段值已按名称展开
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReading {
    /// 设备 ID
    pub device_id: String,

    /// 设备类型
    pub device_type: String,

    /// 设备名称
    pub device_name: String,

    /// 字段值（field -> value）
    pub values: HashMap<String, FieldValue>,

    /// 上报时间戳（毫秒）
    pub timestamp: i64,
}

impl DeviceReading {
    pub fn new(
        device_id: impl Into<String>,
        device_type: impl Into<String>,
        device_name: impl Into<String>,
        values: HashMap<String, FieldValue>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_type: device_type.into(),
            device_name: device_name.into(),
            values,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// 获取字段值
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}
