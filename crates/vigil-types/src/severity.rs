use serde::{Deserialize, Serialize};
use std::fmt;

/// 告警严重级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 轻微
    Minor,
    /// 中等
    Moderate,
    /// 严重
    Major,
    /// 紧急
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Major < Severity::Critical);
    }

    #[test]
    fn test_severity_serde() {
        let json = serde_json::to_string(&Severity::Major).unwrap();
        assert_eq!(json, "\"major\"");

        let s: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(s, Severity::Critical);
    }
}
