use thiserror::Error;

/// 规则配置/求值错误
///
/// 单条规则出错必须被调用方隔离：跳过该规则并继续处理其余规则，
/// 绝不能中断整条上报的评估
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("invalid condition '{expr}': {reason}")]
    InvalidCondition { expr: String, reason: String },

    #[error("value '{value}' cannot be compared numerically")]
    ValueCoercion { value: String },
}

impl RuleError {
    pub fn invalid(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        RuleError::InvalidCondition {
            expr: expr.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
