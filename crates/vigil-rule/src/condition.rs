use serde::{Deserialize, Serialize};
use vigil_types::FieldValue;

use crate::error::{Result, RuleError};

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

/// 比较字面量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    Text(String),
}

/// 连接词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connective {
    And,
    Or,
}

/// 单个比较子句
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub cmp: Comparator,
    pub literal: Literal,
}

/// 阈值条件表达式
///
/// 一到两个子句，可用 AND/OR（大小写不敏感）连接：
/// `> 25`、`>= 70 OR < 30`、`== "error"`
///
/// 表达式在规则加载时解析为结构化形式，求值是无副作用的纯函数，
/// 可以在任意评估上下文中并发调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub first: Clause,
    pub rest: Option<(Connective, Clause)>,
}

impl Condition {
    /// 解析条件表达式
    pub fn parse(expr: &str) -> Result<Self> {
        let mut parser = Parser::new(expr);

        let first = parser.clause()?;
        parser.skip_ws();

        let rest = if parser.at_end() {
            None
        } else {
            let connective = parser.connective()?;
            let second = parser.clause()?;
            parser.skip_ws();
            if !parser.at_end() {
                return Err(RuleError::invalid(expr, "trailing input after second clause"));
            }
            Some((connective, second))
        };

        Ok(Self { first, rest })
    }

    /// 对测量值求值
    pub fn evaluate(&self, value: &FieldValue) -> Result<bool> {
        let first = self.first.evaluate(value)?;

        match &self.rest {
            None => Ok(first),
            Some((Connective::And, clause)) => Ok(first && clause.evaluate(value)?),
            Some((Connective::Or, clause)) => Ok(first || clause.evaluate(value)?),
        }
    }
}

impl Clause {
    fn evaluate(&self, value: &FieldValue) -> Result<bool> {
        match &self.literal {
            Literal::Number(limit) => {
                // 数值比较：测量值强制转为浮点数
                let measured = value.as_number().ok_or_else(|| RuleError::ValueCoercion {
                    value: value.to_string(),
                })?;
                Ok(match self.cmp {
                    Comparator::Gt => measured > *limit,
                    Comparator::Ge => measured >= *limit,
                    Comparator::Lt => measured < *limit,
                    Comparator::Le => measured <= *limit,
                    Comparator::Eq => measured == *limit,
                    Comparator::Ne => measured != *limit,
                })
            }
            Literal::Text(text) => {
                // 字符串比较：仅支持相等/不等（解析时已保证）
                let measured = value.as_text();
                Ok(match self.cmp {
                    Comparator::Eq => measured == *text,
                    Comparator::Ne => measured != *text,
                    _ => unreachable!("ordering comparator with text literal rejected at parse"),
                })
            }
        }
    }
}

/// 手写的微型解析器
struct Parser<'a> {
    expr: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(expr: &'a str) -> Self {
        Self { expr, rest: expr }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn clause(&mut self) -> Result<Clause> {
        self.skip_ws();
        let cmp = self.comparator()?;
        self.skip_ws();
        let literal = self.literal()?;

        // 字符串字面量只允许 == / !=
        if matches!(literal, Literal::Text(_))
            && !matches!(cmp, Comparator::Eq | Comparator::Ne)
        {
            return Err(RuleError::invalid(
                self.expr,
                "string literal only supports == and !=",
            ));
        }

        Ok(Clause { cmp, literal })
    }

    fn comparator(&mut self) -> Result<Comparator> {
        for (token, cmp) in [
            (">=", Comparator::Ge),
            ("<=", Comparator::Le),
            ("==", Comparator::Eq),
            ("!=", Comparator::Ne),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
        ] {
            if let Some(rest) = self.rest.strip_prefix(token) {
                self.rest = rest;
                return Ok(cmp);
            }
        }
        Err(RuleError::invalid(self.expr, "expected comparator"))
    }

    fn literal(&mut self) -> Result<Literal> {
        if let Some(rest) = self.rest.strip_prefix('"') {
            // 带引号的字符串字面量
            let end = rest
                .find('"')
                .ok_or_else(|| RuleError::invalid(self.expr, "unterminated string literal"))?;
            let text = rest[..end].to_string();
            self.rest = &rest[end + 1..];
            return Ok(Literal::Text(text));
        }

        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let token = &self.rest[..end];
        if token.is_empty() {
            return Err(RuleError::invalid(self.expr, "expected literal"));
        }

        let number: f64 = token
            .parse()
            .map_err(|_| RuleError::invalid(self.expr, format!("invalid number '{}'", token)))?;
        self.rest = &self.rest[end..];
        Ok(Literal::Number(number))
    }

    fn connective(&mut self) -> Result<Connective> {
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let word = &self.rest[..end];

        let connective = if word.eq_ignore_ascii_case("and") {
            Connective::And
        } else if word.eq_ignore_ascii_case("or") {
            Connective::Or
        } else {
            return Err(RuleError::invalid(
                self.expr,
                format!("expected AND/OR, got '{}'", word),
            ));
        };

        self.rest = &self.rest[end..];
        Ok(connective)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_clause() {
        let cond = Condition::parse("> 25").unwrap();
        assert_eq!(cond.first.cmp, Comparator::Gt);
        assert_eq!(cond.first.literal, Literal::Number(25.0));
        assert!(cond.rest.is_none());
    }

    #[test]
    fn test_parse_two_clauses() {
        let cond = Condition::parse(">= 70 OR < 30").unwrap();
        let (connective, second) = cond.rest.unwrap();
        assert_eq!(connective, Connective::Or);
        assert_eq!(second.cmp, Comparator::Lt);

        // 连接词大小写不敏感
        let cond = Condition::parse("> 0 and <= 100").unwrap();
        assert_eq!(cond.rest.unwrap().0, Connective::And);
    }

    #[test]
    fn test_parse_string_literal() {
        let cond = Condition::parse("== \"error\"").unwrap();
        assert_eq!(cond.first.literal, Literal::Text("error".to_string()));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        // 缺少字面量（规格场景 C 的坏规则）
        assert!(Condition::parse("supposed > ").is_err());
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("> ").is_err());
        assert!(Condition::parse("> abc").is_err());
        assert!(Condition::parse("> 1 XOR < 2").is_err());
        assert!(Condition::parse("> 1 OR < 2 AND > 3").is_err());
        assert!(Condition::parse("== \"unterminated").is_err());
        // 字符串不支持排序比较
        assert!(Condition::parse("> \"abc\"").is_err());
    }

    #[test]
    fn test_evaluate_numeric() {
        let cond = Condition::parse("> 25").unwrap();
        assert!(cond.evaluate(&FieldValue::Number(28.0)).unwrap());
        assert!(!cond.evaluate(&FieldValue::Number(20.0)).unwrap());

        // 数值文本可以被强制转换
        assert!(cond.evaluate(&FieldValue::Text("26".to_string())).unwrap());
    }

    #[test]
    fn test_evaluate_or_range() {
        let cond = Condition::parse(">= 70 OR < 30").unwrap();
        assert!(cond.evaluate(&FieldValue::Number(75.0)).unwrap());
        assert!(cond.evaluate(&FieldValue::Number(20.0)).unwrap());
        assert!(!cond.evaluate(&FieldValue::Number(50.0)).unwrap());
    }

    #[test]
    fn test_evaluate_and_range() {
        let cond = Condition::parse("> 10 AND < 20").unwrap();
        assert!(cond.evaluate(&FieldValue::Number(15.0)).unwrap());
        assert!(!cond.evaluate(&FieldValue::Number(25.0)).unwrap());
    }

    #[test]
    fn test_evaluate_string_equality() {
        let cond = Condition::parse("== \"error\"").unwrap();
        assert!(cond
            .evaluate(&FieldValue::Text("error".to_string()))
            .unwrap());
        assert!(!cond.evaluate(&FieldValue::Text("ok".to_string())).unwrap());

        let cond = Condition::parse("!= \"ok\"").unwrap();
        assert!(cond
            .evaluate(&FieldValue::Text("error".to_string()))
            .unwrap());
    }

    #[test]
    fn test_evaluate_coercion_failure() {
        let cond = Condition::parse("> 25").unwrap();
        let err = cond
            .evaluate(&FieldValue::Text("offline".to_string()))
            .unwrap_err();
        assert!(matches!(err, RuleError::ValueCoercion { .. }));
    }
}
