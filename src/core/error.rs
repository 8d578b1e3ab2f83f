//! 求值错误体系
//!
//! 1. 分类错误（未知类型、未定义变量、取值域重复值、构造不一致、未知函数、取消）
//!    原样向上传播，不做任何修改
//! 2. `QueryError` 携带一组候选源码位置，每经过一层 `get_result` 都会按当前节点
//!    入边的跨度收窄一次，最终留下尽量精确的出错位置
//! 3. `EvalResult<T>` 是整个求值核心统一的返回类型

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::span::Span;

/// 求值核心的统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("未知类型: {0}")]
    UnknownType(String),

    #[error("未定义的变量: {0}")]
    UndefinedVariable(String),

    #[error("变量 {variable} 的取值域包含重复值: 序列长度 {length}, 不同元素 {distinct}")]
    DomainDuplicateValue {
        variable: String,
        length: usize,
        distinct: usize,
    },

    #[error("构造不一致: {0}")]
    InconsistentConstruction(String),

    #[error("未知函数: {0}")]
    UnknownFunction(String),

    #[error("求值已取消")]
    Cancelled,

    #[error("查询错误: {0}")]
    Query(#[from] QueryError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的结果类型
pub type EvalResult<T> = Result<T, EvalError>;

/// 通用查询错误的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryErrorKind {
    /// 值的类型与期望不符
    TypeMismatch,
    /// 参数非法（数量或取值）
    InvalidArgument,
    /// 函数体执行失败
    FunctionFailure,
    /// 路径搜索失败
    PathError,
}

/// 携带候选源码位置的通用查询错误
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub message: String,
    /// 可能产生该错误的源码位置，随传播逐层收窄
    pub positions: Vec<Span>,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            positions: Vec::new(),
        }
    }

    pub fn with_positions(mut self, positions: Vec<Span>) -> Self {
        self.positions = positions;
        self
    }

    /// 类型不匹配
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            QueryErrorKind::TypeMismatch,
            format!("类型不匹配: 期望 {}, 实际 {}", expected, actual),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::InvalidArgument, message)
    }

    pub fn function_failure(function: &str, message: impl Into<String>) -> Self {
        Self::new(
            QueryErrorKind::FunctionFailure,
            format!("函数 {} 执行失败: {}", function, message.into()),
        )
    }

    pub fn path_error(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::PathError, message)
    }

    /// 只保留落在某个 `enclosing` 跨度之内的候选位置
    pub fn narrow(&mut self, enclosing: &[Span]) {
        self.positions
            .retain(|pos| enclosing.iter().any(|span| span.encloses(pos)));
    }
}

impl EvalError {
    /// 按当前节点入边的跨度收窄错误位置
    ///
    /// 只有 `Query` 错误携带位置；当前节点没有带位置的入边时保持原样
    pub fn narrowed(mut self, enclosing: &[Span]) -> Self {
        if let EvalError::Query(ref mut err) = self {
            if !enclosing.is_empty() {
                err.narrow(enclosing);
            }
        }
        self
    }

    /// 候选源码位置（仅 `Query` 错误有）
    pub fn positions(&self) -> &[Span] {
        match self {
            EvalError::Query(err) => &err.positions,
            _ => &[],
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        EvalError::Internal(message.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, EvalError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_keeps_enclosed_positions() {
        let err: EvalError = QueryError::type_mismatch("Bool", "Int")
            .with_positions(vec![Span::on_line(1, 5, 3), Span::on_line(2, 5, 3)])
            .into();

        let narrowed = err.narrowed(&[Span::on_line(1, 1, 20)]);
        assert_eq!(narrowed.positions(), &[Span::on_line(1, 5, 3)]);
    }

    #[test]
    fn test_narrowing_without_spans_is_noop() {
        let err: EvalError = QueryError::invalid_argument("x")
            .with_positions(vec![Span::on_line(1, 5, 3)])
            .into();
        let narrowed = err.narrowed(&[]);
        assert_eq!(narrowed.positions().len(), 1);
    }

    #[test]
    fn test_narrowing_can_empty_positions() {
        let err: EvalError = QueryError::invalid_argument("x")
            .with_positions(vec![Span::on_line(3, 1, 4)])
            .into();
        let narrowed = err.narrowed(&[Span::on_line(1, 1, 80)]);
        assert!(narrowed.positions().is_empty());
    }

    #[test]
    fn test_taxonomy_errors_pass_through_unchanged() {
        let err = EvalError::UnknownFunction("frobnicate".to_string());
        assert_eq!(err.clone().narrowed(&[Span::on_line(1, 1, 1)]), err);
        assert!(EvalError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_error_display() {
        let err = EvalError::DomainDuplicateValue {
            variable: "x".to_string(),
            length: 3,
            distinct: 2,
        };
        assert!(err.to_string().contains("x"));
        assert!(EvalError::UndefinedVariable("y".into()).to_string().contains("y"));
    }
}
