//! 内置函数实现模块
//!
//! 按功能分类组织：逻辑与比较、算术、容器、字符串、正则、图

pub mod container;
pub mod graph;
pub mod logic;
pub mod math;
pub mod regex;
pub mod string;

use super::registry::FunctionRegistry;
use crate::core::error::{EvalError, QueryError, QueryErrorKind};
use crate::core::value::Value;

/// 注册所有内置函数
pub fn register_all(registry: &mut FunctionRegistry) {
    logic::register_all(registry);
    math::register_all(registry);
    container::register_all(registry);
    string::register_all(registry);
    regex::register_all(registry);
    graph::register_all(registry);
}

/// 参数类型不符
pub(crate) fn mismatch(function: &str, expected: &str, actual: &Value) -> EvalError {
    QueryError::new(
        QueryErrorKind::TypeMismatch,
        format!(
            "函数 {} 的参数类型不匹配: 期望 {}, 实际 {}",
            function,
            expected,
            actual.type_name()
        ),
    )
    .into()
}
