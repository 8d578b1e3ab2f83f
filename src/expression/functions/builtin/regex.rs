//! 正则表达式函数实现
//!
//! 编译后的正则按模式串缓存在注册表中

use super::mismatch;
use crate::core::value::Value;
use crate::expression::functions::registry::{compiled_regex, FunctionRegistry};
use crate::expression::functions::FunctionDescriptor;

/// 注册所有正则表达式函数
pub fn register_all(registry: &mut FunctionRegistry) {
    let cache = registry.regex_cache();
    registry.register(
        FunctionDescriptor::new("reMatch", Some(2))
            .with_cost(5.0)
            .with_selectivity(0.1),
        move |call| match (call.arg(0), call.arg(1)) {
            (Value::String(s), Value::String(pattern)) => {
                // 整串匹配
                let anchored = format!("^(?:{})$", pattern);
                let regex = compiled_regex(&cache, &anchored)?;
                Ok(Value::Bool(regex.is_match(s)))
            }
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::String(_), other) | (other, _) => Err(mismatch("reMatch", "String", other)),
        },
    );

    let cache = registry.regex_cache();
    registry.register(
        FunctionDescriptor::new("reReplace", Some(3)).with_cost(5.0),
        move |call| match (call.arg(0), call.arg(1), call.arg(2)) {
            (Value::String(s), Value::String(pattern), Value::String(replacement)) => {
                let regex = compiled_regex(&cache, pattern)?;
                Ok(Value::String(
                    regex.replace_all(s, replacement.as_str()).to_string(),
                ))
            }
            (Value::Null, _, _) | (_, Value::Null, _) | (_, _, Value::Null) => Ok(Value::Null),
            (a, _, _) => Err(mismatch("reReplace", "String", a)),
        },
    );
}
