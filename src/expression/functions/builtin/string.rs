//! 字符串函数

use super::mismatch;
use crate::core::value::Value;
use crate::expression::functions::registry::FunctionRegistry;
use crate::expression::functions::FunctionDescriptor;

/// 注册所有字符串函数
pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDescriptor::new("toString", Some(1)), |call| {
        match call.arg(0) {
            Value::String(s) => Ok(Value::String(s.clone())),
            other => Ok(Value::String(other.to_string())),
        }
    });

    registry.register(FunctionDescriptor::new("toUpperCase", Some(1)), |call| {
        match call.arg(0) {
            Value::String(s) => Ok(Value::String(s.to_uppercase())),
            Value::Null => Ok(Value::Null),
            other => Err(mismatch("toUpperCase", "String", other)),
        }
    });

    registry.register(FunctionDescriptor::new("toLowerCase", Some(1)), |call| {
        match call.arg(0) {
            Value::String(s) => Ok(Value::String(s.to_lowercase())),
            Value::Null => Ok(Value::Null),
            other => Err(mismatch("toLowerCase", "String", other)),
        }
    });

    registry.register(
        FunctionDescriptor::new("startsWith", Some(2)).with_selectivity(0.2),
        |call| match (call.arg(0), call.arg(1)) {
            (Value::String(s), Value::String(prefix)) => Ok(Value::Bool(s.starts_with(prefix.as_str()))),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::String(_), other) | (other, _) => Err(mismatch("startsWith", "String", other)),
        },
    );

    registry.register(
        FunctionDescriptor::new("endsWith", Some(2)).with_selectivity(0.2),
        |call| match (call.arg(0), call.arg(1)) {
            (Value::String(s), Value::String(suffix)) => Ok(Value::Bool(s.ends_with(suffix.as_str()))),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::String(_), other) | (other, _) => Err(mismatch("endsWith", "String", other)),
        },
    );
}
