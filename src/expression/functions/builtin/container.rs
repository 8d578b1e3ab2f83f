//! 容器函数
//!
//! count, isEmpty, contains, concat, toSet, get

use std::collections::BTreeSet;

use super::mismatch;
use crate::core::value::Value;
use crate::expression::functions::registry::FunctionRegistry;
use crate::expression::functions::FunctionDescriptor;

/// 注册所有容器函数
pub fn register_all(registry: &mut FunctionRegistry) {
    registry.register(FunctionDescriptor::new("count", Some(1)), |call| {
        match call.arg(0) {
            Value::Null => Ok(Value::Int(0)),
            value => value
                .len()
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| mismatch("count", "Collection", value)),
        }
    });

    registry.register(FunctionDescriptor::new("isEmpty", Some(1)), |call| {
        match call.arg(0) {
            Value::Null => Ok(Value::Bool(true)),
            value => value
                .len()
                .map(|n| Value::Bool(n == 0))
                .ok_or_else(|| mismatch("isEmpty", "Collection", value)),
        }
    });

    registry.register(
        FunctionDescriptor::new("contains", Some(2)).with_selectivity(0.2),
        |call| {
            let element = call.arg(1);
            match call.arg(0) {
                Value::List(items) | Value::Tuple(items) => Ok(Value::Bool(items.contains(element))),
                Value::Set(items) => Ok(Value::Bool(items.contains(element))),
                Value::Map(entries) => Ok(Value::Bool(entries.contains_key(element))),
                Value::Table(table) => Ok(Value::Bool(table.rows.contains(element))),
                Value::String(s) => match element {
                    Value::String(sub) => Ok(Value::Bool(s.contains(sub.as_str()))),
                    other => Err(mismatch("contains", "String", other)),
                },
                Value::Null => Ok(Value::Bool(false)),
                other => Err(mismatch("contains", "Collection", other)),
            }
        },
    );

    registry.register(FunctionDescriptor::new("concat", Some(2)), |call| {
        match (call.arg(0), call.arg(1)) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::Set(a), Value::Set(b)) => Ok(Value::Set(a.union(b).cloned().collect())),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (a, _) => Err(mismatch("concat", "String, List or Set", a)),
        }
    });

    registry.register(FunctionDescriptor::new("toSet", Some(1)), |call| {
        match call.arg(0) {
            Value::Set(items) => Ok(Value::Set(items.clone())),
            Value::Null => Ok(Value::Set(BTreeSet::new())),
            value => value
                .elements()
                .map(|items| Value::Set(items.into_iter().collect()))
                .ok_or_else(|| mismatch("toSet", "Collection", value)),
        }
    });

    registry.register(FunctionDescriptor::new("get", Some(2)), |call| {
        match (call.arg(0), call.arg(1)) {
            (Value::List(items) | Value::Tuple(items), Value::Int(i)) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Null)),
            (Value::Map(entries), key) => Ok(entries.get(key).cloned().unwrap_or(Value::Null)),
            (Value::Record(fields), Value::String(name)) => {
                Ok(fields.get(name).cloned().unwrap_or(Value::Null))
            }
            (Value::Null, _) => Ok(Value::Null),
            (container, _) => Err(mismatch("get", "List, Map or Record", container)),
        }
    });
}
