//! 逻辑与比较函数
//!
//! null 参与的逻辑运算遵循三值逻辑

use std::cmp::Ordering;

use super::mismatch;
use crate::core::error::EvalResult;
use crate::core::value::Value;
use crate::expression::functions::registry::FunctionRegistry;
use crate::expression::functions::FunctionDescriptor;

/// 注册所有逻辑与比较函数
pub fn register_all(registry: &mut FunctionRegistry) {
    register_connectives(registry);
    register_comparisons(registry);
}

fn truth(function: &str, value: &Value) -> EvalResult<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null => Ok(None),
        other => Err(mismatch(function, "Bool", other)),
    }
}

fn from_truth(value: Option<bool>) -> Value {
    value.map(Value::Bool).unwrap_or(Value::Null)
}

fn register_connectives(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionDescriptor::new("and", Some(2)).with_cost(1.0),
        |call| {
            let a = truth("and", call.arg(0))?;
            let b = truth("and", call.arg(1))?;
            Ok(from_truth(match (a, b) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            }))
        },
    );

    registry.register(
        FunctionDescriptor::new("or", Some(2)).with_cost(1.0),
        |call| {
            let a = truth("or", call.arg(0))?;
            let b = truth("or", call.arg(1))?;
            Ok(from_truth(match (a, b) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            }))
        },
    );

    registry.register(
        FunctionDescriptor::new("xor", Some(2)).with_cost(1.0),
        |call| {
            let a = truth("xor", call.arg(0))?;
            let b = truth("xor", call.arg(1))?;
            Ok(from_truth(match (a, b) {
                (Some(a), Some(b)) => Some(a != b),
                _ => None,
            }))
        },
    );

    registry.register(
        FunctionDescriptor::new("not", Some(1)).with_cost(1.0),
        |call| Ok(from_truth(truth("not", call.arg(0))?.map(|b| !b))),
    );
}

/// 数值之间按数值比较，其余同类型值按全序比较
fn compare(function: &str, a: &Value, b: &Value) -> EvalResult<Option<Ordering>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    if let Some(ordering) = a.compare_numeric(b) {
        return Ok(Some(ordering));
    }
    if std::mem::discriminant(a) == std::mem::discriminant(b) {
        return Ok(Some(a.cmp(b)));
    }
    Err(mismatch(function, a.type_name(), b))
}

fn register_comparisons(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionDescriptor::new("equals", Some(2)).with_selectivity(0.1),
        |call| {
            let (a, b) = (call.arg(0), call.arg(1));
            match a.compare_numeric(b) {
                Some(ordering) => Ok(Value::Bool(ordering == Ordering::Equal)),
                None => Ok(Value::Bool(a == b)),
            }
        },
    );

    registry.register(
        FunctionDescriptor::new("nequals", Some(2)).with_selectivity(0.9),
        |call| {
            let (a, b) = (call.arg(0), call.arg(1));
            match a.compare_numeric(b) {
                Some(ordering) => Ok(Value::Bool(ordering != Ordering::Equal)),
                None => Ok(Value::Bool(a != b)),
            }
        },
    );

    type Test = fn(Ordering) -> bool;
    let tests: [(&'static str, Test); 4] = [
        ("lt", |o| o == Ordering::Less),
        ("leq", |o| o != Ordering::Greater),
        ("gt", |o| o == Ordering::Greater),
        ("geq", |o| o != Ordering::Less),
    ];
    for (name, test) in tests {
        registry.register(
            FunctionDescriptor::new(name, Some(2)).with_selectivity(0.3),
            move |call| Ok(from_truth(compare(name, call.arg(0), call.arg(1))?.map(test))),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::core::value::Value;
    use crate::expression::functions::{FunctionCall, FunctionLibrary, FunctionRegistry};

    fn call(registry: &FunctionRegistry, name: &str, args: Vec<Value>) -> Value {
        let descriptor = registry.lookup(name).expect("函数不存在");
        registry
            .apply(&descriptor, FunctionCall::new(args))
            .expect("执行失败")
    }

    #[test]
    fn test_three_valued_logic() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            call(&registry, "and", vec![Value::Null, Value::Bool(false)]),
            Value::Bool(false)
        );
        assert_eq!(call(&registry, "and", vec![Value::Null, Value::Bool(true)]), Value::Null);
        assert_eq!(
            call(&registry, "or", vec![Value::Null, Value::Bool(true)]),
            Value::Bool(true)
        );
        assert_eq!(call(&registry, "not", vec![Value::Bool(true)]), Value::Bool(false));
        assert_eq!(
            call(&registry, "xor", vec![Value::Bool(true), Value::Bool(false)]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_comparisons() {
        let registry = FunctionRegistry::new();
        assert_eq!(
            call(&registry, "equals", vec![Value::Int(1), Value::Float(1.0)]),
            Value::Bool(true)
        );
        assert_eq!(
            call(&registry, "lt", vec![Value::Int(1), Value::Float(1.5)]),
            Value::Bool(true)
        );
        assert_eq!(
            call(&registry, "geq", vec!["b".into(), "a".into()]),
            Value::Bool(true)
        );
        assert_eq!(call(&registry, "gt", vec![Value::Null, Value::Int(1)]), Value::Null);
    }

    #[test]
    fn test_incomparable_types() {
        let registry = FunctionRegistry::new();
        let descriptor = registry.lookup("lt").expect("函数不存在");
        let result = registry.apply(
            &descriptor,
            FunctionCall::new(vec![Value::Int(1), "a".into()]),
        );
        assert!(result.is_err());
        let descriptor = registry.lookup("and").expect("函数不存在");
        assert!(registry
            .apply(&descriptor, FunctionCall::new(vec![Value::Int(1), Value::Bool(true)]))
            .is_err());
    }
}
