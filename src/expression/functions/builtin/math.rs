//! 算术函数
//!
//! 整数之间的加减乘保持整数并检查溢出，其余情况转为浮点数；null 参数得到 null

use super::mismatch;
use crate::core::error::{EvalResult, QueryError};
use crate::core::value::Value;
use crate::expression::functions::registry::FunctionRegistry;
use crate::expression::functions::FunctionDescriptor;

/// 注册所有算术函数
pub fn register_all(registry: &mut FunctionRegistry) {
    register_integer_preserving(registry);
    register_div_mod(registry);

    registry.register(FunctionDescriptor::new("neg", Some(1)), |call| match call.arg(0) {
        Value::Int(i) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| QueryError::function_failure("neg", "整数溢出").into()),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Null => Ok(Value::Null),
        other => Err(mismatch("neg", "Number", other)),
    });
}

fn numeric_operands(function: &str, a: &Value, b: &Value) -> EvalResult<Option<(f64, f64)>> {
    if a.is_null() || b.is_null() {
        return Ok(None);
    }
    let x = a.as_float().ok_or_else(|| mismatch(function, "Number", a))?;
    let y = b.as_float().ok_or_else(|| mismatch(function, "Number", b))?;
    Ok(Some((x, y)))
}

fn register_integer_preserving(registry: &mut FunctionRegistry) {
    type IntOp = fn(i64, i64) -> Option<i64>;
    type FloatOp = fn(f64, f64) -> f64;
    let ops: [(&'static str, IntOp, FloatOp); 3] = [
        ("add", i64::checked_add, |a, b| a + b),
        ("sub", i64::checked_sub, |a, b| a - b),
        ("mul", i64::checked_mul, |a, b| a * b),
    ];
    for (name, int_op, float_op) in ops {
        registry.register(FunctionDescriptor::new(name, Some(2)), move |call| {
            match (call.arg(0), call.arg(1)) {
                (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
                    .map(Value::Int)
                    .ok_or_else(|| QueryError::function_failure(name, "整数溢出").into()),
                (a, b) => Ok(numeric_operands(name, a, b)?
                    .map(|(x, y)| Value::Float(float_op(x, y)))
                    .unwrap_or(Value::Null)),
            }
        });
    }
}

fn register_div_mod(registry: &mut FunctionRegistry) {
    registry.register(FunctionDescriptor::new("div", Some(2)), |call| {
        match numeric_operands("div", call.arg(0), call.arg(1))? {
            Some((_, y)) if y == 0.0 => Err(QueryError::function_failure("div", "除数为零").into()),
            Some((x, y)) => Ok(Value::Float(x / y)),
            None => Ok(Value::Null),
        }
    });

    registry.register(FunctionDescriptor::new("mod", Some(2)), |call| {
        match (call.arg(0), call.arg(1)) {
            (Value::Int(_), Value::Int(0)) => {
                Err(QueryError::function_failure("mod", "除数为零").into())
            }
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.rem_euclid(*b))),
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(_), other) | (other, _) => Err(mismatch("mod", "Int", other)),
        }
    });
}
