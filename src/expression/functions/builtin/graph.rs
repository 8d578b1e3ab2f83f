//! 图相关函数实现
//!
//! 提供顶点和边的操作函数，包括 degree, typeName, hasType, alpha, omega, that

use super::mismatch;
use crate::core::error::{EvalResult, QueryError};
use crate::core::value::Value;
use crate::core::vertex_edge_path::EdgeDirection;
use crate::expression::functions::registry::FunctionRegistry;
use crate::expression::functions::{FunctionCall, FunctionDescriptor};
use crate::graph::DataGraph;

/// 注册所有图相关函数
pub fn register_all(registry: &mut FunctionRegistry) {
    register_degree(registry);
    register_type_functions(registry);
    register_endpoints(registry);
}

fn graph<'a>(function: &str, call: &FunctionCall<'a>) -> EvalResult<&'a dyn DataGraph> {
    call.graph
        .ok_or_else(|| QueryError::function_failure(function, "调用时没有提供数据图").into())
}

fn direction(function: &str, value: &Value) -> EvalResult<EdgeDirection> {
    match value {
        Value::Null => Ok(EdgeDirection::Both),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "out" => Ok(EdgeDirection::Out),
            "in" => Ok(EdgeDirection::In),
            "both" | "inout" => Ok(EdgeDirection::Both),
            _ => Err(QueryError::invalid_argument(format!("{}: 未知方向 {}", function, s)).into()),
        },
        other => Err(mismatch(function, "String", other)),
    }
}

fn register_degree(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionDescriptor::new("degree", None).with_graph(),
        |call| {
            let g = graph("degree", call)?;
            if call.args.is_empty() || call.args.len() > 2 {
                return Err(QueryError::invalid_argument("degree 需要 1 或 2 个参数").into());
            }
            let dir = direction("degree", call.arg(1))?;
            match call.arg(0) {
                Value::Vertex(v) => Ok(Value::Int(g.degree(*v, dir) as i64)),
                Value::Null => Ok(Value::Null),
                other => Err(mismatch("degree", "Vertex", other)),
            }
        },
    );
}

fn register_type_functions(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionDescriptor::new("typeName", Some(1)).with_graph(),
        |call| {
            let g = graph("typeName", call)?;
            let class = match call.arg(0) {
                Value::Vertex(v) => g.vertex_class(*v),
                Value::Edge(e) => g.edge_class(*e),
                Value::Null => return Ok(Value::Null),
                other => return Err(mismatch("typeName", "Vertex or Edge", other)),
            };
            Ok(class
                .map(|c| Value::String(g.schema().class_name(c).to_string()))
                .unwrap_or(Value::Null))
        },
    );

    registry.register(
        FunctionDescriptor::new("hasType", Some(2))
            .with_graph()
            .with_selectivity(0.3),
        |call| {
            let g = graph("hasType", call)?;
            let name = match call.arg(1) {
                Value::String(s) => s,
                other => return Err(mismatch("hasType", "String", other)),
            };
            let schema = g.schema();
            let target = schema
                .class_by_name(name)
                .ok_or_else(|| crate::core::error::EvalError::UnknownType(name.clone()))?;
            let class = match call.arg(0) {
                Value::Vertex(v) => g.vertex_class(*v),
                Value::Edge(e) => g.edge_class(*e),
                Value::Null => return Ok(Value::Null),
                other => return Err(mismatch("hasType", "Vertex or Edge", other)),
            };
            Ok(Value::Bool(
                class.is_some_and(|c| schema.is_subclass(c, target)),
            ))
        },
    );
}

fn register_endpoints(registry: &mut FunctionRegistry) {
    registry.register(
        FunctionDescriptor::new("alpha", Some(1)).with_graph(),
        |call| {
            let g = graph("alpha", call)?;
            match call.arg(0) {
                Value::Edge(e) => Ok(g.alpha(*e).map(Value::Vertex).unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(mismatch("alpha", "Edge", other)),
            }
        },
    );

    registry.register(
        FunctionDescriptor::new("omega", Some(1)).with_graph(),
        |call| {
            let g = graph("omega", call)?;
            match call.arg(0) {
                Value::Edge(e) => Ok(g.omega(*e).map(Value::Vertex).unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(mismatch("omega", "Edge", other)),
            }
        },
    );

    // 边在给定顶点另一端的顶点
    registry.register(
        FunctionDescriptor::new("that", Some(2)).with_graph(),
        |call| {
            let g = graph("that", call)?;
            match (call.arg(0), call.arg(1)) {
                (Value::Edge(e), Value::Vertex(v)) => {
                    let (a, o) = (g.alpha(*e), g.omega(*e));
                    Ok(if a == Some(*v) {
                        o.map(Value::Vertex).unwrap_or(Value::Null)
                    } else if o == Some(*v) {
                        a.map(Value::Vertex).unwrap_or(Value::Null)
                    } else {
                        Value::Null
                    })
                }
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Edge(_), other) => Err(mismatch("that", "Vertex", other)),
                (other, _) => Err(mismatch("that", "Edge", other)),
            }
        },
    );
}
