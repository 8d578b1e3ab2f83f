//! 函数应用求值器
//!
//! 构造时按名字查得函数描述，求值时按描述的标志组装参数

use super::NodeEvaluator;
use crate::core::error::{EvalError, EvalResult, QueryError};
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::expression::functions::{FunctionCall, FunctionDescriptor};
use crate::query::node::NodeId;

#[derive(Debug)]
pub struct FunctionApplicationEvaluator {
    node: NodeId,
    name: String,
    /// 函数库中没有该函数时为空，求值时报错
    descriptor: Option<FunctionDescriptor>,
    args: Vec<NodeId>,
}

impl FunctionApplicationEvaluator {
    pub fn new(query: &CompiledQuery, node: NodeId, name: &str, args: Vec<NodeId>) -> Self {
        let descriptor = query.functions().lookup(name);
        if descriptor.is_none() {
            log::debug!("函数 {} 未注册，节点 {}", name, node);
        }
        Self {
            node,
            name: name.to_string(),
            descriptor,
            args,
        }
    }

    pub fn descriptor(&self) -> Option<&FunctionDescriptor> {
        self.descriptor.as_ref()
    }
}

impl NodeEvaluator for FunctionApplicationEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let descriptor = self
            .descriptor
            .as_ref()
            .ok_or_else(|| EvalError::UnknownFunction(self.name.clone()))?;
        if let Some(expected) = descriptor.arg_count {
            if expected != self.args.len() {
                return Err(QueryError::invalid_argument(format!(
                    "函数 {} 需要 {} 个参数, 实际 {}",
                    self.name,
                    expected,
                    self.args.len()
                ))
                .into());
            }
        }

        let mut args = Vec::with_capacity(self.args.len());
        for &arg in &self.args {
            args.push(ctx.result(arg)?);
        }

        let mut call = FunctionCall::new(args);
        if descriptor.needs_graph_arg {
            call.graph = Some(ctx.graph());
        }
        if descriptor.needs_evaluator_arg {
            call.caller = Some(self.node);
        }
        ctx.query().functions().apply(descriptor, call)
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        self.descriptor
            .as_ref()
            .and_then(|d| d.cost)
            .unwrap_or(query.cost_config().function_cost)
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        self.descriptor
            .as_ref()
            .and_then(|d| d.selectivity)
            .unwrap_or(query.cost_config().function_selectivity)
    }
}
