//! 基础求值器：字面量、变量、条件、let 与根表达式

use super::{truth, NodeEvaluator};
use crate::core::error::{EvalError, EvalResult};
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::query::node::NodeId;

#[derive(Debug)]
pub struct LiteralEvaluator {
    value: Value,
}

impl LiteralEvaluator {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl NodeEvaluator for LiteralEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        Ok(self.value.clone())
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn cardinality(&self, _query: &CompiledQuery) -> f64 {
        self.value.len().unwrap_or(1) as f64
    }

    fn selectivity(&self, _query: &CompiledQuery) -> f64 {
        match self.value {
            Value::Bool(false) | Value::Null => 0.0,
            _ => 1.0,
        }
    }
}

/// 变量、`thisVertex` 与 `thisEdge`：结果就是当前绑定
#[derive(Debug)]
pub struct VariableEvaluator {
    name: String,
}

impl VariableEvaluator {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn current(&self, ctx: &EvaluationContext<'_>, node: NodeId) -> EvalResult<Value> {
        ctx.binding(node)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(self.name.clone()))
    }
}

impl NodeEvaluator for VariableEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        // 变量不经过缓存，由 Evaluator::get_result 直接读取绑定
        Err(EvalError::internal(format!(
            "变量 {} 只能通过当前绑定求值",
            self.name
        )))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }
}

#[derive(Debug)]
pub struct ConditionalEvaluator {
    pub(crate) condition: NodeId,
    pub(crate) then_branch: NodeId,
    pub(crate) else_branch: NodeId,
}

impl NodeEvaluator for ConditionalEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let condition = ctx.result(self.condition)?;
        if truth(&condition, "条件表达式")? {
            ctx.result(self.then_branch)
        } else {
            ctx.result(self.else_branch)
        }
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        query
            .cardinality(self.then_branch)
            .max(query.cardinality(self.else_branch))
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        (query.selectivity(self.then_branch) + query.selectivity(self.else_branch)) / 2.0
    }
}

/// `let x := e1, y := e2 in bound`，定义按顺序绑定
#[derive(Debug)]
pub struct LetEvaluator {
    pub(crate) definitions: Vec<(NodeId, NodeId)>,
    pub(crate) bound: NodeId,
}

impl NodeEvaluator for LetEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        for &(variable, definition) in &self.definitions {
            let value = ctx.result(definition)?;
            ctx.bind(variable, value);
        }
        ctx.result(self.bound)
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        query.cardinality(self.bound)
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        query.selectivity(self.bound)
    }
}

/// 查询的根：从环境读取 `using` 变量，必要时把结果写回环境
#[derive(Debug)]
pub struct RootEvaluator {
    pub(crate) bound_variables: Vec<NodeId>,
    pub(crate) query: NodeId,
    pub(crate) store_as: Option<String>,
}

impl NodeEvaluator for RootEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let graph = ctx.query().graph();
        for &variable in &self.bound_variables {
            let name = graph
                .variable_name(variable)
                .ok_or_else(|| EvalError::internal(format!("节点 {} 不是变量", variable)))?;
            let value = ctx
                .environment()
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
            ctx.bind(variable, value);
        }

        let result = ctx.result(self.query)?;
        if let Some(name) = &self.store_as {
            ctx.environment_mut().set(name.clone(), result.clone());
        }
        Ok(result)
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        query.cardinality(self.query)
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        query.selectivity(self.query)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::core::error::{EvalError, QueryErrorKind};
    use crate::core::value::Value;
    use crate::expression::compiled::CompiledQuery;
    use crate::expression::context::{EvaluationContext, Environment};
    use crate::expression::functions::FunctionRegistry;
    use crate::graph::{InMemoryGraph, Schema};
    use crate::query::graph::QueryGraph;
    use crate::query::node::NodeKind;

    fn empty_graph() -> InMemoryGraph {
        InMemoryGraph::builder(Schema::new()).build()
    }

    #[test]
    fn test_conditional_null_takes_else_branch() {
        let mut b = QueryGraph::builder();
        let condition = b.literal(Value::Null);
        let yes = b.literal("yes");
        let no = b.literal("no");
        let root = b.add(NodeKind::Conditional {
            condition,
            then_branch: yes,
            else_branch: no,
        });
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        assert_eq!(ctx.result(root), Ok(Value::from("no")));
    }

    #[test]
    fn test_conditional_rejects_non_boolean() {
        let mut b = QueryGraph::builder();
        let condition = b.literal(3i64);
        let yes = b.literal("yes");
        let no = b.literal("no");
        let root = b.add(NodeKind::Conditional {
            condition,
            then_branch: yes,
            else_branch: no,
        });
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        match ctx.result(root) {
            Err(EvalError::Query(err)) => assert_eq!(err.kind, QueryErrorKind::TypeMismatch),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_let_binds_sequentially() {
        // let x := 2, y := mul(x, 3) in add(x, y)
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let y = b.variable("y");
        let two = b.literal(2i64);
        let three = b.literal(3i64);
        let times = b.apply("mul", vec![x, three]);
        let sum = b.apply("add", vec![x, y]);
        let root = b.add(NodeKind::Let {
            definitions: vec![(x, two), (y, times)],
            bound: sum,
        });
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        assert_eq!(ctx.result(root), Ok(Value::Int(8)));
    }

    #[test]
    fn test_root_reads_and_stores_environment() {
        let mut b = QueryGraph::builder();
        let n = b.variable("n");
        let one = b.literal(1i64);
        let sum = b.apply("add", vec![n, one]);
        let root = b.add(NodeKind::Root {
            bound_variables: vec![n],
            query: sum,
            store_as: Some("m".to_string()),
        });
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();

        let mut env = Environment::new();
        {
            let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
            assert_eq!(
                ctx.result(root),
                Err(EvalError::UndefinedVariable("n".to_string()))
            );
        }

        env.set("n", Value::Int(41));
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        assert_eq!(ctx.result(root), Ok(Value::Int(42)));
        drop(ctx);
        assert_eq!(env.get("m"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_unbound_variable() {
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let query = CompiledQuery::new(b.build(x).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        assert_eq!(
            ctx.result(x),
            Err(EvalError::UndefinedVariable("x".to_string()))
        );
        ctx.bind(x, Value::Int(5));
        assert_eq!(ctx.result(x), Ok(Value::Int(5)));
    }
}
