//! 量词表达式：forall / exists / exists!

use super::declaration::DeclarationLayer;
use super::{truth, NodeEvaluator};
use crate::core::error::EvalResult;
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::query::node::{NodeId, Quantifier};

#[derive(Debug)]
pub struct QuantifiedEvaluator {
    pub(crate) quantifier: Quantifier,
    pub(crate) declaration: NodeId,
    pub(crate) bound: NodeId,
}

impl NodeEvaluator for QuantifiedEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let mut layer = DeclarationLayer::new(ctx.query(), self.declaration)?;
        layer.reset(ctx)?;

        let mut matches = 0usize;
        while layer.iterate(ctx)? {
            if !layer.constraints_hold(ctx)? {
                continue;
            }
            let value = ctx.result(self.bound)?;
            let holds = truth(&value, "量词谓词")?;
            match self.quantifier {
                Quantifier::ForAll if !holds => return Ok(Value::Bool(false)),
                Quantifier::Exists if holds => return Ok(Value::Bool(true)),
                Quantifier::ExistsExactlyOne if holds => {
                    matches += 1;
                    if matches > 1 {
                        return Ok(Value::Bool(false));
                    }
                }
                _ => {}
            }
        }

        let result = match self.quantifier {
            Quantifier::ForAll => true,
            Quantifier::Exists => false,
            Quantifier::ExistsExactlyOne => matches == 1,
        };
        Ok(Value::Bool(result))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().quantifier_selectivity
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
    use crate::query::node::{NodeId, NodeKind, Quantifier};

    /// `q x in domain : gt(x, threshold)`
    fn quantified(quantifier: Quantifier, domain: Value, threshold: i64) -> (CompiledQuery, NodeId) {
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let domain = b.literal(domain);
        let simple = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![simple],
            constraints: vec![],
        });
        let limit = b.literal(threshold);
        let bound = b.apply("gt", vec![x, limit]);
        let root = b.add(NodeKind::Quantified {
            quantifier,
            declaration: decl,
            bound,
        });
        let query = CompiledQuery::new(
            b.build(root).expect("构建失败"),
            Arc::new(FunctionRegistry::new()),
        );
        (query, root)
    }

    fn run(quantifier: Quantifier, domain: Vec<i64>, threshold: i64) -> (Value, u64) {
        let values = Value::List(domain.into_iter().map(Value::Int).collect());
        let (query, root) = quantified(quantifier, values, threshold);
        let graph = InMemoryGraph::builder(Schema::new()).build();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let value = ctx.result(root).expect("求值失败");
        (value, ctx.stats().iterations)
    }

    #[test]
    fn test_forall_stops_at_first_counterexample() {
        assert_eq!(run(Quantifier::ForAll, vec![5, 6, 7], 2).0, Value::Bool(true));
        let (value, iterations) = run(Quantifier::ForAll, vec![5, 1, 7, 8], 2);
        assert_eq!(value, Value::Bool(false));
        assert_eq!(iterations, 2);
    }

    #[test]
    fn test_exists_stops_at_first_witness() {
        let (value, iterations) = run(Quantifier::Exists, vec![1, 9, 2, 3], 5);
        assert_eq!(value, Value::Bool(true));
        assert_eq!(iterations, 2);
        assert_eq!(run(Quantifier::Exists, vec![1, 2], 5).0, Value::Bool(false));
    }

    #[test]
    fn test_exists_exactly_one() {
        assert_eq!(
            run(Quantifier::ExistsExactlyOne, vec![1, 9, 2], 5).0,
            Value::Bool(true)
        );
        let (value, iterations) = run(Quantifier::ExistsExactlyOne, vec![9, 8, 7, 1], 5);
        assert_eq!(value, Value::Bool(false));
        assert_eq!(iterations, 2);
        assert_eq!(
            run(Quantifier::ExistsExactlyOne, vec![1, 2], 5).0,
            Value::Bool(false)
        );
    }

    #[test]
    fn test_empty_domain() {
        assert_eq!(run(Quantifier::ForAll, vec![], 0).0, Value::Bool(true));
        assert_eq!(run(Quantifier::Exists, vec![], 0).0, Value::Bool(false));
    }

    #[test]
    fn test_non_boolean_predicate_is_type_mismatch() {
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let domain = b.literal(Value::List(vec![Value::Int(1)]));
        let simple = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![simple],
            constraints: vec![],
        });
        let root = b.add(NodeKind::Quantified {
            quantifier: Quantifier::Exists,
            declaration: decl,
            bound: x,
        });
        let query = CompiledQuery::new(
            b.build(root).expect("构建失败"),
            Arc::new(FunctionRegistry::new()),
        );
        let graph = InMemoryGraph::builder(Schema::new()).build();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        match ctx.result(root) {
            Err(EvalError::Query(err)) => assert_eq!(err.kind, QueryErrorKind::TypeMismatch),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_selectivity_from_config() {
        let (query, root) = quantified(Quantifier::Exists, Value::List(vec![]), 0);
        assert_eq!(query.selectivity(root), query.cost_config().quantifier_selectivity);
    }
}
