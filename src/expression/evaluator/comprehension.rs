//! 推导式：按声明层产生的变量组合收集结果
//!
//! 不满足约束的组合被跳过；`maxCount` 达到后立即停止迭代，
//! 不再求值剩余组合

use std::collections::{BTreeMap, BTreeSet};

use super::declaration::DeclarationLayer;
use super::NodeEvaluator;
use crate::core::error::{EvalError, EvalResult, QueryError};
use crate::core::value::{Table, Value};
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::query::node::{ComprehensionKind, NodeId, NodeKind};

#[derive(Debug)]
pub struct ComprehensionEvaluator {
    pub(crate) kind: ComprehensionKind,
    pub(crate) declaration: NodeId,
    pub(crate) result: NodeId,
    pub(crate) key: Option<NodeId>,
    pub(crate) max_count: Option<NodeId>,
}

/// 收集中的结果
enum Collector {
    Set(BTreeSet<Value>),
    List(Vec<Value>),
    Map(BTreeMap<Value, Value>),
    Table(Table),
}

impl Collector {
    fn new(kind: &ComprehensionKind) -> Self {
        match kind {
            ComprehensionKind::Set => Collector::Set(BTreeSet::new()),
            ComprehensionKind::List => Collector::List(Vec::new()),
            ComprehensionKind::Map => Collector::Map(BTreeMap::new()),
            ComprehensionKind::Table { headers } => Collector::Table(Table::new(headers.clone())),
        }
    }

    fn len(&self) -> usize {
        match self {
            Collector::Set(s) => s.len(),
            Collector::List(l) => l.len(),
            Collector::Map(m) => m.len(),
            Collector::Table(t) => t.rows.len(),
        }
    }

    fn insert(&mut self, key: Option<Value>, value: Value) -> EvalResult<()> {
        match self {
            Collector::Set(s) => {
                s.insert(value);
            }
            Collector::List(l) => l.push(value),
            Collector::Map(m) => {
                let key = key.ok_or_else(|| EvalError::internal("映射推导式缺少键表达式"))?;
                m.insert(key, value);
            }
            Collector::Table(t) => {
                let row = match key {
                    Some(key) => Value::Tuple(vec![key, value]),
                    None => value,
                };
                t.rows.push(row);
            }
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self {
            Collector::Set(s) => Value::Set(s),
            Collector::List(l) => Value::List(l),
            Collector::Map(m) => Value::Map(m),
            Collector::Table(t) => Value::Table(t),
        }
    }
}

impl ComprehensionEvaluator {
    fn max_count(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Option<usize>> {
        let Some(node) = self.max_count else {
            return Ok(None);
        };
        match ctx.result(node)? {
            Value::Int(n) if n >= 0 => Ok(Some(n as usize)),
            Value::Null => Ok(None),
            other => Err(QueryError::invalid_argument(format!(
                "maxCount 必须是非负整数, 实际 {}",
                other
            ))
            .into()),
        }
    }

    /// 字面量形式的 `maxCount`，用于基数估算
    fn literal_max_count(&self, query: &CompiledQuery) -> Option<f64> {
        match query.graph().kind(self.max_count?)? {
            NodeKind::Literal(Value::Int(n)) if *n >= 0 => Some(*n as f64),
            _ => None,
        }
    }
}

impl NodeEvaluator for ComprehensionEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let max = self.max_count(ctx)?;
        let mut layer = DeclarationLayer::new(ctx.query(), self.declaration)?;
        layer.reset(ctx)?;

        let mut collector = Collector::new(&self.kind);
        while max.map_or(true, |m| collector.len() < m) && layer.iterate(ctx)? {
            if !layer.constraints_hold(ctx)? {
                continue;
            }
            let key = match self.key {
                Some(node) => Some(ctx.result(node)?),
                None => None,
            };
            let value = ctx.result(self.result)?;
            collector.insert(key, value)?;
        }
        Ok(collector.finish())
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * query.cardinality(self.declaration)
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        let estimate = query.cardinality(self.declaration);
        match self.literal_max_count(query) {
            Some(max) => estimate.min(max),
            None => estimate,
        }
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
    use crate::query::graph::{QueryGraph, QueryGraphBuilder};
    use crate::query::node::{ComprehensionKind, NodeId, NodeKind};

    /// 声明 `x in domain`，返回 (x, 声明)
    fn declare(b: &mut QueryGraphBuilder, domain: Value) -> (NodeId, NodeId) {
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
        (x, decl)
    }

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }

    fn evaluate(b: QueryGraphBuilder, root: NodeId) -> (Result<Value, EvalError>, u64) {
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = InMemoryGraph::builder(Schema::new()).build();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let result = ctx.result(root);
        (result, ctx.stats().iterations)
    }

    #[test]
    fn test_list_and_set_comprehension() {
        // list / set of mod(x, 2) for x in [1, 2, 3, 4]
        for (kind, expected) in [
            (
                ComprehensionKind::List,
                Value::List(vec![Value::Int(1), Value::Int(0), Value::Int(1), Value::Int(0)]),
            ),
            (
                ComprehensionKind::Set,
                Value::Set([0, 1].into_iter().map(Value::Int).collect()),
            ),
        ] {
            let mut b = QueryGraph::builder();
            let (x, decl) = declare(&mut b, ints(&[1, 2, 3, 4]));
            let two = b.literal(2i64);
            let result = b.apply("mod", vec![x, two]);
            let root = b.add(NodeKind::Comprehension {
                kind,
                declaration: decl,
                result,
                key: None,
                max_count: None,
            });
            assert_eq!(evaluate(b, root).0, Ok(expected));
        }
    }

    #[test]
    fn test_max_count_stops_iteration() {
        let mut b = QueryGraph::builder();
        let range: Vec<i64> = (0..1000).collect();
        let (x, decl) = declare(&mut b, ints(&range));
        let five = b.literal(5i64);
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            declaration: decl,
            result: x,
            key: None,
            max_count: Some(five),
        });
        let (result, iterations) = evaluate(b, root);
        assert_eq!(result, Ok(ints(&[0, 1, 2, 3, 4])));
        assert!(iterations <= 5);
    }

    #[test]
    fn test_negative_max_count_rejected() {
        let mut b = QueryGraph::builder();
        let (x, decl) = declare(&mut b, ints(&[1]));
        let limit = b.literal(-1i64);
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            declaration: decl,
            result: x,
            key: None,
            max_count: Some(limit),
        });
        match evaluate(b, root).0 {
            Err(EvalError::Query(err)) => assert_eq!(err.kind, QueryErrorKind::InvalidArgument),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_map_comprehension_later_key_wins() {
        // map mod(x, 2) -> x for x in [1, 2, 3]
        let mut b = QueryGraph::builder();
        let (x, decl) = declare(&mut b, ints(&[1, 2, 3]));
        let two = b.literal(2i64);
        let key = b.apply("mod", vec![x, two]);
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::Map,
            declaration: decl,
            result: x,
            key: Some(key),
            max_count: None,
        });
        let expected = Value::Map(
            [(Value::Int(1), Value::Int(3)), (Value::Int(0), Value::Int(2))]
                .into_iter()
                .collect(),
        );
        assert_eq!(evaluate(b, root).0, Ok(expected));
    }

    #[test]
    fn test_table_comprehension_rows() {
        let mut b = QueryGraph::builder();
        let (x, decl) = declare(&mut b, ints(&[1, 2]));
        let ten = b.literal(10i64);
        let scaled = b.apply("mul", vec![x, ten]);
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::Table {
                headers: vec!["x".to_string(), "scaled".to_string()],
            },
            declaration: decl,
            result: scaled,
            key: Some(x),
            max_count: None,
        });
        match evaluate(b, root).0 {
            Ok(Value::Table(table)) => {
                assert_eq!(table.headers, vec!["x", "scaled"]);
                assert_eq!(
                    table.rows,
                    vec![
                        Value::Tuple(vec![Value::Int(1), Value::Int(10)]),
                        Value::Tuple(vec![Value::Int(2), Value::Int(20)]),
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_constraints_filter_combinations() {
        // list x for x in [1, 2, 3, 4, 5] with gt(x, 3)
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let domain = b.literal(ints(&[1, 2, 3, 4, 5]));
        let three = b.literal(3i64);
        let constraint = b.apply("gt", vec![x, three]);
        let simple = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![simple],
            constraints: vec![constraint],
        });
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            declaration: decl,
            result: x,
            key: None,
            max_count: None,
        });
        assert_eq!(evaluate(b, root).0, Ok(ints(&[4, 5])));
    }

    #[test]
    fn test_duplicate_domain_value() {
        let mut b = QueryGraph::builder();
        let (x, decl) = declare(
            &mut b,
            Value::List(vec!["a".into(), "a".into(), "b".into()]),
        );
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            declaration: decl,
            result: x,
            key: None,
            max_count: None,
        });
        assert_eq!(
            evaluate(b, root).0,
            Err(EvalError::DomainDuplicateValue {
                variable: "x".to_string(),
                length: 3,
                distinct: 2,
            })
        );
    }

    #[test]
    fn test_cardinality_capped_by_literal_max_count() {
        let mut b = QueryGraph::builder();
        let (x, decl) = declare(&mut b, ints(&[1, 2, 3, 4, 5, 6, 7, 8]));
        let three = b.literal(3i64);
        let root = b.add(NodeKind::Comprehension {
            kind: ComprehensionKind::List,
            declaration: decl,
            result: x,
            key: None,
            max_count: Some(three),
        });
        let query = CompiledQuery::new(b.build(root).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        assert_eq!(query.cardinality(root), 3.0);
        assert_eq!(query.own_cost(root), 8.0);
    }
}
