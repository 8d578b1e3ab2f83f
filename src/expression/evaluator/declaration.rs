//! 变量声明层
//!
//! 一个声明把若干变量绑定到各自的取值域，按里程表顺序遍历它们的笛卡尔积：
//! 最后一个变量变化最快，某一层取值用尽时回到上一层前进一步。
//! 约束条件不在这里过滤，由使用声明的推导式和量词在每次迭代后检查

use std::collections::BTreeSet;

use super::{truth, NodeEvaluator};
use crate::core::error::{EvalError, EvalResult};
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::query::node::{NodeId, NodeKind};

/// 声明节点本身没有值，只提供代价估算
#[derive(Debug)]
pub struct DeclarationEvaluator {
    pub(crate) simple_declarations: Vec<NodeId>,
    pub(crate) constraints: Vec<NodeId>,
}

impl DeclarationEvaluator {
    /// 不考虑约束时的组合数
    fn unfiltered_combinations(&self, query: &CompiledQuery) -> f64 {
        self.simple_declarations
            .iter()
            .map(|s| query.cardinality(*s))
            .product()
    }
}

impl NodeEvaluator for DeclarationEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        Err(EvalError::internal("声明节点没有值"))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().combination_cost * self.unfiltered_combinations(query)
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        let selectivity: f64 = self
            .constraints
            .iter()
            .map(|c| query.selectivity(*c))
            .product();
        self.unfiltered_combinations(query) * selectivity
    }
}

#[derive(Debug)]
pub struct SimpleDeclarationEvaluator {
    pub(crate) variables: Vec<NodeId>,
    pub(crate) domain: NodeId,
}

impl NodeEvaluator for SimpleDeclarationEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        Err(EvalError::internal("简单声明节点没有值"))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().simple_cost
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        query.cardinality(self.domain).powi(self.variables.len() as i32)
    }
}

/// 里程表的一位：一个变量及其当前取值域
#[derive(Debug)]
struct Level {
    variable: NodeId,
    domain: NodeId,
    /// 取值域引用了本声明中更早的变量，每次进入这一位都要重新求值
    dependent: bool,
    values: Vec<Value>,
    position: usize,
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Enter,
    Step,
}

/// 一次求值中某个声明的迭代状态
///
/// 由推导式或量词在求值时创建，不跨求值保存
#[derive(Debug)]
pub struct DeclarationLayer<'q> {
    query: &'q CompiledQuery,
    levels: Vec<Level>,
    constraints: Vec<NodeId>,
    started: bool,
    exhausted: bool,
}

impl<'q> DeclarationLayer<'q> {
    pub fn new(query: &'q CompiledQuery, declaration: NodeId) -> EvalResult<Self> {
        let graph = query.graph();
        let Some(NodeKind::Declaration {
            simple_declarations,
            constraints,
        }) = graph.kind(declaration)
        else {
            return Err(EvalError::internal(format!(
                "节点 {} 不是声明",
                declaration
            )));
        };

        let mut levels: Vec<Level> = Vec::new();
        for &simple in simple_declarations {
            let Some(NodeKind::SimpleDeclaration { variables, domain }) = graph.kind(simple)
            else {
                return Err(EvalError::internal(format!("节点 {} 不是简单声明", simple)));
            };
            for &variable in variables {
                let free = query.free_variables(*domain);
                let dependent = levels.iter().any(|l| free.contains(&l.variable));
                levels.push(Level {
                    variable,
                    domain: *domain,
                    dependent,
                    values: Vec::new(),
                    position: 0,
                });
            }
        }

        Ok(Self {
            query,
            levels,
            constraints: constraints.clone(),
            started: false,
            exhausted: false,
        })
    }

    /// 声明的变量，按里程表顺序
    pub fn variables(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.levels.iter().map(|l| l.variable)
    }

    /// 重新求值不依赖本层变量的取值域，并回到第一个组合之前
    pub fn reset(&mut self, ctx: &mut EvaluationContext<'_>) -> EvalResult<()> {
        for index in 0..self.levels.len() {
            if !self.levels[index].dependent {
                self.materialize(ctx, index)?;
            }
            self.levels[index].position = 0;
        }
        self.started = false;
        self.exhausted = false;
        log::debug!(
            "声明层重置: {} 个变量, 取值域大小 {:?}",
            self.levels.len(),
            self.levels
                .iter()
                .filter(|l| !l.dependent)
                .map(|l| l.values.len())
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    /// 前进到下一个组合并绑定变量；组合用尽后返回 false
    pub fn iterate(&mut self, ctx: &mut EvaluationContext<'_>) -> EvalResult<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let found = if !self.started {
            self.started = true;
            self.seek(ctx, 0, Move::Enter)?
        } else if self.levels.is_empty() {
            false
        } else {
            self.seek(ctx, self.levels.len() - 1, Move::Step)?
        };
        if found {
            ctx.record_iteration();
            ctx.add_progress(1.0)?;
        } else {
            self.exhausted = true;
        }
        Ok(found)
    }

    /// 当前组合是否满足全部约束；null 视为不满足
    pub fn constraints_hold(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<bool> {
        for &constraint in &self.constraints {
            let value = ctx.result(constraint)?;
            if !truth(&value, "声明约束")? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// 移动里程表直到得到下一个完整组合
    ///
    /// `Enter` 把 `level` 置于取值域的第一个值，`Step` 让它前进一步。
    /// 某位取值域为空或用尽时回到前一位前进，第 0 位用尽即结束
    fn seek(
        &mut self,
        ctx: &mut EvaluationContext<'_>,
        level: usize,
        movement: Move,
    ) -> EvalResult<bool> {
        let mut level = level;
        let mut movement = movement;
        loop {
            match movement {
                Move::Enter => {
                    if level == self.levels.len() {
                        return Ok(true);
                    }
                    if self.levels[level].dependent {
                        self.materialize(ctx, level)?;
                    }
                    self.levels[level].position = 0;
                }
                Move::Step => self.levels[level].position += 1,
            }

            let current = &self.levels[level];
            if current.position < current.values.len() {
                self.bind(ctx, level);
                level += 1;
                movement = Move::Enter;
            } else if level == 0 {
                return Ok(false);
            } else {
                level -= 1;
                movement = Move::Step;
            }
        }
    }

    fn bind(&self, ctx: &mut EvaluationContext<'_>, level: usize) {
        let current = &self.levels[level];
        if let Some(value) = current.values.get(current.position) {
            ctx.bind(current.variable, value.clone());
        }
    }

    /// 求值取值域并转换为按迭代顺序排列的不重复值
    fn materialize(&mut self, ctx: &mut EvaluationContext<'_>, level: usize) -> EvalResult<()> {
        let domain = self.levels[level].domain;
        let value = ctx.result(domain)?;
        let values = match value {
            Value::List(items) | Value::Tuple(items) => {
                let distinct = items.iter().collect::<BTreeSet<_>>().len();
                if distinct != items.len() {
                    let variable = self.levels[level].variable;
                    let name = self
                        .query
                        .graph()
                        .variable_name(variable)
                        .unwrap_or("?")
                        .to_string();
                    return Err(EvalError::DomainDuplicateValue {
                        variable: name,
                        length: items.len(),
                        distinct,
                    });
                }
                items
            }
            Value::Null => Vec::new(),
            other => match other.elements() {
                Some(items) => items,
                None => vec![other],
            },
        };
        self.levels[level].values = values;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::expression::context::Environment;
    use crate::expression::functions::FunctionRegistry;
    use crate::graph::{InMemoryGraph, Schema};
    use crate::query::graph::QueryGraph;

    fn list(items: impl IntoIterator<Item = i64>) -> Value {
        Value::List(items.into_iter().map(Value::Int).collect())
    }

    /// 返回 (查询, 声明节点, 变量)
    fn declaration(domains: Vec<Value>) -> (CompiledQuery, NodeId, Vec<NodeId>) {
        let mut b = QueryGraph::builder();
        let mut simple = Vec::new();
        let mut vars = Vec::new();
        for (i, domain) in domains.into_iter().enumerate() {
            let var = b.variable(&format!("x{}", i));
            let domain = b.literal(domain);
            simple.push(b.add(NodeKind::SimpleDeclaration {
                variables: vec![var],
                domain,
            }));
            vars.push(var);
        }
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: simple,
            constraints: vec![],
        });
        let graph = b.build(decl).expect("构建失败");
        (
            CompiledQuery::new(graph, Arc::new(FunctionRegistry::new())),
            decl,
            vars,
        )
    }

    fn empty_graph() -> InMemoryGraph {
        InMemoryGraph::builder(Schema::new()).build()
    }

    #[test]
    fn test_cartesian_product_in_odometer_order() {
        let (query, decl, vars) = declaration(vec![list(1..=2), list(10..=11)]);
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        let mut seen = Vec::new();
        while layer.iterate(&mut ctx).expect("迭代失败") {
            seen.push((
                ctx.binding(vars[0]).cloned(),
                ctx.binding(vars[1]).cloned(),
            ));
        }
        let expected: Vec<_> = [(1, 10), (1, 11), (2, 10), (2, 11)]
            .into_iter()
            .map(|(a, b)| (Some(Value::Int(a)), Some(Value::Int(b))))
            .collect();
        assert_eq!(seen, expected);
        assert!(!layer.iterate(&mut ctx).expect("迭代失败"));
    }

    #[test]
    fn test_empty_domain_yields_nothing() {
        let (query, decl, _) = declaration(vec![list(1..=3), Value::List(vec![])]);
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");
        assert!(!layer.iterate(&mut ctx).expect("迭代失败"));
    }

    #[test]
    fn test_scalar_domain_is_singleton_and_set_keeps_order() {
        let set = Value::Set([3, 1, 2].into_iter().map(Value::Int).collect());
        let (query, decl, vars) = declaration(vec![Value::Int(7), set]);
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        let mut seen = Vec::new();
        while layer.iterate(&mut ctx).expect("迭代失败") {
            assert_eq!(ctx.binding(vars[0]), Some(&Value::Int(7)));
            seen.push(ctx.binding(vars[1]).cloned());
        }
        assert_eq!(
            seen,
            vec![
                Some(Value::Int(1)),
                Some(Value::Int(2)),
                Some(Value::Int(3))
            ]
        );
    }

    #[test]
    fn test_dependent_domain_is_rematerialized() {
        // x in [1, 2, 3], y in [x .. 3]
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let y = b.variable("y");
        let xs = b.literal(list(1..=3));
        let three = b.literal(3i64);
        let ys = b.add(NodeKind::ListRange { first: x, last: three });
        let sx = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain: xs,
        });
        let sy = b.add(NodeKind::SimpleDeclaration {
            variables: vec![y],
            domain: ys,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![sx, sy],
            constraints: vec![],
        });
        let query = CompiledQuery::new(b.build(decl).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        let mut pairs = Vec::new();
        while layer.iterate(&mut ctx).expect("迭代失败") {
            pairs.push((
                ctx.binding(x).and_then(Value::as_int),
                ctx.binding(y).and_then(Value::as_int),
            ));
        }
        let expected: Vec<_> = [(1, 1), (1, 2), (1, 3), (2, 2), (2, 3), (3, 3)]
            .into_iter()
            .map(|(a, b)| (Some(a), Some(b)))
            .collect();
        assert_eq!(pairs, expected);
    }

    #[test]
    fn test_long_run_of_empty_dependent_domains() {
        // x in [1 .. 20000], y in [x .. 0]：每个 x 对应的 y 取值域都为空
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let y = b.variable("y");
        let xs = b.literal(list(1..=20_000));
        let zero = b.literal(0i64);
        let ys = b.add(NodeKind::ListRange { first: x, last: zero });
        let sx = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain: xs,
        });
        let sy = b.add(NodeKind::SimpleDeclaration {
            variables: vec![y],
            domain: ys,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![sx, sy],
            constraints: vec![],
        });
        let query = CompiledQuery::new(b.build(decl).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        assert!(!layer.iterate(&mut ctx).expect("迭代失败"));
        assert!(!layer.iterate(&mut ctx).expect("迭代失败"));
        assert_eq!(ctx.stats().iterations, 0);
    }

    #[test]
    fn test_empty_dependent_domains_are_skipped() {
        // x in [1, 2, 3, 4], y in [x .. 2]：只有 x = 1, 2 时 y 有值
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let y = b.variable("y");
        let xs = b.literal(list([3, 1, 4, 2]));
        let two = b.literal(2i64);
        let ys = b.add(NodeKind::ListRange { first: x, last: two });
        let sx = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain: xs,
        });
        let sy = b.add(NodeKind::SimpleDeclaration {
            variables: vec![y],
            domain: ys,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![sx, sy],
            constraints: vec![],
        });
        let query = CompiledQuery::new(b.build(decl).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        let mut pairs = Vec::new();
        while layer.iterate(&mut ctx).expect("迭代失败") {
            pairs.push((
                ctx.binding(x).and_then(Value::as_int),
                ctx.binding(y).and_then(Value::as_int),
            ));
        }
        assert_eq!(
            pairs,
            vec![(Some(1), Some(1)), (Some(1), Some(2)), (Some(2), Some(2))]
        );
    }

    #[test]
    fn test_constraints_hold() {
        // x in [1, 2, 3, 4] with gt(x, 2)
        let mut b = QueryGraph::builder();
        let x = b.variable("x");
        let xs = b.literal(list(1..=4));
        let two = b.literal(2i64);
        let constraint = b.apply("gt", vec![x, two]);
        let sx = b.add(NodeKind::SimpleDeclaration {
            variables: vec![x],
            domain: xs,
        });
        let decl = b.add(NodeKind::Declaration {
            simple_declarations: vec![sx],
            constraints: vec![constraint],
        });
        let query = CompiledQuery::new(b.build(decl).expect("构建失败"), Arc::new(FunctionRegistry::new()));
        let graph = empty_graph();
        let mut env = Environment::new();
        let mut ctx = EvaluationContext::new(&query, &graph, &mut env);
        let mut layer = DeclarationLayer::new(&query, decl).expect("创建声明层失败");
        layer.reset(&mut ctx).expect("重置失败");

        let mut accepted = Vec::new();
        while layer.iterate(&mut ctx).expect("迭代失败") {
            if layer.constraints_hold(&mut ctx).expect("约束求值失败") {
                accepted.push(ctx.binding(x).cloned());
            }
        }
        assert_eq!(accepted, vec![Some(Value::Int(3)), Some(Value::Int(4))]);
        assert_eq!(ctx.stats().iterations, 4);
    }

    #[test]
    fn test_cardinality_estimates() {
        let (query, decl, _) = declaration(vec![list(1..=3), list(1..=4)]);
        assert_eq!(query.cardinality(decl), 12.0);
        assert_eq!(query.own_cost(decl), 12.0);
    }
}
