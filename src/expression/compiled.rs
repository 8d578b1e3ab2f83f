//! 编译后的查询
//!
//! 每个节点的求值器在首次引用时构造并缓存；依赖表达式集合、自由变量
//! 以及代价估算也都是一次计算、之后只读。整个结构是 `Send + Sync` 的，
//! 同一个编译后的查询可以在多个线程里各自用独立的上下文求值

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use super::context::EvaluationContext;
use super::evaluator::Evaluator;
use super::functions::FunctionLibrary;
use crate::config::{Config, EvaluationConfig};
use crate::core::error::{EvalError, EvalResult};
use crate::core::value::Value;
use crate::query::cost::{CostEstimate, CostModelConfig, GraphStatistics};
use crate::query::graph::QueryGraph;
use crate::query::node::{NodeId, NodeKind, Relation};

pub struct CompiledQuery {
    graph: QueryGraph,
    evaluators: Vec<OnceLock<Option<Evaluator>>>,
    depending: Vec<OnceLock<Vec<NodeId>>>,
    free_variables: Vec<OnceLock<BTreeSet<NodeId>>>,
    functions: Arc<dyn FunctionLibrary>,
    statistics: Arc<GraphStatistics>,
    config: EvaluationConfig,
    cost_config: CostModelConfig,
}

impl std::fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("nodes", &self.graph.len())
            .field("root", &self.graph.root())
            .field("config", &self.config)
            .finish()
    }
}

impl CompiledQuery {
    pub fn new(graph: QueryGraph, functions: Arc<dyn FunctionLibrary>) -> Self {
        let len = graph.len();
        Self {
            graph,
            evaluators: (0..len).map(|_| OnceLock::new()).collect(),
            depending: (0..len).map(|_| OnceLock::new()).collect(),
            free_variables: (0..len).map(|_| OnceLock::new()).collect(),
            functions,
            statistics: Arc::new(GraphStatistics::default()),
            config: EvaluationConfig::default(),
            cost_config: CostModelConfig::default(),
        }
    }

    /// 代价估算所用的图统计
    pub fn with_statistics(mut self, statistics: Arc<GraphStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.config = config.evaluation;
        self.cost_config = config.cost;
        self
    }

    pub fn graph(&self) -> &QueryGraph {
        &self.graph
    }

    pub fn functions(&self) -> &dyn FunctionLibrary {
        self.functions.as_ref()
    }

    pub fn statistics(&self) -> &GraphStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn cost_config(&self) -> &CostModelConfig {
        &self.cost_config
    }

    /// 节点的求值器；`Identifier` 等没有值的节点返回 `None`
    pub fn get_evaluator(&self, node: NodeId) -> Option<&Evaluator> {
        self.evaluators
            .get(node.index())?
            .get_or_init(|| Evaluator::build(self, node))
            .as_ref()
    }

    pub fn evaluator(&self, node: NodeId) -> EvalResult<&Evaluator> {
        self.get_evaluator(node).ok_or_else(|| {
            let kind = self.graph.kind(node).map(NodeKind::name).unwrap_or("?");
            EvalError::internal(format!("节点 {} ({}) 没有求值器", node, kind))
        })
    }

    pub fn get_result(&self, node: NodeId, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        self.evaluator(node)?.get_result(ctx)
    }

    /// 变量重新绑定时需要清除缓存结果的节点
    ///
    /// 沿引用关系向上闭包，跳过绑定关系；声明与路径描述不计入但继续向上。
    /// `thisVertex`/`thisEdge` 只在所属路径描述之内传播
    pub fn depending_expressions(&self, variable: NodeId) -> &[NodeId] {
        match self.depending.get(variable.index()) {
            Some(cell) => cell.get_or_init(|| self.collect_depending(variable)),
            None => &[],
        }
    }

    fn collect_depending(&self, variable: NodeId) -> Vec<NodeId> {
        let local = matches!(
            self.graph.kind(variable),
            Some(NodeKind::ThisVertex | NodeKind::ThisEdge)
        );
        let mut seen = vec![false; self.graph.len()];
        let mut stack = vec![variable];
        let mut out = Vec::new();
        while let Some(node) = stack.pop() {
            for edge in self.graph.parent_edges(node) {
                if edge.relation.is_binding() || seen[edge.parent.index()] {
                    continue;
                }
                seen[edge.parent.index()] = true;
                let Some(kind) = self.graph.kind(edge.parent) else {
                    continue;
                };
                if local && kind.is_path_description() {
                    continue;
                }
                if !kind.is_scope_boundary() {
                    out.push(edge.parent);
                }
                stack.push(edge.parent);
            }
        }
        out.sort();
        out
    }

    /// 节点的值所依赖、但不在节点内部绑定的变量
    pub fn free_variables(&self, node: NodeId) -> &BTreeSet<NodeId> {
        static EMPTY: BTreeSet<NodeId> = BTreeSet::new();
        match self.free_variables.get(node.index()) {
            Some(cell) => cell.get_or_init(|| self.collect_free_variables(node)),
            None => &EMPTY,
        }
    }

    fn collect_free_variables(&self, node: NodeId) -> BTreeSet<NodeId> {
        let Some(kind) = self.graph.kind(node) else {
            return BTreeSet::new();
        };
        if kind.is_variable() {
            return BTreeSet::from([node]);
        }
        let mut free = BTreeSet::new();
        for edge in self.graph.child_edges(node) {
            if !edge.relation.is_binding() {
                free.extend(self.free_variables(edge.child).iter().copied());
            }
        }
        match kind {
            NodeKind::Quantified { declaration, .. }
            | NodeKind::Comprehension { declaration, .. } => {
                for var in self.declared_variables(*declaration) {
                    free.remove(&var);
                }
            }
            NodeKind::Declaration { .. } => {
                for var in self.declared_variables(node) {
                    free.remove(&var);
                }
            }
            NodeKind::Let { definitions, .. } => {
                for (var, _) in definitions {
                    free.remove(var);
                }
            }
            NodeKind::Root {
                bound_variables, ..
            } => {
                for var in bound_variables {
                    free.remove(var);
                }
            }
            NodeKind::PathDescription(_) => {
                for var in [self.graph.this_vertex(), self.graph.this_edge()]
                    .into_iter()
                    .flatten()
                {
                    free.remove(&var);
                }
            }
            _ => {}
        }
        free
    }

    /// 声明节点按顺序声明的全部变量
    pub fn declared_variables(&self, declaration: NodeId) -> Vec<NodeId> {
        let Some(NodeKind::Declaration {
            simple_declarations,
            ..
        }) = self.graph.kind(declaration)
        else {
            return Vec::new();
        };
        simple_declarations
            .iter()
            .filter_map(|s| match self.graph.kind(*s) {
                Some(NodeKind::SimpleDeclaration { variables, .. }) => Some(variables.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// 变量取值个数的估计
    pub fn variable_cardinality(&self, variable: NodeId) -> f64 {
        if Some(variable) == self.graph.this_edge() {
            return self.statistics.edge_count();
        }
        if Some(variable) == self.graph.this_vertex() {
            return self.statistics.vertex_count();
        }
        for edge in self.graph.parent_edges(variable) {
            if edge.relation != Relation::DeclaredVar {
                continue;
            }
            if let Some(NodeKind::SimpleDeclaration { domain, .. }) = self.graph.kind(edge.parent) {
                return self.cardinality(*domain);
            }
        }
        1.0
    }

    /// 自由变量取值组合数的估计
    pub fn variable_combinations(&self, node: NodeId) -> f64 {
        self.free_variables(node)
            .iter()
            .map(|var| self.variable_cardinality(*var))
            .product()
    }

    pub fn cost_estimate(&self, node: NodeId) -> CostEstimate {
        self.get_evaluator(node)
            .map(|e| e.cost_estimate(self))
            .unwrap_or_else(CostEstimate::zero)
    }

    pub fn own_cost(&self, node: NodeId) -> f64 {
        self.cost_estimate(node).own_cost
    }

    pub fn subtree_cost(&self, node: NodeId) -> f64 {
        self.cost_estimate(node).subtree_cost
    }

    pub fn cardinality(&self, node: NodeId) -> f64 {
        self.get_evaluator(node)
            .map(|e| e.cardinality(self))
            .unwrap_or(1.0)
    }

    pub fn selectivity(&self, node: NodeId) -> f64 {
        self.get_evaluator(node)
            .map(|e| e.selectivity(self))
            .unwrap_or(1.0)
    }
}
