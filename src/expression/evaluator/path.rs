//! 路径描述与路径搜索
//!
//! 路径描述编译出的 NFA 和 DFA 与数据图无关，在求值器中只构造一次，
//! 多次求值和多个线程共享。搜索时守卫中的谓词在当前求值上下文中计算

use std::sync::OnceLock;

use super::{truth, NodeEvaluator};
use crate::automaton::{
    find_path, is_reachable, reachable_vertices, Dfa, EdgeGuard, GuardContext, Nfa, VertexGuard,
};
use crate::core::error::{EvalError, EvalResult, QueryError};
use crate::core::value::Value;
use crate::core::vertex_edge_path::{EdgeId, VertexId};
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::graph::DataGraph;
use crate::query::node::{NodeId, PathDescription, PathShape, VertexRestriction};

type Cached<T> = OnceLock<Result<T, EvalError>>;

fn cached<'s, T>(cell: &'s Cached<T>, build: impl FnOnce() -> EvalResult<T>) -> EvalResult<&'s T> {
    cell.get_or_init(build).as_ref().map_err(Clone::clone)
}

fn vertex_guard(restriction: &VertexRestriction) -> VertexGuard {
    VertexGuard {
        types: restriction.types.clone(),
        predicate: restriction.predicate,
        equals: None,
    }
}

#[derive(Debug)]
pub struct PathDescriptionEvaluator {
    description: PathDescription,
    nfa: Cached<Nfa>,
    forward: Cached<Dfa>,
    /// 转置 NFA 的 DFA，用于从终点反向搜索
    backward: Cached<Dfa>,
}

impl PathDescriptionEvaluator {
    pub fn new(description: PathDescription) -> Self {
        Self {
            description,
            nfa: OnceLock::new(),
            forward: OnceLock::new(),
            backward: OnceLock::new(),
        }
    }

    pub fn description(&self) -> &PathDescription {
        &self.description
    }

    /// 直接引用的子路径描述
    fn subpaths(&self) -> Vec<NodeId> {
        match &self.description.shape {
            PathShape::Simple { .. } | PathShape::Edge { .. } => Vec::new(),
            PathShape::Sequential(parts) | PathShape::Alternative(parts) => parts.clone(),
            PathShape::Transposed(path)
            | PathShape::Optional(path)
            | PathShape::Iterated { path, .. }
            | PathShape::Exponentiated { path, .. } => vec![*path],
            PathShape::IntermediateVertex { first, second, .. } => vec![*first, *second],
        }
    }

    pub fn nfa(&self, query: &CompiledQuery) -> EvalResult<&Nfa> {
        cached(&self.nfa, || self.build_nfa(query))
    }

    pub fn forward(&self, query: &CompiledQuery) -> EvalResult<&Dfa> {
        cached(&self.forward, || Ok(Dfa::from_nfa(self.nfa(query)?)))
    }

    pub fn backward(&self, query: &CompiledQuery) -> EvalResult<&Dfa> {
        cached(&self.backward, || {
            let transposed = self.nfa(query)?.clone().transposed();
            Ok(Dfa::from_nfa(&transposed))
        })
    }

    fn sub_nfa(query: &CompiledQuery, node: NodeId) -> EvalResult<Nfa> {
        let evaluator = query.evaluator(node)?;
        let description = evaluator
            .path_description()
            .ok_or_else(|| EvalError::internal(format!("节点 {} 不是路径描述", node)))?;
        Ok(description.nfa(query)?.clone())
    }

    fn build_nfa(&self, query: &CompiledQuery) -> EvalResult<Nfa> {
        let subs = |parts: &[NodeId]| -> EvalResult<Vec<Nfa>> {
            parts.iter().map(|p| Self::sub_nfa(query, *p)).collect()
        };

        let mut nfa = match &self.description.shape {
            PathShape::Simple {
                direction,
                types,
                roles,
                predicate,
            } => {
                let mut guard = EdgeGuard::any(*direction)
                    .with_types(types.clone())
                    .with_roles(roles.iter().cloned());
                guard.predicate = *predicate;
                Nfa::edge_step(guard)
            }
            PathShape::Edge { direction, edge } => Nfa::edge_step(EdgeGuard {
                edge: Some(*edge),
                ..EdgeGuard::any(*direction)
            }),
            PathShape::Sequential(parts) => Nfa::sequence(subs(parts)?),
            PathShape::Alternative(parts) => Nfa::alternative(subs(parts)?),
            PathShape::Transposed(path) => Self::sub_nfa(query, *path)?.transposed(),
            PathShape::Iterated {
                path,
                at_least_once,
            } => Self::sub_nfa(query, *path)?.iterated(*at_least_once),
            PathShape::Optional(path) => Self::sub_nfa(query, *path)?.optional(),
            PathShape::Exponentiated { path, exponent } => {
                Self::sub_nfa(query, *path)?.exponentiated(*exponent)?
            }
            PathShape::IntermediateVertex {
                first,
                vertex,
                second,
            } => Nfa::intermediate_vertex(
                Self::sub_nfa(query, *first)?,
                VertexGuard::equal_to(*vertex),
                Self::sub_nfa(query, *second)?,
            ),
        };

        if let Some(start) = &self.description.start {
            nfa = nfa.restrict_start(vertex_guard(start));
        }
        if let Some(goal) = &self.description.goal {
            nfa = nfa.restrict_goal(vertex_guard(goal));
        }
        log::debug!(
            "路径描述编译为 NFA: {} 个状态, {} 条转移",
            nfa.state_count,
            nfa.transitions.len()
        );
        Ok(nfa)
    }
}

impl NodeEvaluator for PathDescriptionEvaluator {
    fn evaluate(&self, _ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        Err(EvalError::internal("路径描述只能在路径搜索中使用"))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().automaton_state_cost * (1 + self.subpaths().len()) as f64
    }
}

/// 搜索期间的守卫环境：谓词求值前绑定 `thisEdge`/`thisVertex`，求值后恢复
struct SearchScope<'c, 'a> {
    ctx: &'c mut EvaluationContext<'a>,
}

impl SearchScope<'_, '_> {
    fn predicate(
        &mut self,
        variable: Option<NodeId>,
        value: Value,
        predicate: NodeId,
        what: &str,
    ) -> EvalResult<bool> {
        let previous = variable.map(|v| (v, self.ctx.bind(v, value)));
        let result = self.ctx.result(predicate);
        if let Some((v, prev)) = previous {
            self.ctx.restore(v, prev);
        }
        truth(&result?, what)
    }
}

impl GuardContext for SearchScope<'_, '_> {
    fn graph(&self) -> &dyn DataGraph {
        self.ctx.graph()
    }

    fn edge_predicate(&mut self, predicate: NodeId, edge: EdgeId) -> EvalResult<bool> {
        let this_edge = self.ctx.query().graph().this_edge();
        self.predicate(this_edge, Value::Edge(edge), predicate, "边谓词")
    }

    fn vertex_predicate(&mut self, predicate: NodeId, vertex: VertexId) -> EvalResult<bool> {
        let this_vertex = self.ctx.query().graph().this_vertex();
        self.predicate(this_vertex, Value::Vertex(vertex), predicate, "顶点谓词")
    }

    fn value_of(&mut self, node: NodeId) -> EvalResult<Value> {
        self.ctx.result(node)
    }

    fn step(&mut self) -> EvalResult<()> {
        self.ctx.add_progress(1.0)
    }

    fn max_states(&self) -> usize {
        self.ctx.query().config().max_search_states
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// `start -path-> target`，布尔结果
    Existence,
    /// `start -path->`，可达顶点集合
    Forward,
    /// `-path-> target`，能到达终点的顶点集合
    Backward,
    /// 最短匹配路径，不存在时为 null
    Extraction,
}

#[derive(Debug)]
pub struct PathSearchEvaluator {
    mode: SearchMode,
    start: Option<NodeId>,
    path: NodeId,
    target: Option<NodeId>,
}

impl PathSearchEvaluator {
    pub fn new(mode: SearchMode, start: Option<NodeId>, path: NodeId, target: Option<NodeId>) -> Self {
        Self {
            mode,
            start,
            path,
            target,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// 求值端点表达式；null 返回 `None`
    fn endpoint(
        ctx: &mut EvaluationContext<'_>,
        node: Option<NodeId>,
    ) -> EvalResult<Option<VertexId>> {
        let node = node.ok_or_else(|| EvalError::internal("路径搜索缺少端点表达式"))?;
        match ctx.result(node)? {
            Value::Vertex(v) => Ok(Some(v)),
            Value::Null => Ok(None),
            other => Err(QueryError::type_mismatch("Vertex", other.type_name()).into()),
        }
    }

    fn vertex_set(vertices: impl IntoIterator<Item = VertexId>) -> Value {
        Value::Set(vertices.into_iter().map(Value::Vertex).collect())
    }
}

impl NodeEvaluator for PathSearchEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let query = ctx.query();
        let description = query
            .evaluator(self.path)?
            .path_description()
            .ok_or_else(|| EvalError::internal(format!("节点 {} 不是路径描述", self.path)))?;

        match self.mode {
            SearchMode::Existence | SearchMode::Extraction => {
                let start = Self::endpoint(ctx, self.start)?;
                let target = Self::endpoint(ctx, self.target)?;
                let (Some(start), Some(target)) = (start, target) else {
                    return Ok(Value::Null);
                };
                let dfa = description.forward(query)?;
                let mut scope = SearchScope { ctx };
                if self.mode == SearchMode::Existence {
                    Ok(Value::Bool(is_reachable(&mut scope, dfa, start, target)?))
                } else {
                    Ok(find_path(&mut scope, dfa, start, target)?
                        .map(Value::Path)
                        .unwrap_or(Value::Null))
                }
            }
            SearchMode::Forward => {
                let Some(start) = Self::endpoint(ctx, self.start)? else {
                    return Ok(Value::Null);
                };
                let dfa = description.forward(query)?;
                let mut scope = SearchScope { ctx };
                Ok(Self::vertex_set(reachable_vertices(&mut scope, dfa, start)?))
            }
            SearchMode::Backward => {
                let Some(target) = Self::endpoint(ctx, self.target)? else {
                    return Ok(Value::Null);
                };
                let dfa = description.backward(query)?;
                let mut scope = SearchScope { ctx };
                Ok(Self::vertex_set(reachable_vertices(&mut scope, dfa, target)?))
            }
        }
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().search_step_cost * query.statistics().vertex_count().max(1.0)
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        match self.mode {
            SearchMode::Forward | SearchMode::Backward => {
                query.statistics().vertex_count() * query.cost_config().path_existence_selectivity
            }
            SearchMode::Existence | SearchMode::Extraction => 1.0,
        }
    }

    fn selectivity(&self, query: &CompiledQuery) -> f64 {
        match self.mode {
            SearchMode::Existence => query.cost_config().path_existence_selectivity,
            _ => 1.0,
        }
    }
}
