//! 可达性搜索
//!
//! 在数据图上对 (DFA 状态, 顶点) 对做广度优先搜索。边守卫沿关联边移动，
//! 顶点守卫停留在原顶点；访问过的状态对不再扩展，保证在有环的图上终止。
//!
//! 一条关联边同时满足的全部守卫合并为一个后继子集状态，
//! 预先构造的 DFA 中没有的子集在搜索中按需加入本次搜索的子集表

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Deref;
use std::rc::Rc;

use super::dfa::{Dfa, DfaState};
use super::transition::{EdgeGuard, Guard, VertexGuard};
use crate::core::error::{EvalResult, QueryError};
use crate::core::value::Value;
use crate::core::vertex_edge_path::{EdgeId, Path, VertexId};
use crate::graph::schema::TypeCollection;
use crate::graph::{DataGraph, Incidence};
use crate::query::node::NodeId;

/// 搜索期间守卫求值所需的环境
///
/// 守卫中的谓词和表达式由调用方在当前求值上下文中计算
pub trait GuardContext {
    fn graph(&self) -> &dyn DataGraph;

    /// 绑定 `thisEdge` 后求值边谓词
    fn edge_predicate(&mut self, predicate: NodeId, edge: EdgeId) -> EvalResult<bool>;

    /// 绑定 `thisVertex` 后求值顶点谓词
    fn vertex_predicate(&mut self, predicate: NodeId, vertex: VertexId) -> EvalResult<bool>;

    /// 求值守卫引用的普通表达式（指定边、中间顶点）
    fn value_of(&mut self, node: NodeId) -> EvalResult<Value>;

    /// 每访问一个状态对调用一次，用于进度统计与取消检查
    fn step(&mut self) -> EvalResult<()>;

    /// 最多访问的状态对数量，0 表示不限
    fn max_states(&self) -> usize {
        0
    }
}

/// 某条 DFA 转移在本次搜索中已解析的信息
#[derive(Debug, Default)]
struct ResolvedGuard {
    types: TypeCollection,
    /// 指定边或中间顶点表达式的值，首次用到时求值
    target: Option<Value>,
}

/// 子集表中的一个状态：预先构造的或本次搜索中新加入的
enum StateHandle<'d> {
    Built(&'d DfaState),
    Extended(Rc<DfaState>),
}

impl Deref for StateHandle<'_> {
    type Target = DfaState;

    fn deref(&self) -> &DfaState {
        match self {
            StateHandle::Built(state) => state,
            StateHandle::Extended(state) => state,
        }
    }
}

/// 一次搜索的状态
struct Search<'d, 'c> {
    dfa: &'d Dfa,
    ctx: &'c mut dyn GuardContext,
    /// 编号从 `dfa.state_count()` 开始的新增子集状态
    extended: Vec<Rc<DfaState>>,
    extended_index: HashMap<BTreeSet<usize>, usize>,
    resolved: Vec<Vec<ResolvedGuard>>,
}

/// 搜索树中的一个节点
#[derive(Debug, Clone, Copy)]
struct Visit {
    state: usize,
    vertex: VertexId,
    parent: Option<usize>,
    edge: Option<EdgeId>,
}

fn resolve_guards(state: &DfaState, ctx: &dyn GuardContext) -> EvalResult<Vec<ResolvedGuard>> {
    let schema = ctx.graph().schema();
    let mut guards = Vec::with_capacity(state.transitions.len());
    for t in &state.transitions {
        let types = match &t.guard {
            Guard::Edge(g) | Guard::ReversedEdge(g) => TypeCollection::resolve(&g.types, schema)?,
            Guard::Vertex(g) => TypeCollection::resolve(&g.types, schema)?,
        };
        guards.push(ResolvedGuard {
            types,
            target: None,
        });
    }
    Ok(guards)
}

impl<'d, 'c> Search<'d, 'c> {
    fn new(dfa: &'d Dfa, ctx: &'c mut dyn GuardContext) -> EvalResult<Self> {
        let mut resolved = Vec::with_capacity(dfa.state_count());
        for state in &dfa.states {
            resolved.push(resolve_guards(state, &*ctx)?);
        }
        Ok(Self {
            dfa,
            ctx,
            extended: Vec::new(),
            extended_index: HashMap::new(),
            resolved,
        })
    }

    fn state(&self, id: usize) -> StateHandle<'d> {
        let dfa = self.dfa;
        match dfa.states.get(id) {
            Some(state) => StateHandle::Built(state),
            None => StateHandle::Extended(Rc::clone(&self.extended[id - dfa.state_count()])),
        }
    }

    /// NFA 状态集合对应的子集状态编号，不存在时加入本次搜索的子集表
    fn intern(&mut self, set: BTreeSet<usize>) -> EvalResult<usize> {
        if let Some(id) = self.dfa.find(&set) {
            return Ok(id);
        }
        if let Some(&id) = self.extended_index.get(&set) {
            return Ok(id);
        }
        let state = self.dfa.subset_state(set.clone());
        let guards = resolve_guards(&state, &*self.ctx)?;
        let id = self.dfa.state_count() + self.extended.len();
        self.extended.push(Rc::new(state));
        self.extended_index.insert(set, id);
        self.resolved.push(guards);
        Ok(id)
    }

    fn target_value(&mut self, state: usize, index: usize, node: NodeId) -> EvalResult<Value> {
        if let Some(value) = &self.resolved[state][index].target {
            return Ok(value.clone());
        }
        let value = self.ctx.value_of(node)?;
        self.resolved[state][index].target = Some(value.clone());
        Ok(value)
    }

    fn edge_matches(
        &mut self,
        state: usize,
        index: usize,
        guard: &EdgeGuard,
        near_end_roles: bool,
        inc: &Incidence,
    ) -> EvalResult<bool> {
        if !guard.direction.admits(inc.direction) {
            return Ok(false);
        }
        {
            let graph = self.ctx.graph();
            let Some(class) = graph.edge_class(inc.edge) else {
                return Ok(false);
            };
            if !self.resolved[state][index]
                .types
                .accepts(graph.schema(), class)
            {
                return Ok(false);
            }
            if !guard.roles.is_empty() {
                let role = if near_end_roles {
                    // 反向遍历时，原路径走到的一端是当前所在端
                    let flipped = Incidence {
                        direction: inc.direction.reversed(),
                        ..*inc
                    };
                    graph.far_role(&flipped)
                } else {
                    graph.far_role(inc)
                };
                if !role.is_some_and(|r| guard.roles.contains(r)) {
                    return Ok(false);
                }
            }
        }
        if let Some(node) = guard.edge {
            match self.target_value(state, index, node)? {
                Value::Edge(e) if e == inc.edge => {}
                Value::Edge(_) => return Ok(false),
                other => {
                    return Err(QueryError::type_mismatch("Edge", other.type_name()).into())
                }
            }
        }
        match guard.predicate {
            Some(p) => self.ctx.edge_predicate(p, inc.edge),
            None => Ok(true),
        }
    }

    fn vertex_matches(
        &mut self,
        state: usize,
        index: usize,
        guard: &VertexGuard,
        vertex: VertexId,
    ) -> EvalResult<bool> {
        {
            let graph = self.ctx.graph();
            let Some(class) = graph.vertex_class(vertex) else {
                return Ok(false);
            };
            if !self.resolved[state][index]
                .types
                .accepts(graph.schema(), class)
            {
                return Ok(false);
            }
        }
        if let Some(node) = guard.equals {
            match self.target_value(state, index, node)? {
                Value::Vertex(v) if v == vertex => {}
                Value::Vertex(_) | Value::Null => return Ok(false),
                other => {
                    return Err(QueryError::type_mismatch("Vertex", other.type_name()).into())
                }
            }
        }
        match guard.predicate {
            Some(p) => self.ctx.vertex_predicate(p, vertex),
            None => Ok(true),
        }
    }

    /// 广度优先展开，`stop` 返回真时结束并返回该访问在 `visits` 中的下标
    fn run(
        &mut self,
        start: VertexId,
        visits: &mut Vec<Visit>,
        mut stop: impl FnMut(&Visit, bool) -> bool,
    ) -> EvalResult<Option<usize>> {
        if !self.ctx.graph().contains_vertex(start) {
            return Ok(None);
        }
        let dfa = self.dfa;
        let limit = self.ctx.max_states();
        let mut seen: HashSet<(usize, VertexId)> = HashSet::new();
        let mut queue = VecDeque::new();

        let first = Visit {
            state: dfa.start,
            vertex: start,
            parent: None,
            edge: None,
        };
        seen.insert((first.state, first.vertex));
        visits.push(first);
        queue.push_back(0usize);

        while let Some(current) = queue.pop_front() {
            self.ctx.step()?;
            let visit = visits[current];
            if stop(&visit, self.state(visit.state).accepting) {
                return Ok(Some(current));
            }

            let state = self.state(visit.state);
            let mut successors: Vec<(BTreeSet<usize>, VertexId, Option<EdgeId>)> = Vec::new();

            if state
                .transitions
                .iter()
                .any(|t| !matches!(t.guard, Guard::Vertex(_)))
            {
                let incidences = self.ctx.graph().incidences(visit.vertex).to_vec();
                for inc in &incidences {
                    let mut targets = BTreeSet::new();
                    for (index, transition) in state.transitions.iter().enumerate() {
                        let (Guard::Edge(g) | Guard::ReversedEdge(g)) = &transition.guard else {
                            continue;
                        };
                        let near = matches!(transition.guard, Guard::ReversedEdge(_));
                        if self.edge_matches(visit.state, index, g, near, inc)? {
                            targets.extend(transition.targets.iter().copied());
                        }
                    }
                    if !targets.is_empty() {
                        successors.push((targets, inc.that, Some(inc.edge)));
                    }
                }
            }

            let mut targets = BTreeSet::new();
            for (index, transition) in state.transitions.iter().enumerate() {
                let Guard::Vertex(g) = &transition.guard else {
                    continue;
                };
                if self.vertex_matches(visit.state, index, g, visit.vertex)? {
                    targets.extend(transition.targets.iter().copied());
                }
            }
            if !targets.is_empty() {
                successors.push((targets, visit.vertex, None));
            }

            for (targets, vertex, edge) in successors {
                let target = self.intern(targets)?;
                if !seen.insert((target, vertex)) {
                    continue;
                }
                if limit > 0 && seen.len() > limit {
                    return Err(QueryError::path_error(format!(
                        "路径搜索超过状态上限 {}",
                        limit
                    ))
                    .into());
                }
                visits.push(Visit {
                    state: target,
                    vertex,
                    parent: Some(current),
                    edge,
                });
                queue.push_back(visits.len() - 1);
            }
        }
        Ok(None)
    }
}

/// 从 `start` 出发能否以接受状态到达 `target`
pub fn is_reachable(
    ctx: &mut dyn GuardContext,
    dfa: &Dfa,
    start: VertexId,
    target: VertexId,
) -> EvalResult<bool> {
    let mut search = Search::new(dfa, ctx)?;
    let mut visits = Vec::new();
    let found = search.run(start, &mut visits, |v, accepting| {
        accepting && v.vertex == target
    })?;
    Ok(found.is_some())
}

/// 从 `start` 出发、以接受状态到达的全部顶点
pub fn reachable_vertices(
    ctx: &mut dyn GuardContext,
    dfa: &Dfa,
    start: VertexId,
) -> EvalResult<BTreeSet<VertexId>> {
    let mut search = Search::new(dfa, ctx)?;
    let mut visits = Vec::new();
    let mut result = BTreeSet::new();
    search.run(start, &mut visits, |v, accepting| {
        if accepting {
            result.insert(v.vertex);
        }
        false
    })?;
    Ok(result)
}

/// 从 `start` 到 `target` 的最短匹配路径
pub fn find_path(
    ctx: &mut dyn GuardContext,
    dfa: &Dfa,
    start: VertexId,
    target: VertexId,
) -> EvalResult<Option<Path>> {
    let mut search = Search::new(dfa, ctx)?;
    let mut visits = Vec::new();
    let Some(end) = search.run(start, &mut visits, |v, accepting| {
        accepting && v.vertex == target
    })?
    else {
        return Ok(None);
    };

    let mut steps = Vec::new();
    let mut cursor = Some(end);
    while let Some(i) = cursor {
        let visit = visits[i];
        if let Some(edge) = visit.edge {
            steps.push((edge, visit.vertex));
        }
        cursor = visit.parent;
    }
    let mut path = Path::new(start);
    for (edge, vertex) in steps.into_iter().rev() {
        path.push(edge, vertex);
    }
    Ok(Some(path))
}
