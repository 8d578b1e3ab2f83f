//! 查询图
//!
//! 编译后的查询：节点加上从子节点指向父节点的带类型边。
//! 边上可以附带源码跨度，用来在错误传播时收窄出错位置

use serde::{Deserialize, Serialize};

use crate::core::error::{EvalError, EvalResult};
use crate::core::span::Span;
use crate::query::node::{NodeId, NodeKind, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

/// 子节点到父节点的边
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryEdge {
    pub child: NodeId,
    pub parent: NodeId,
    pub relation: Relation,
    /// 父节点中引用子节点的那段源码
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryGraph {
    nodes: Vec<QueryNode>,
    edges: Vec<QueryEdge>,
    /// 以该节点为子节点的边（它被引用的位置）
    parent_edges: Vec<Vec<usize>>,
    /// 以该节点为父节点的边
    child_edges: Vec<Vec<usize>>,
    root: NodeId,
    this_vertex: Option<NodeId>,
    this_edge: Option<NodeId>,
}

impl QueryGraph {
    pub fn builder() -> QueryGraphBuilder {
        QueryGraphBuilder::new()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&QueryNode> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &QueryNode> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> &[QueryEdge] {
        &self.edges
    }

    /// 引用该节点的边，即该节点作为子节点的边
    pub fn parent_edges(&self, id: NodeId) -> impl Iterator<Item = &QueryEdge> {
        self.parent_edges
            .get(id.index())
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// 该节点引用其子节点的边
    pub fn child_edges(&self, id: NodeId) -> impl Iterator<Item = &QueryEdge> {
        self.child_edges
            .get(id.index())
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.parent_edges(id).map(|e| e.parent).collect()
    }

    /// 节点在源码中被引用的所有位置
    pub fn reference_spans(&self, id: NodeId) -> Vec<Span> {
        self.parent_edges(id).filter_map(|e| e.span).collect()
    }

    pub fn this_vertex(&self) -> Option<NodeId> {
        self.this_vertex
    }

    pub fn this_edge(&self) -> Option<NodeId> {
        self.this_edge
    }

    /// 变量节点的名字，`thisVertex`/`thisEdge` 也算变量
    pub fn variable_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Variable(name) => Some(name),
            NodeKind::ThisVertex => Some("thisVertex"),
            NodeKind::ThisEdge => Some("thisEdge"),
            _ => None,
        }
    }

    pub fn identifier(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// 查询图构建器
///
/// 子节点必须先于父节点加入，因此构建出的查询图无环
#[derive(Debug, Default)]
pub struct QueryGraphBuilder {
    nodes: Vec<QueryNode>,
    edges: Vec<QueryEdge>,
    this_vertex: Option<NodeId>,
    this_edge: Option<NodeId>,
}

impl QueryGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for (child, relation) in kind.children() {
            self.edges.push(QueryEdge {
                child,
                parent: id,
                relation,
                span: None,
            });
        }
        self.nodes.push(QueryNode { id, kind });
        id
    }

    pub fn literal(&mut self, value: impl Into<crate::core::value::Value>) -> NodeId {
        self.add(NodeKind::Literal(value.into()))
    }

    pub fn variable(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Variable(name.to_string()))
    }

    pub fn identifier(&mut self, name: &str) -> NodeId {
        self.add(NodeKind::Identifier(name.to_string()))
    }

    pub fn apply(&mut self, function: &str, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::FunctionApplication {
            function: function.to_string(),
            args,
        })
    }

    /// 全图唯一的 `thisVertex` 节点
    pub fn this_vertex(&mut self) -> NodeId {
        if let Some(id) = self.this_vertex {
            return id;
        }
        let id = self.add(NodeKind::ThisVertex);
        self.this_vertex = Some(id);
        id
    }

    /// 全图唯一的 `thisEdge` 节点
    pub fn this_edge(&mut self) -> NodeId {
        if let Some(id) = self.this_edge {
            return id;
        }
        let id = self.add(NodeKind::ThisEdge);
        self.this_edge = Some(id);
        id
    }

    /// 给 `child` 到 `parent` 的边附上源码跨度
    pub fn annotate(&mut self, child: NodeId, parent: NodeId, span: Span) -> &mut Self {
        for edge in self
            .edges
            .iter_mut()
            .filter(|e| e.child == child && e.parent == parent)
        {
            edge.span = Some(span);
        }
        self
    }

    pub fn build(self, root: NodeId) -> EvalResult<QueryGraph> {
        let len = self.nodes.len();
        if root.index() >= len {
            return Err(EvalError::internal(format!("根节点 {} 不存在", root)));
        }

        let mut parent_edges = vec![Vec::new(); len];
        let mut child_edges = vec![Vec::new(); len];
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.child >= edge.parent {
                return Err(EvalError::internal(format!(
                    "节点 {} 引用了不存在或后加入的节点 {}",
                    edge.parent, edge.child
                )));
            }
            let child_kind = &self.nodes[edge.child.index()].kind;
            let well_formed = match edge.relation {
                Relation::DeclaredVar | Relation::DefinedVar | Relation::BoundVar => {
                    matches!(child_kind, NodeKind::Variable(_))
                }
                Relation::RecordId => matches!(child_kind, NodeKind::Identifier(_)),
                Relation::SubPath => child_kind.is_path_description(),
                Relation::SimpleDeclaration => {
                    matches!(child_kind, NodeKind::SimpleDeclaration { .. })
                }
                Relation::Declaration => matches!(child_kind, NodeKind::Declaration { .. }),
                _ => true,
            };
            if !well_formed {
                return Err(EvalError::internal(format!(
                    "节点 {} 不能作为 {:?} 关系的子节点",
                    child_kind.name(),
                    edge.relation
                )));
            }
            parent_edges[edge.child.index()].push(i);
            child_edges[edge.parent.index()].push(i);
        }

        log::debug!("查询图构建完成: {} 个节点, {} 条边", len, self.edges.len());

        Ok(QueryGraph {
            nodes: self.nodes,
            edges: self.edges,
            parent_edges,
            child_edges,
            root,
            this_vertex: self.this_vertex,
            this_edge: self.this_edge,
        })
    }
}
