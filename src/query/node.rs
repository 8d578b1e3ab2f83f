//! 查询图节点
//!
//! 每个节点的种类在编译后不再改变；节点之间的引用保存在种类的字段中，
//! 构建查询图时再展开为带关系类型的边

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::value::Value;
use crate::core::vertex_edge_path::EdgeDirection;
use crate::query::types::TypeRestriction;

/// 查询图中的节点标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 子节点到父节点的关系类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    Argument,
    Condition,
    TrueBranch,
    FalseBranch,
    Declaration,
    BoundExpression,
    DefinedVar,
    Definition,
    SimpleDeclaration,
    Constraint,
    DeclaredVar,
    Domain,
    ResultDefinition,
    Key,
    MaxCount,
    Part,
    RangeStart,
    RangeEnd,
    RecordId,
    RecordValue,
    MapKey,
    MapValue,
    SubPath,
    EdgeExpression,
    Predicate,
    IntermediateVertex,
    StartExpression,
    TargetExpression,
    StartPredicate,
    GoalPredicate,
    BoundVar,
    QueryExpression,
}

impl Relation {
    /// 变量与其作用域节点之间的声明关系，计算依赖表达式时不沿这些边上溯
    pub fn is_binding(self) -> bool {
        matches!(
            self,
            Relation::DeclaredVar | Relation::DefinedVar | Relation::BoundVar
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantifier {
    ForAll,
    Exists,
    ExistsExactlyOne,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComprehensionKind {
    Set,
    List,
    /// 需要 `key` 子节点
    Map,
    /// 结果为表格；有 `key` 时每行是 (键, 值) 元组
    Table { headers: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructionKind {
    Set,
    List,
    Tuple,
}

/// 路径起点或终点上的顶点限制
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRestriction {
    pub types: TypeRestriction,
    /// 以 `thisVertex` 为当前顶点求值的布尔谓词
    pub predicate: Option<NodeId>,
}

/// 路径描述的形状
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathShape {
    /// 单步：方向、边类型、远端角色、可选的边谓词（`thisEdge`）
    Simple {
        direction: EdgeDirection,
        types: TypeRestriction,
        roles: Vec<String>,
        predicate: Option<NodeId>,
    },
    /// 必须经过给定表达式求得的那条边
    Edge {
        direction: EdgeDirection,
        edge: NodeId,
    },
    Sequential(Vec<NodeId>),
    Alternative(Vec<NodeId>),
    Transposed(NodeId),
    /// `p*` 或 `p+`
    Iterated {
        path: NodeId,
        at_least_once: bool,
    },
    Optional(NodeId),
    /// `p^n`，`n >= 1`
    Exponentiated {
        path: NodeId,
        exponent: u32,
    },
    /// `first vertex second`，中间顶点须等于 `vertex` 的值
    IntermediateVertex {
        first: NodeId,
        vertex: NodeId,
        second: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDescription {
    pub shape: PathShape,
    pub start: Option<VertexRestriction>,
    pub goal: Option<VertexRestriction>,
}

impl PathDescription {
    pub fn new(shape: PathShape) -> Self {
        Self {
            shape,
            start: None,
            goal: None,
        }
    }

    pub fn with_start(mut self, restriction: VertexRestriction) -> Self {
        self.start = Some(restriction);
        self
    }

    pub fn with_goal(mut self, restriction: VertexRestriction) -> Self {
        self.goal = Some(restriction);
        self
    }
}

/// 节点种类
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Literal(Value),
    Variable(String),
    ThisVertex,
    ThisEdge,
    /// 只作为记录字段名等的名字出现，没有求值器
    Identifier(String),
    FunctionApplication {
        function: String,
        args: Vec<NodeId>,
    },
    Conditional {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    Quantified {
        quantifier: Quantifier,
        declaration: NodeId,
        bound: NodeId,
    },
    /// `let x := e1, y := e2 in bound`
    Let {
        definitions: Vec<(NodeId, NodeId)>,
        bound: NodeId,
    },
    Declaration {
        simple_declarations: Vec<NodeId>,
        constraints: Vec<NodeId>,
    },
    SimpleDeclaration {
        variables: Vec<NodeId>,
        domain: NodeId,
    },
    Comprehension {
        kind: ComprehensionKind,
        declaration: NodeId,
        result: NodeId,
        key: Option<NodeId>,
        max_count: Option<NodeId>,
    },
    Construction {
        kind: ConstructionKind,
        parts: Vec<NodeId>,
    },
    ListRange {
        first: NodeId,
        last: NodeId,
    },
    /// 字段名来自 `Identifier` 节点
    RecordConstruction {
        fields: Vec<(NodeId, NodeId)>,
    },
    MapConstruction {
        keys: Vec<NodeId>,
        values: Vec<NodeId>,
    },
    VertexSet(TypeRestriction),
    EdgeSet(TypeRestriction),
    PathDescription(PathDescription),
    PathExistence {
        start: NodeId,
        path: NodeId,
        target: NodeId,
    },
    ForwardVertexSet {
        start: NodeId,
        path: NodeId,
    },
    BackwardVertexSet {
        path: NodeId,
        target: NodeId,
    },
    /// 从起点出发到终点的最短匹配路径
    PathExtraction {
        start: NodeId,
        path: NodeId,
        target: NodeId,
    },
    Root {
        bound_variables: Vec<NodeId>,
        query: NodeId,
        store_as: Option<String>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "Literal",
            NodeKind::Variable(_) => "Variable",
            NodeKind::ThisVertex => "ThisVertex",
            NodeKind::ThisEdge => "ThisEdge",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::FunctionApplication { .. } => "FunctionApplication",
            NodeKind::Conditional { .. } => "Conditional",
            NodeKind::Quantified { .. } => "Quantified",
            NodeKind::Let { .. } => "Let",
            NodeKind::Declaration { .. } => "Declaration",
            NodeKind::SimpleDeclaration { .. } => "SimpleDeclaration",
            NodeKind::Comprehension { .. } => "Comprehension",
            NodeKind::Construction { .. } => "Construction",
            NodeKind::ListRange { .. } => "ListRange",
            NodeKind::RecordConstruction { .. } => "RecordConstruction",
            NodeKind::MapConstruction { .. } => "MapConstruction",
            NodeKind::VertexSet(_) => "VertexSet",
            NodeKind::EdgeSet(_) => "EdgeSet",
            NodeKind::PathDescription(_) => "PathDescription",
            NodeKind::PathExistence { .. } => "PathExistence",
            NodeKind::ForwardVertexSet { .. } => "ForwardVertexSet",
            NodeKind::BackwardVertexSet { .. } => "BackwardVertexSet",
            NodeKind::PathExtraction { .. } => "PathExtraction",
            NodeKind::Root { .. } => "Root",
        }
    }

    /// 变量类节点：结果总是读取当前绑定
    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            NodeKind::Variable(_) | NodeKind::ThisVertex | NodeKind::ThisEdge
        )
    }

    /// 作用域边界：依赖表达式集合不包含这些节点
    pub fn is_scope_boundary(&self) -> bool {
        matches!(
            self,
            NodeKind::Declaration { .. }
                | NodeKind::SimpleDeclaration { .. }
                | NodeKind::PathDescription(_)
        )
    }

    pub fn is_path_description(&self) -> bool {
        matches!(self, NodeKind::PathDescription(_))
    }

    /// 按声明顺序列出子节点及其关系
    pub fn children(&self) -> Vec<(NodeId, Relation)> {
        let mut out = Vec::new();
        match self {
            NodeKind::Literal(_)
            | NodeKind::Variable(_)
            | NodeKind::ThisVertex
            | NodeKind::ThisEdge
            | NodeKind::Identifier(_)
            | NodeKind::VertexSet(_)
            | NodeKind::EdgeSet(_) => {}
            NodeKind::FunctionApplication { args, .. } => {
                out.extend(args.iter().map(|&a| (a, Relation::Argument)));
            }
            NodeKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push((*condition, Relation::Condition));
                out.push((*then_branch, Relation::TrueBranch));
                out.push((*else_branch, Relation::FalseBranch));
            }
            NodeKind::Quantified {
                declaration, bound, ..
            } => {
                out.push((*declaration, Relation::Declaration));
                out.push((*bound, Relation::BoundExpression));
            }
            NodeKind::Let { definitions, bound } => {
                for &(var, expr) in definitions {
                    out.push((var, Relation::DefinedVar));
                    out.push((expr, Relation::Definition));
                }
                out.push((*bound, Relation::BoundExpression));
            }
            NodeKind::Declaration {
                simple_declarations,
                constraints,
            } => {
                out.extend(
                    simple_declarations
                        .iter()
                        .map(|&s| (s, Relation::SimpleDeclaration)),
                );
                out.extend(constraints.iter().map(|&c| (c, Relation::Constraint)));
            }
            NodeKind::SimpleDeclaration { variables, domain } => {
                out.extend(variables.iter().map(|&v| (v, Relation::DeclaredVar)));
                out.push((*domain, Relation::Domain));
            }
            NodeKind::Comprehension {
                declaration,
                result,
                key,
                max_count,
                ..
            } => {
                out.push((*declaration, Relation::Declaration));
                if let Some(k) = key {
                    out.push((*k, Relation::Key));
                }
                out.push((*result, Relation::ResultDefinition));
                if let Some(m) = max_count {
                    out.push((*m, Relation::MaxCount));
                }
            }
            NodeKind::Construction { parts, .. } => {
                out.extend(parts.iter().map(|&p| (p, Relation::Part)));
            }
            NodeKind::ListRange { first, last } => {
                out.push((*first, Relation::RangeStart));
                out.push((*last, Relation::RangeEnd));
            }
            NodeKind::RecordConstruction { fields } => {
                for &(id, value) in fields {
                    out.push((id, Relation::RecordId));
                    out.push((value, Relation::RecordValue));
                }
            }
            NodeKind::MapConstruction { keys, values } => {
                out.extend(keys.iter().map(|&k| (k, Relation::MapKey)));
                out.extend(values.iter().map(|&v| (v, Relation::MapValue)));
            }
            NodeKind::PathDescription(desc) => {
                match &desc.shape {
                    PathShape::Simple { predicate, .. } => {
                        if let Some(p) = predicate {
                            out.push((*p, Relation::Predicate));
                        }
                    }
                    PathShape::Edge { edge, .. } => out.push((*edge, Relation::EdgeExpression)),
                    PathShape::Sequential(parts) | PathShape::Alternative(parts) => {
                        out.extend(parts.iter().map(|&p| (p, Relation::SubPath)));
                    }
                    PathShape::Transposed(path)
                    | PathShape::Optional(path)
                    | PathShape::Iterated { path, .. }
                    | PathShape::Exponentiated { path, .. } => {
                        out.push((*path, Relation::SubPath));
                    }
                    PathShape::IntermediateVertex {
                        first,
                        vertex,
                        second,
                    } => {
                        out.push((*first, Relation::SubPath));
                        out.push((*vertex, Relation::IntermediateVertex));
                        out.push((*second, Relation::SubPath));
                    }
                }
                if let Some(VertexRestriction {
                    predicate: Some(p), ..
                }) = &desc.start
                {
                    out.push((*p, Relation::StartPredicate));
                }
                if let Some(VertexRestriction {
                    predicate: Some(p), ..
                }) = &desc.goal
                {
                    out.push((*p, Relation::GoalPredicate));
                }
            }
            NodeKind::PathExistence {
                start,
                path,
                target,
            }
            | NodeKind::PathExtraction {
                start,
                path,
                target,
            } => {
                out.push((*start, Relation::StartExpression));
                out.push((*path, Relation::SubPath));
                out.push((*target, Relation::TargetExpression));
            }
            NodeKind::ForwardVertexSet { start, path } => {
                out.push((*start, Relation::StartExpression));
                out.push((*path, Relation::SubPath));
            }
            NodeKind::BackwardVertexSet { path, target } => {
                out.push((*path, Relation::SubPath));
                out.push((*target, Relation::TargetExpression));
            }
            NodeKind::Root {
                bound_variables,
                query,
                ..
            } => {
                out.extend(bound_variables.iter().map(|&v| (v, Relation::BoundVar)));
                out.push((*query, Relation::QueryExpression));
            }
        }
        out
    }
}
