//! 自动机转移及其守卫
//!
//! 边守卫消耗一步图遍历；顶点守卫只检查当前顶点，不移动

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::vertex_edge_path::EdgeDirection;
use crate::query::node::NodeId;
use crate::query::types::TypeRestriction;

/// 边守卫：方向、边类型、远端角色、指定边与布尔谓词
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeGuard {
    pub direction: EdgeDirection,
    pub types: TypeRestriction,
    /// 为空时不限制角色
    pub roles: BTreeSet<String>,
    /// 在绑定 `thisEdge` 后求值
    pub predicate: Option<NodeId>,
    /// 只允许经过该表达式求得的边
    pub edge: Option<NodeId>,
}

impl EdgeGuard {
    /// 只限制方向的边守卫
    pub fn any(direction: EdgeDirection) -> Self {
        Self {
            direction,
            types: TypeRestriction::new(),
            roles: BTreeSet::new(),
            predicate: None,
            edge: None,
        }
    }

    pub fn with_types(mut self, types: TypeRestriction) -> Self {
        self.types = types;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_predicate(mut self, predicate: NodeId) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// 只反转方向；角色端的切换由 `Guard::ReversedEdge` 表达
    pub fn reversed(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            ..self.clone()
        }
    }
}

/// 顶点守卫：当前顶点的类型、布尔谓词以及与给定表达式值相等
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexGuard {
    pub types: TypeRestriction,
    /// 在绑定 `thisVertex` 后求值
    pub predicate: Option<NodeId>,
    /// 当前顶点必须等于该表达式的值
    pub equals: Option<NodeId>,
}

impl VertexGuard {
    pub fn equal_to(node: NodeId) -> Self {
        Self {
            equals: Some(node),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Guard {
    Edge(EdgeGuard),
    Vertex(VertexGuard),
    /// 反向自动机中的边守卫：角色限制作用于出发端
    ReversedEdge(EdgeGuard),
}

impl Guard {
    /// 是否消耗一条边
    pub fn consumes_edge(&self) -> bool {
        !matches!(self, Guard::Vertex(_))
    }

    pub fn reversed(&self) -> Self {
        match self {
            Guard::Edge(g) => Guard::ReversedEdge(g.reversed()),
            Guard::ReversedEdge(g) => Guard::Edge(g.reversed()),
            Guard::Vertex(g) => Guard::Vertex(g.clone()),
        }
    }
}

/// NFA 转移；`guard` 为空表示 epsilon 转移
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub guard: Option<Guard>,
}

impl Transition {
    pub fn epsilon(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            guard: None,
        }
    }

    pub fn guarded(from: usize, to: usize, guard: Guard) -> Self {
        Self {
            from,
            to,
            guard: Some(guard),
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.guard.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversal_round_trips() {
        let guard = Guard::Edge(EdgeGuard::any(EdgeDirection::Out).with_roles(["target"]));
        let reversed = guard.reversed();
        match &reversed {
            Guard::ReversedEdge(g) => assert_eq!(g.direction, EdgeDirection::In),
            other => panic!("unexpected guard {:?}", other),
        }
        assert_eq!(reversed.reversed(), guard);
        assert!(reversed.consumes_edge());
        assert!(!Guard::Vertex(VertexGuard::default()).consumes_edge());
    }
}
