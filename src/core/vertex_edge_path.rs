use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a vertex inside the data graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

/// Handle of an edge inside the data graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Direction in which an incidence is traversed, seen from the current vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    /// Follow the edge from its alpha vertex to its omega vertex
    Out,
    /// Follow the edge against its orientation
    In,
    /// Either orientation
    Both,
}

impl EdgeDirection {
    /// Direction after reversing the traversal
    pub fn reversed(self) -> Self {
        match self {
            EdgeDirection::Out => EdgeDirection::In,
            EdgeDirection::In => EdgeDirection::Out,
            EdgeDirection::Both => EdgeDirection::Both,
        }
    }

    /// Whether an incidence traversed in `actual` direction satisfies this restriction
    pub fn admits(self, actual: EdgeDirection) -> bool {
        self == EdgeDirection::Both || self == actual
    }
}

/// One step of a path: the traversed edge and the vertex reached through it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Step {
    pub edge: EdgeId,
    pub dst: VertexId,
}

/// A walk through the data graph, alternating vertices and edges
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path {
    pub src: VertexId,
    pub steps: Vec<Step>,
}

impl Path {
    pub fn new(src: VertexId) -> Self {
        Self {
            src,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, edge: EdgeId, dst: VertexId) {
        self.steps.push(Step { edge, dst });
    }

    /// Number of traversed edges
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Last vertex of the walk
    pub fn end_vertex(&self) -> VertexId {
        self.steps.last().map(|s| s.dst).unwrap_or(self.src)
    }

    pub fn vertices(&self) -> Vec<VertexId> {
        std::iter::once(self.src)
            .chain(self.steps.iter().map(|s| s.dst))
            .collect()
    }

    pub fn edges(&self) -> Vec<EdgeId> {
        self.steps.iter().map(|s| s.edge).collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.src)?;
        for step in &self.steps {
            write!(f, " -{}- {}", step.edge, step.dst)?;
        }
        Ok(())
    }
}
