//! 内存数据图
//!
//! 顶点和边按插入顺序编号（从 1 开始），每个顶点保存一张关联边表

use std::sync::Arc;

use super::schema::{ClassId, ElementKind, Schema};
use super::{DataGraph, Incidence};
use crate::core::error::{EvalError, EvalResult};
use crate::core::vertex_edge_path::{EdgeDirection, EdgeId, VertexId};

#[derive(Debug, Clone)]
struct VertexRecord {
    class: ClassId,
    incidences: Vec<Incidence>,
}

#[derive(Debug, Clone)]
struct EdgeRecord {
    class: ClassId,
    alpha: VertexId,
    omega: VertexId,
}

#[derive(Debug, Clone)]
pub struct InMemoryGraph {
    schema: Arc<Schema>,
    vertices: Vec<VertexRecord>,
    edges: Vec<EdgeRecord>,
    version: u64,
}

impl InMemoryGraph {
    pub fn builder(schema: Schema) -> GraphBuilder {
        GraphBuilder::new(schema)
    }

    fn vertex(&self, v: VertexId) -> Option<&VertexRecord> {
        (v.0 as usize).checked_sub(1).and_then(|i| self.vertices.get(i))
    }

    fn edge(&self, e: EdgeId) -> Option<&EdgeRecord> {
        (e.0 as usize).checked_sub(1).and_then(|i| self.edges.get(i))
    }
}

impl DataGraph for InMemoryGraph {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn vertices(&self) -> Vec<VertexId> {
        (1..=self.vertices.len() as u32).map(VertexId).collect()
    }

    fn edges(&self) -> Vec<EdgeId> {
        (1..=self.edges.len() as u32).map(EdgeId).collect()
    }

    fn contains_vertex(&self, v: VertexId) -> bool {
        self.vertex(v).is_some()
    }

    fn contains_edge(&self, e: EdgeId) -> bool {
        self.edge(e).is_some()
    }

    fn incidences(&self, v: VertexId) -> &[Incidence] {
        self.vertex(v).map(|r| r.incidences.as_slice()).unwrap_or(&[])
    }

    fn alpha(&self, e: EdgeId) -> Option<VertexId> {
        self.edge(e).map(|r| r.alpha)
    }

    fn omega(&self, e: EdgeId) -> Option<VertexId> {
        self.edge(e).map(|r| r.omega)
    }

    fn vertex_class(&self, v: VertexId) -> Option<ClassId> {
        self.vertex(v).map(|r| r.class)
    }

    fn edge_class(&self, e: EdgeId) -> Option<ClassId> {
        self.edge(e).map(|r| r.class)
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// 内存数据图构建器
#[derive(Debug)]
pub struct GraphBuilder {
    graph: InMemoryGraph,
}

impl GraphBuilder {
    pub fn new(schema: Schema) -> Self {
        Self {
            graph: InMemoryGraph {
                schema: Arc::new(schema),
                vertices: Vec::new(),
                edges: Vec::new(),
                version: 0,
            },
        }
    }

    fn class_of_kind(&self, name: &str, kind: ElementKind) -> EvalResult<ClassId> {
        let schema = &self.graph.schema;
        let class = schema
            .class_by_name(name)
            .ok_or_else(|| EvalError::UnknownType(name.to_string()))?;
        match schema.class(class) {
            Some(info) if info.kind == kind => Ok(class),
            _ => Err(EvalError::UnknownType(name.to_string())),
        }
    }

    pub fn add_vertex(&mut self, class: &str) -> EvalResult<VertexId> {
        let class = self.class_of_kind(class, ElementKind::Vertex)?;
        self.graph.vertices.push(VertexRecord {
            class,
            incidences: Vec::new(),
        });
        self.graph.version += 1;
        Ok(VertexId(self.graph.vertices.len() as u32))
    }

    pub fn add_edge(&mut self, class: &str, alpha: VertexId, omega: VertexId) -> EvalResult<EdgeId> {
        let class = self.class_of_kind(class, ElementKind::Edge)?;
        for v in [alpha, omega] {
            if !self.graph.contains_vertex(v) {
                return Err(EvalError::internal(format!("边的端点 {} 不存在", v)));
            }
        }

        self.graph.edges.push(EdgeRecord { class, alpha, omega });
        let edge = EdgeId(self.graph.edges.len() as u32);

        let out = Incidence {
            edge,
            direction: EdgeDirection::Out,
            this: alpha,
            that: omega,
        };
        let inc = Incidence {
            edge,
            direction: EdgeDirection::In,
            this: omega,
            that: alpha,
        };
        self.graph.vertices[alpha.0 as usize - 1].incidences.push(out);
        self.graph.vertices[omega.0 as usize - 1].incidences.push(inc);
        self.graph.version += 1;
        Ok(edge)
    }

    pub fn build(self) -> InMemoryGraph {
        log::debug!(
            "内存数据图构建完成: {} 个顶点, {} 条边",
            self.graph.vertices.len(),
            self.graph.edges.len()
        );
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> InMemoryGraph {
        let mut schema = Schema::new();
        schema.add_vertex_class("Node", &[]).expect("添加类失败");
        schema
            .add_edge_class("Link", &[], Some("source"), Some("target"))
            .expect("添加类失败");

        let mut builder = InMemoryGraph::builder(schema);
        let v1 = builder.add_vertex("Node").expect("添加顶点失败");
        let v2 = builder.add_vertex("Node").expect("添加顶点失败");
        let v3 = builder.add_vertex("Node").expect("添加顶点失败");
        builder.add_edge("Link", v1, v2).expect("添加边失败");
        builder.add_edge("Link", v2, v3).expect("添加边失败");
        builder.build()
    }

    #[test]
    fn test_incidences_and_endpoints() {
        let graph = chain();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);

        let incs = graph.incidences(VertexId(2));
        assert_eq!(incs.len(), 2);
        assert_eq!(incs[0].direction, EdgeDirection::In);
        assert_eq!(incs[0].that, VertexId(1));
        assert_eq!(incs[1].direction, EdgeDirection::Out);
        assert_eq!(incs[1].that, VertexId(3));

        assert_eq!(graph.alpha(EdgeId(1)), Some(VertexId(1)));
        assert_eq!(graph.omega(EdgeId(2)), Some(VertexId(3)));
        assert!(graph.incidences(VertexId(9)).is_empty());
    }

    #[test]
    fn test_far_role_and_degree() {
        let graph = chain();
        let incs = graph.incidences(VertexId(2));
        assert_eq!(graph.far_role(&incs[0]), Some("source"));
        assert_eq!(graph.far_role(&incs[1]), Some("target"));
        assert_eq!(graph.degree(VertexId(2), EdgeDirection::Both), 2);
        assert_eq!(graph.degree(VertexId(1), EdgeDirection::In), 0);
    }

    #[test]
    fn test_wrong_element_kind() {
        let mut schema = Schema::new();
        schema.add_vertex_class("Node", &[]).expect("添加类失败");
        let mut builder = InMemoryGraph::builder(schema);
        let v = builder.add_vertex("Node").expect("添加顶点失败");
        assert!(matches!(
            builder.add_edge("Node", v, v),
            Err(EvalError::UnknownType(_))
        ));
        assert_eq!(builder.build().version(), 1);
    }
}
