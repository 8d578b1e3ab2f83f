//! 数据图接口
//!
//! 求值核心只通过 `DataGraph` 读取已加载的属性图：遍历顶点与边、
//! 访问关联边、端点和元素类。存储表示不在这里定义，`InMemoryGraph`
//! 是随库提供的一个简单实现

pub mod memory;
pub mod schema;

pub use memory::{GraphBuilder, InMemoryGraph};
pub use schema::{ClassId, ClassInfo, ElementKind, Schema, TypeCollection};

use crate::core::vertex_edge_path::{EdgeDirection, EdgeId, VertexId};

/// 顶点上的一条关联边
///
/// `direction` 为 `Out` 表示 `this` 是边的起点，`In` 表示 `this` 是终点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Incidence {
    pub edge: EdgeId,
    pub direction: EdgeDirection,
    pub this: VertexId,
    pub that: VertexId,
}

/// 只读的数据图
pub trait DataGraph: Send + Sync {
    fn schema(&self) -> &Schema;

    fn vertex_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    fn vertices(&self) -> Vec<VertexId>;

    fn edges(&self) -> Vec<EdgeId>;

    fn contains_vertex(&self, v: VertexId) -> bool;

    fn contains_edge(&self, e: EdgeId) -> bool;

    /// 顶点的全部关联边，按插入顺序
    fn incidences(&self, v: VertexId) -> &[Incidence];

    fn alpha(&self, e: EdgeId) -> Option<VertexId>;

    fn omega(&self, e: EdgeId) -> Option<VertexId>;

    fn vertex_class(&self, v: VertexId) -> Option<ClassId>;

    fn edge_class(&self, e: EdgeId) -> Option<ClassId>;

    /// 结构版本号，每次修改单调递增
    fn version(&self) -> u64;

    /// 沿关联边走到的那一端的角色名
    fn far_role(&self, incidence: &Incidence) -> Option<&str> {
        let class = self.edge_class(incidence.edge)?;
        let info = self.schema().class(class)?;
        match incidence.direction {
            EdgeDirection::In => info.alpha_role.as_deref(),
            _ => info.omega_role.as_deref(),
        }
    }

    fn degree(&self, v: VertexId, direction: EdgeDirection) -> usize {
        self.incidences(v)
            .iter()
            .filter(|inc| direction.admits(inc.direction))
            .count()
    }
}
