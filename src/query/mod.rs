//! 查询图模型
//!
//! 外部解析器和优化器产出的编译后查询：带类型关系的表达式节点图，
//! 以及代价模型所需的配置与统计信息

pub mod cost;
pub mod graph;
pub mod node;
pub mod types;

pub use graph::{QueryEdge, QueryGraph, QueryGraphBuilder, QueryNode};
pub use node::{
    ComprehensionKind, ConstructionKind, NodeId, NodeKind, PathDescription, PathShape,
    Quantifier, Relation, VertexRestriction,
};
pub use types::{TypeEntry, TypeRestriction};
