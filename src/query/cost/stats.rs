//! 图统计信息
//!
//! 代价模型使用的图规模参数：顶点数、边数，以及每个类（含子类）的元素占比。
//! 统计信息可以随时更新，但已经算出的代价不会随之改变

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::graph::schema::ElementKind;
use crate::graph::DataGraph;
use crate::query::types::TypeRestriction;

#[derive(Debug, Clone, Default)]
struct StatsData {
    vertex_count: f64,
    edge_count: f64,
    /// 类名 -> 该类及其子类的元素在同种元素中所占比例
    class_frequencies: HashMap<String, f64>,
}

/// 图统计信息，线程安全
#[derive(Debug, Default)]
pub struct GraphStatistics {
    data: RwLock<StatsData>,
}

impl GraphStatistics {
    pub fn new(vertex_count: f64, edge_count: f64) -> Self {
        Self {
            data: RwLock::new(StatsData {
                vertex_count,
                edge_count,
                class_frequencies: HashMap::new(),
            }),
        }
    }

    /// 从已加载的数据图统计
    pub fn from_graph(graph: &dyn DataGraph) -> Self {
        let schema = graph.schema();
        let mut vertex_counts = vec![0usize; schema.len()];
        let mut edge_counts = vec![0usize; schema.len()];

        for v in graph.vertices() {
            if let Some(class) = graph.vertex_class(v) {
                for (sup, _) in schema.classes() {
                    if schema.is_subclass(class, sup) {
                        vertex_counts[sup.0 as usize] += 1;
                    }
                }
            }
        }
        for e in graph.edges() {
            if let Some(class) = graph.edge_class(e) {
                for (sup, _) in schema.classes() {
                    if schema.is_subclass(class, sup) {
                        edge_counts[sup.0 as usize] += 1;
                    }
                }
            }
        }

        let vertex_total = graph.vertex_count().max(1) as f64;
        let edge_total = graph.edge_count().max(1) as f64;
        let class_frequencies = schema
            .classes()
            .map(|(id, info)| {
                let freq = match info.kind {
                    ElementKind::Vertex => vertex_counts[id.0 as usize] as f64 / vertex_total,
                    ElementKind::Edge => edge_counts[id.0 as usize] as f64 / edge_total,
                };
                (info.name.clone(), freq)
            })
            .collect();

        log::debug!(
            "统计信息: {} 个顶点, {} 条边, {} 个类",
            graph.vertex_count(),
            graph.edge_count(),
            schema.len()
        );

        Self {
            data: RwLock::new(StatsData {
                vertex_count: graph.vertex_count() as f64,
                edge_count: graph.edge_count() as f64,
                class_frequencies,
            }),
        }
    }

    pub fn vertex_count(&self) -> f64 {
        self.data.read().vertex_count
    }

    pub fn edge_count(&self) -> f64 {
        self.data.read().edge_count
    }

    /// 平均度数（每个顶点的关联边数）
    pub fn average_degree(&self) -> f64 {
        let data = self.data.read();
        if data.vertex_count == 0.0 {
            0.0
        } else {
            2.0 * data.edge_count / data.vertex_count
        }
    }

    pub fn class_frequency(&self, name: &str) -> Option<f64> {
        self.data.read().class_frequencies.get(name).copied()
    }

    pub fn set_counts(&self, vertex_count: f64, edge_count: f64) {
        let mut data = self.data.write();
        data.vertex_count = vertex_count;
        data.edge_count = edge_count;
    }

    pub fn set_class_frequency(&self, name: &str, frequency: f64) {
        self.data
            .write()
            .class_frequencies
            .insert(name.to_string(), frequency.clamp(0.0, 1.0));
    }

    /// 类型限制所接受元素的估计比例
    ///
    /// 接受项频率相加（上限 1），再减去排除项频率；未知类用 `default_frequency`
    pub fn restriction_frequency(&self, restriction: &TypeRestriction, default_frequency: f64) -> f64 {
        if restriction.is_empty() {
            return 1.0;
        }
        let data = self.data.read();
        let lookup = |name: &str| {
            data.class_frequencies
                .get(name)
                .copied()
                .unwrap_or(default_frequency)
        };

        let mut accepted = if restriction.accepted().next().is_none() {
            1.0
        } else {
            restriction
                .accepted()
                .map(|e| lookup(&e.name))
                .sum::<f64>()
                .min(1.0)
        };
        for entry in restriction.excluded() {
            accepted -= lookup(&entry.name);
        }
        accepted.clamp(0.0, 1.0)
    }
}
