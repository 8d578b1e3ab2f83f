//! `V{types}` 与 `E{types}`：数据图中满足类型限制的全部顶点或边

use std::collections::BTreeSet;

use super::NodeEvaluator;
use crate::core::error::EvalResult;
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::graph::schema::ElementKind;
use crate::graph::TypeCollection;
use crate::query::types::TypeRestriction;

#[derive(Debug)]
pub struct ElementSetEvaluator {
    element: ElementKind,
    types: TypeRestriction,
}

impl ElementSetEvaluator {
    pub fn vertices(types: &TypeRestriction) -> Self {
        Self {
            element: ElementKind::Vertex,
            types: types.clone(),
        }
    }

    pub fn edges(types: &TypeRestriction) -> Self {
        Self {
            element: ElementKind::Edge,
            types: types.clone(),
        }
    }

    fn element_count(&self, query: &CompiledQuery) -> f64 {
        match self.element {
            ElementKind::Vertex => query.statistics().vertex_count(),
            ElementKind::Edge => query.statistics().edge_count(),
        }
    }
}

impl NodeEvaluator for ElementSetEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let graph = ctx.graph();
        let schema = graph.schema();
        let collection = TypeCollection::resolve(&self.types, schema)?;
        let set: BTreeSet<Value> = match self.element {
            ElementKind::Vertex => graph
                .vertices()
                .into_iter()
                .filter(|&v| {
                    graph
                        .vertex_class(v)
                        .is_some_and(|c| collection.accepts(schema, c))
                })
                .map(Value::Vertex)
                .collect(),
            ElementKind::Edge => graph
                .edges()
                .into_iter()
                .filter(|&e| {
                    graph
                        .edge_class(e)
                        .is_some_and(|c| collection.accepts(schema, c))
                })
                .map(Value::Edge)
                .collect(),
        };
        Ok(Value::Set(set))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * self.element_count(query)
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        let frequency = query
            .statistics()
            .restriction_frequency(&self.types, query.cost_config().default_class_frequency);
        self.element_count(query) * frequency
    }
}
