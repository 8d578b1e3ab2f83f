//! 值构造：集合/列表/元组、整数区间、记录与映射

use std::collections::{BTreeMap, BTreeSet};

use super::NodeEvaluator;
use crate::core::error::{EvalError, EvalResult, QueryError};
use crate::core::value::Value;
use crate::expression::compiled::CompiledQuery;
use crate::expression::context::EvaluationContext;
use crate::query::node::{ConstructionKind, NodeId, NodeKind};

#[derive(Debug)]
pub struct ConstructionEvaluator {
    pub(crate) kind: ConstructionKind,
    pub(crate) parts: Vec<NodeId>,
}

impl NodeEvaluator for ConstructionEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(self.parts.len());
        for &part in &self.parts {
            values.push(ctx.result(part)?);
        }
        Ok(match self.kind {
            ConstructionKind::List => Value::List(values),
            ConstructionKind::Tuple => Value::Tuple(values),
            ConstructionKind::Set => Value::Set(values.into_iter().collect::<BTreeSet<_>>()),
        })
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * self.parts.len() as f64
    }

    fn cardinality(&self, _query: &CompiledQuery) -> f64 {
        self.parts.len() as f64
    }
}

/// `list(first..last)`，两端都包含
#[derive(Debug)]
pub struct ListRangeEvaluator {
    pub(crate) first: NodeId,
    pub(crate) last: NodeId,
}

impl ListRangeEvaluator {
    fn literal_bound(query: &CompiledQuery, node: NodeId) -> Option<i64> {
        match query.graph().kind(node)? {
            NodeKind::Literal(Value::Int(n)) => Some(*n),
            _ => None,
        }
    }
}

impl NodeEvaluator for ListRangeEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let first = ctx.result(self.first)?;
        let last = ctx.result(self.last)?;
        match (&first, &last) {
            (Value::Int(a), Value::Int(b)) => {
                let length = (i128::from(*b) - i128::from(*a) + 1).max(0);
                let limit = ctx.query().config().max_range_length;
                if length > i128::from(limit) {
                    return Err(QueryError::invalid_argument(format!(
                        "区间 {}..{} 含 {} 个元素, 超过上限 {}",
                        a, b, length, limit
                    ))
                    .into());
                }
                Ok(Value::List((*a..=*b).map(Value::Int).collect()))
            }
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Int(_), other) | (other, _) => {
                Err(QueryError::type_mismatch("Int", other.type_name()).into())
            }
        }
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * self.cardinality(query)
    }

    fn cardinality(&self, query: &CompiledQuery) -> f64 {
        match (
            Self::literal_bound(query, self.first),
            Self::literal_bound(query, self.last),
        ) {
            (Some(a), Some(b)) => (b.saturating_sub(a).saturating_add(1)).max(0) as f64,
            _ => query.cost_config().default_domain_cardinality,
        }
    }
}

/// `rec(name: value, ...)`
#[derive(Debug)]
pub struct RecordConstructionEvaluator {
    pub(crate) fields: Vec<(NodeId, NodeId)>,
}

impl NodeEvaluator for RecordConstructionEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let graph = ctx.query().graph();
        let mut record = BTreeMap::new();
        for &(id, value) in &self.fields {
            let name = graph
                .identifier(id)
                .ok_or_else(|| EvalError::internal(format!("记录字段名节点 {} 不是标识符", id)))?;
            record.insert(name.to_string(), ctx.result(value)?);
        }
        Ok(Value::Record(record))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * self.fields.len() as f64
    }
}

/// `map(k1 -> v1, ...)`，后出现的键覆盖先出现的
#[derive(Debug)]
pub struct MapConstructionEvaluator {
    pub(crate) keys: Vec<NodeId>,
    pub(crate) values: Vec<NodeId>,
}

impl NodeEvaluator for MapConstructionEvaluator {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        if self.keys.len() != self.values.len() {
            return Err(EvalError::InconsistentConstruction(format!(
                "映射有 {} 个键, {} 个值",
                self.keys.len(),
                self.values.len()
            )));
        }
        let mut map = BTreeMap::new();
        for (&key, &value) in self.keys.iter().zip(&self.values) {
            let key = ctx.result(key)?;
            let value = ctx.result(value)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn own_cost(&self, query: &CompiledQuery) -> f64 {
        query.cost_config().insert_cost * self.keys.len() as f64
    }

    fn cardinality(&self, _query: &CompiledQuery) -> f64 {
        self.keys.len() as f64
    }
}
