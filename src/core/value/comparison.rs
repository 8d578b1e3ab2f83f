use super::types::Value;
use std::cmp::Ordering as CmpOrdering;
use std::hash::{Hash, Hasher};

// f64 没有全序，这里统一用 total_cmp，保证 Value 可以放进有序集合
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        match (self, other) {
            (Value::Null, Value::Null) => CmpOrdering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Vertex(a), Value::Vertex(b)) => a.cmp(b),
            (Value::Edge(a), Value::Edge(b)) => a.cmp(b),
            (Value::Path(a), Value::Path(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.cmp(b),
            (Value::Table(a), Value::Table(b)) => a.cmp(b),
            // 不同类型之间按类型优先级排序
            (a, b) => type_priority(a).cmp(&type_priority(b)),
        }
    }
}

fn type_priority(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Float(_) => 3,
        Value::String(_) => 4,
        Value::Vertex(_) => 5,
        Value::Edge(_) => 6,
        Value::Path(_) => 7,
        Value::List(_) => 8,
        Value::Set(_) => 9,
        Value::Map(_) => 10,
        Value::Tuple(_) => 11,
        Value::Record(_) => 12,
        Value::Table(_) => 13,
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        type_priority(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::Vertex(v) => v.hash(state),
            Value::Edge(e) => e.hash(state),
            Value::Path(p) => p.hash(state),
            Value::List(items) | Value::Tuple(items) => items.hash(state),
            Value::Set(items) => {
                for item in items {
                    item.hash(state);
                }
            }
            Value::Map(entries) => {
                for (k, v) in entries {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Record(fields) => {
                for (k, v) in fields {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Table(table) => table.hash(state),
        }
    }
}

impl Value {
    /// 数值比较，整数与浮点数之间可以互相比较
    pub fn compare_numeric(&self, other: &Value) -> Option<CmpOrdering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_float()?;
                let b = other.as_float()?;
                a.partial_cmp(&b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vertex_edge_path::VertexId;
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn test_float_total_order() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Float(1.0) < Value::Float(2.5));
    }

    #[test]
    fn test_cross_type_ordering() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Int(100) < Value::String("a".into()));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_set_semantics() {
        let set: BTreeSet<Value> = vec![Value::Int(2), Value::Int(1), Value::Int(2)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);

        let hashed: HashSet<Value> = vec![
            Value::Vertex(VertexId(1)),
            Value::Vertex(VertexId(1)),
            Value::Vertex(VertexId(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(hashed.len(), 2);
    }

    #[test]
    fn test_compare_numeric() {
        assert_eq!(
            Value::Int(1).compare_numeric(&Value::Float(1.5)),
            Some(CmpOrdering::Less)
        );
        assert_eq!(Value::Int(1).compare_numeric(&Value::String("x".into())), None);
    }
}
