use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::core::vertex_edge_path::{EdgeId, Path, VertexId};

/// 表格值：带列名的行集合
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Value>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }
}

/// 查询求值产生的值
///
/// 集合类使用有序容器，保证结果的迭代顺序稳定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vertex(VertexId),
    Edge(EdgeId),
    Path(Path),
    List(Vec<Value>),
    Set(BTreeSet<Value>),
    Map(BTreeMap<Value, Value>),
    Tuple(Vec<Value>),
    Record(BTreeMap<String, Value>),
    Table(Table),
}

impl Value {
    /// 值的类型名，用于错误信息
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Vertex(_) => "Vertex",
            Value::Edge(_) => "Edge",
            Value::Path(_) => "Path",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::Tuple(_) => "Tuple",
            Value::Record(_) => "Record",
            Value::Table(_) => "Table",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// 数值统一转换为浮点数
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vertex(&self) -> Option<VertexId> {
        match self {
            Value::Vertex(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<EdgeId> {
        match self {
            Value::Edge(e) => Some(*e),
            _ => None,
        }
    }

    /// 是否为有序序列（列表或元组）
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::List(_) | Value::Tuple(_))
    }

    /// 是否为集合类值
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Map(_) | Value::Table(_)
        )
    }

    /// 集合类值的元素个数，非集合返回 None
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.len()),
            Value::Set(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            Value::Record(fields) => Some(fields.len()),
            Value::Table(table) => Some(table.rows.len()),
            Value::String(s) => Some(s.chars().count()),
            _ => None,
        }
    }

    /// 按迭代顺序取出集合类值的元素；映射取其键值对元组
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) | Value::Tuple(items) => Some(items.clone()),
            Value::Set(items) => Some(items.iter().cloned().collect()),
            Value::Map(entries) => Some(
                entries
                    .iter()
                    .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                    .collect(),
            ),
            Value::Table(table) => Some(table.rows.clone()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<VertexId> for Value {
    fn from(v: VertexId) -> Self {
        Value::Vertex(v)
    }
}

impl From<EdgeId> for Value {
    fn from(e: EdgeId) -> Self {
        Value::Edge(e)
    }
}

fn write_joined<'a, I>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = &'a Value>,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Vertex(v) => write!(f, "{}", v),
            Value::Edge(e) => write!(f, "{}", e),
            Value::Path(p) => write!(f, "path({})", p),
            Value::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                write_joined(f, items)?;
                write!(f, "}}")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_joined(f, items)?;
                write!(f, ")")
            }
            Value::Map(entries) => {
                write!(f, "map(")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} -> {}", k, v)?;
                }
                write!(f, ")")
            }
            Value::Record(fields) => {
                write!(f, "rec(")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, ")")
            }
            Value::Table(table) => {
                write!(f, "table[{}](", table.headers.join(", "))?;
                write_joined(f, &table.rows)?;
                write!(f, ")")
            }
        }
    }
}
