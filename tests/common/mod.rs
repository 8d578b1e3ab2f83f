//! 集成测试共享工具模块
//!
//! 提供数据图夹具、计数函数库和构建查询的辅助函数

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use graphquery::core::vertex_edge_path::VertexId;
use graphquery::core::{EvalResult, Value};
use graphquery::expression::functions::{FunctionCall, FunctionDescriptor, FunctionLibrary};
use graphquery::expression::{CompiledQuery, FunctionRegistry};
use graphquery::graph::{InMemoryGraph, Schema};
use graphquery::query::{NodeId, NodeKind, QueryGraph, QueryGraphBuilder};

/// 记录每个函数被调用次数的函数库
///
/// 内置函数之外额外提供 `echo(x)`，原样返回参数
#[derive(Debug)]
pub struct CountingLibrary {
    inner: FunctionRegistry,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingLibrary {
    pub fn new() -> Self {
        let mut inner = FunctionRegistry::new();
        inner.register(FunctionDescriptor::new("echo", Some(1)), |call| {
            Ok(call.arg(0).clone())
        });
        Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl FunctionLibrary for CountingLibrary {
    fn lookup(&self, name: &str) -> Option<FunctionDescriptor> {
        self.inner.lookup(name)
    }

    fn apply(&self, descriptor: &FunctionDescriptor, call: FunctionCall<'_>) -> EvalResult<Value> {
        *self
            .calls
            .lock()
            .entry(descriptor.name.clone())
            .or_insert(0) += 1;
        self.inner.apply(descriptor, call)
    }
}

/// 用计数函数库编译查询图
pub fn compile_counting(
    builder: QueryGraphBuilder,
    root: NodeId,
) -> (CompiledQuery, Arc<CountingLibrary>) {
    let library = Arc::new(CountingLibrary::new());
    let graph = builder.build(root).expect("构建查询图失败");
    let query = CompiledQuery::new(graph, library.clone());
    (query, library)
}

/// 用内置函数库编译查询图
pub fn compile(builder: QueryGraphBuilder, root: NodeId) -> CompiledQuery {
    let graph = builder.build(root).expect("构建查询图失败");
    CompiledQuery::new(graph, Arc::new(FunctionRegistry::new()))
}

/// 声明 `name in domain`，返回 (变量, 简单声明)
pub fn simple_declaration(
    b: &mut QueryGraphBuilder,
    name: &str,
    domain: NodeId,
) -> (NodeId, NodeId) {
    let var = b.variable(name);
    let simple = b.add(NodeKind::SimpleDeclaration {
        variables: vec![var],
        domain,
    });
    (var, simple)
}

/// 只含一个变量、没有约束的声明，返回 (变量, 声明)
pub fn declaration(b: &mut QueryGraphBuilder, name: &str, domain: Value) -> (NodeId, NodeId) {
    let domain = b.literal(domain);
    let (var, simple) = simple_declaration(b, name, domain);
    let decl = b.add(NodeKind::Declaration {
        simple_declarations: vec![simple],
        constraints: vec![],
    });
    (var, decl)
}

pub fn int_list(items: impl IntoIterator<Item = i64>) -> Value {
    Value::List(items.into_iter().map(Value::Int).collect())
}

pub fn vertex_set(ids: &[u32]) -> Value {
    Value::Set(ids.iter().map(|&i| Value::Vertex(VertexId(i))).collect())
}

pub fn empty_graph() -> InMemoryGraph {
    InMemoryGraph::builder(Schema::new()).build()
}

/// 城镇路网
///
/// ```text
/// v1 -Road-> v2 -Road-> v3 -Rail-> v4
///  ^                    |
///  +-------Road---------+
/// ```
/// v1..v3 是 Town，v4 是 City（Town 的子类）。Road 的两端角色为 from/to
pub fn town_graph() -> InMemoryGraph {
    let mut schema = Schema::new();
    schema.add_vertex_class("Town", &[]).expect("添加类失败");
    schema.add_vertex_class("City", &["Town"]).expect("添加类失败");
    schema
        .add_edge_class("Road", &[], Some("from"), Some("to"))
        .expect("添加类失败");
    schema
        .add_edge_class("Rail", &[], Some("departure"), Some("arrival"))
        .expect("添加类失败");

    let mut b = InMemoryGraph::builder(schema);
    let v1 = b.add_vertex("Town").expect("添加顶点失败");
    let v2 = b.add_vertex("Town").expect("添加顶点失败");
    let v3 = b.add_vertex("Town").expect("添加顶点失败");
    let v4 = b.add_vertex("City").expect("添加顶点失败");
    b.add_edge("Road", v1, v2).expect("添加边失败");
    b.add_edge("Road", v2, v3).expect("添加边失败");
    b.add_edge("Rail", v3, v4).expect("添加边失败");
    b.add_edge("Road", v3, v1).expect("添加边失败");
    b.build()
}

pub fn builder() -> QueryGraphBuilder {
    QueryGraph::builder()
}
