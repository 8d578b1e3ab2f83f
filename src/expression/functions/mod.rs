//! 函数库
//!
//! 函数应用求值器只依赖 `FunctionLibrary` 的分派约定：
//! 按名字查得描述，再按描述的标志组装参数并调用

pub mod builtin;
pub mod registry;

pub use registry::{global_registry, FunctionRegistry};

use crate::core::error::EvalResult;
use crate::core::value::Value;
use crate::graph::DataGraph;
use crate::query::node::NodeId;

/// 函数描述
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// 调用时需要数据图
    pub needs_graph_arg: bool,
    /// 调用时需要调用方节点
    pub needs_evaluator_arg: bool,
    /// 固定参数个数；`None` 表示可变
    pub arg_count: Option<usize>,
    /// 单次调用代价；`None` 时使用代价模型的默认值
    pub cost: Option<f64>,
    /// 作为谓词时的选择率；`None` 时使用代价模型的默认值
    pub selectivity: Option<f64>,
}

impl FunctionDescriptor {
    pub fn new(name: &str, arg_count: Option<usize>) -> Self {
        Self {
            name: name.to_string(),
            needs_graph_arg: false,
            needs_evaluator_arg: false,
            arg_count,
            cost: None,
            selectivity: None,
        }
    }

    pub fn with_graph(mut self) -> Self {
        self.needs_graph_arg = true;
        self
    }

    pub fn with_evaluator(mut self) -> Self {
        self.needs_evaluator_arg = true;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = Some(selectivity);
        self
    }
}

/// 一次函数调用的参数
pub struct FunctionCall<'a> {
    /// 仅当描述要求时提供
    pub graph: Option<&'a dyn DataGraph>,
    /// 仅当描述要求时提供
    pub caller: Option<NodeId>,
    pub args: Vec<Value>,
}

impl<'a> FunctionCall<'a> {
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            graph: None,
            caller: None,
            args,
        }
    }

    /// 缺失的参数视为 null
    pub fn arg(&self, index: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.args.get(index).unwrap_or(&NULL)
    }
}

/// 函数库
pub trait FunctionLibrary: Send + Sync {
    fn lookup(&self, name: &str) -> Option<FunctionDescriptor>;

    fn apply(&self, descriptor: &FunctionDescriptor, call: FunctionCall<'_>) -> EvalResult<Value>;
}
