//! 表达式求值
//!
//! 编译后的查询（`CompiledQuery`）在多次求值之间共享求值器与代价估算；
//! 每次求值使用新的 `EvaluationContext` 保存结果缓存、变量绑定和进度

pub mod compiled;
pub mod context;
pub mod evaluator;
pub mod functions;

pub use compiled::CompiledQuery;
pub use context::{
    CancellationToken, Environment, EvaluationContext, EvaluationStats, ProgressEvent,
};
pub use evaluator::{Evaluator, NodeEvaluator};
pub use functions::{FunctionDescriptor, FunctionLibrary, FunctionRegistry};

use crate::core::error::EvalResult;
use crate::core::value::Value;
use crate::graph::DataGraph;

/// 一次求值的可选项
#[derive(Default)]
pub struct EvaluateOptions<'a> {
    /// 进度监听器，每隔 `cancellation_check_interval` 个进度单位调用一次
    pub progress: Option<&'a mut dyn FnMut(ProgressEvent)>,
    pub cancellation: Option<CancellationToken>,
}

/// 在数据图上求值查询的根表达式
pub fn evaluate<'a>(
    query: &'a CompiledQuery,
    graph: &'a dyn DataGraph,
    environment: &'a mut Environment,
    progress: Option<&'a mut dyn FnMut(ProgressEvent)>,
) -> EvalResult<Value> {
    evaluate_with_options(
        query,
        graph,
        environment,
        EvaluateOptions {
            progress,
            cancellation: None,
        },
    )
}

pub fn evaluate_with_options<'a>(
    query: &'a CompiledQuery,
    graph: &'a dyn DataGraph,
    environment: &'a mut Environment,
    options: EvaluateOptions<'a>,
) -> EvalResult<Value> {
    let root = query.graph().root();
    log::info!(
        "开始求值: 根节点 {}, 查询图 {} 个节点, 数据图 {} 个顶点",
        root,
        query.graph().len(),
        graph.vertex_count()
    );

    let mut ctx = EvaluationContext::new(query, graph, environment);
    if let Some(listener) = options.progress {
        ctx = ctx.with_listener(listener);
    }
    if let Some(token) = options.cancellation {
        ctx = ctx.with_cancellation(token);
    }

    let result = ctx.result(root);
    ctx.finish();

    let stats = ctx.stats();
    match &result {
        Ok(_) => log::info!(
            "求值完成: 进度 {}, 求值 {} 次, 缓存命中 {} 次, 迭代 {} 次",
            ctx.progress(),
            stats.evaluations,
            stats.cache_hits,
            stats.iterations
        ),
        Err(e) => log::info!("求值失败: {}", e),
    }
    result
}
