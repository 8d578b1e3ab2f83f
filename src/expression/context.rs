//! 求值上下文
//!
//! 一次顶层求值调用的全部可变状态：按节点缓存的结果、变量绑定、
//! 进度计数与取消标志。上下文不跨求值共享，编译后的查询本身保持只读

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::compiled::CompiledQuery;
use crate::core::error::{EvalError, EvalResult};
use crate::core::value::Value;
use crate::graph::DataGraph;
use crate::query::node::NodeId;

/// 进度事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// 周期检查时的累计进度
    Step(u64),
    /// 求值结束时的总进度
    Done(u64),
}

/// 取消令牌，可以在其他线程触发
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 外部提供或接收的具名变量
///
/// `using` 子句从这里读取变量，`store as` 把结果写回这里
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.variables.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// 一次求值的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// 实际执行的节点求值次数（缓存未命中）
    pub evaluations: u64,
    pub cache_hits: u64,
    /// 声明层成功产生的变量组合数
    pub iterations: u64,
    /// 因变量重新绑定而清除的缓存结果数
    pub invalidations: u64,
}

/// 求值上下文
pub struct EvaluationContext<'a> {
    query: &'a CompiledQuery,
    graph: &'a dyn DataGraph,
    environment: &'a mut Environment,
    results: Vec<Option<Value>>,
    bindings: Vec<Option<Value>>,
    progress: u64,
    next_check: u64,
    interval: u64,
    cancellation: Option<CancellationToken>,
    listener: Option<&'a mut dyn FnMut(ProgressEvent)>,
    stats: EvaluationStats,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        query: &'a CompiledQuery,
        graph: &'a dyn DataGraph,
        environment: &'a mut Environment,
    ) -> Self {
        let len = query.graph().len();
        let interval = query.config().cancellation_check_interval.max(1);
        Self {
            query,
            graph,
            environment,
            results: vec![None; len],
            bindings: vec![None; len],
            progress: 0,
            next_check: interval,
            interval,
            cancellation: None,
            listener: None,
            stats: EvaluationStats::default(),
        }
    }

    pub fn with_listener(mut self, listener: &'a mut dyn FnMut(ProgressEvent)) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn query(&self) -> &'a CompiledQuery {
        self.query
    }

    pub fn graph(&self) -> &'a dyn DataGraph {
        self.graph
    }

    pub fn environment(&self) -> &Environment {
        &*self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut *self.environment
    }

    /// 节点在本上下文中的结果（必要时求值）
    pub fn result(&mut self, node: NodeId) -> EvalResult<Value> {
        let query = self.query;
        query.get_result(node, self)
    }

    pub fn cached(&self, node: NodeId) -> Option<&Value> {
        self.results.get(node.index()).and_then(Option::as_ref)
    }

    pub(crate) fn store(&mut self, node: NodeId, value: Value) {
        if let Some(slot) = self.results.get_mut(node.index()) {
            *slot = Some(value);
        }
    }

    pub fn binding(&self, variable: NodeId) -> Option<&Value> {
        self.bindings.get(variable.index()).and_then(Option::as_ref)
    }

    /// 绑定变量，返回原来的值
    ///
    /// 值确实改变时清除该变量全部依赖表达式的缓存结果
    pub fn bind(&mut self, variable: NodeId, value: Value) -> Option<Value> {
        self.set_binding(variable, Some(value))
    }

    /// 恢复 `bind` 之前的绑定
    pub fn restore(&mut self, variable: NodeId, previous: Option<Value>) {
        self.set_binding(variable, previous);
    }

    fn set_binding(&mut self, variable: NodeId, value: Option<Value>) -> Option<Value> {
        let Some(slot) = self.bindings.get_mut(variable.index()) else {
            return None;
        };
        if *slot == value {
            return value;
        }
        let previous = std::mem::replace(slot, value);
        self.invalidate(variable);
        previous
    }

    fn invalidate(&mut self, variable: NodeId) {
        let query = self.query;
        let mut cleared = 0;
        for node in query.depending_expressions(variable) {
            if let Some(slot) = self.results.get_mut(node.index()) {
                if slot.take().is_some() {
                    cleared += 1;
                }
            }
        }
        self.stats.invalidations += cleared;
        log::trace!("变量 {} 重新绑定，清除 {} 个缓存结果", variable, cleared);
    }

    /// 累加进度，每隔固定间隔上报一次并检查取消请求
    pub fn add_progress(&mut self, amount: f64) -> EvalResult<()> {
        let amount = if amount.is_finite() {
            amount.ceil().max(1.0) as u64
        } else {
            1
        };
        self.progress = self.progress.saturating_add(amount);
        if self.progress < self.next_check {
            return Ok(());
        }
        self.next_check = self.progress.saturating_add(self.interval);
        let progress = self.progress;
        self.emit(ProgressEvent::Step(progress));
        match &self.cancellation {
            Some(token) if token.is_cancelled() => {
                log::info!("求值在进度 {} 处被取消", progress);
                Err(EvalError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn record_evaluation(&mut self) {
        self.stats.evaluations += 1;
    }

    pub(crate) fn record_cache_hit(&mut self) {
        self.stats.cache_hits += 1;
    }

    pub(crate) fn record_iteration(&mut self) {
        self.stats.iterations += 1;
    }

    pub fn progress(&self) -> u64 {
        self.progress
    }

    /// 上报结束事件
    pub fn finish(&mut self) {
        self.emit(ProgressEvent::Done(self.progress));
    }

    fn emit(&mut self, event: ProgressEvent) {
        if let Some(listener) = self.listener.as_deref_mut() {
            listener(event);
        }
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }
}
