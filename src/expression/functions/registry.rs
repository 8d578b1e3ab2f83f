//! 函数注册表
//!
//! 提供函数的注册、查找和执行功能
//! 具体函数实现位于 builtin/ 子模块

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use regex::Regex;

use super::{FunctionCall, FunctionDescriptor, FunctionLibrary};
use crate::core::error::{EvalError, EvalResult, QueryError};
use crate::core::value::Value;

type FunctionBody = Box<dyn Fn(&FunctionCall<'_>) -> EvalResult<Value> + Send + Sync>;

struct RegisteredFunction {
    descriptor: FunctionDescriptor,
    body: FunctionBody,
}

/// 函数注册表
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
    /// 编译过的正则表达式，按模式串缓存
    regex_cache: Arc<DashMap<String, Regex>>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .field("regex_cache", &self.regex_cache.len())
            .finish()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// 带全部内置函数的注册表
    pub fn new() -> Self {
        let mut registry = Self::empty();
        super::builtin::register_all(&mut registry);
        registry
    }

    /// 空注册表
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
            regex_cache: Arc::new(DashMap::new()),
        }
    }

    /// 注册函数；同名函数会被替换
    pub fn register<F>(&mut self, descriptor: FunctionDescriptor, body: F)
    where
        F: Fn(&FunctionCall<'_>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.functions.insert(
            descriptor.name.clone(),
            RegisteredFunction {
                descriptor,
                body: Box::new(body),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.functions.keys().map(|s| s.as_str()).collect()
    }

    /// 取得（必要时编译）正则表达式
    pub fn regex(&self, pattern: &str) -> EvalResult<Regex> {
        compiled_regex(&self.regex_cache, pattern)
    }

    pub(crate) fn regex_cache(&self) -> Arc<DashMap<String, Regex>> {
        self.regex_cache.clone()
    }
}

pub(crate) fn compiled_regex(cache: &DashMap<String, Regex>, pattern: &str) -> EvalResult<Regex> {
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(pattern).map_err(|e| {
        QueryError::invalid_argument(format!("无效的正则表达式 {}: {}", pattern, e))
    })?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

impl FunctionLibrary for FunctionRegistry {
    fn lookup(&self, name: &str) -> Option<FunctionDescriptor> {
        self.functions.get(name).map(|f| f.descriptor.clone())
    }

    fn apply(&self, descriptor: &FunctionDescriptor, call: FunctionCall<'_>) -> EvalResult<Value> {
        let function = self
            .functions
            .get(&descriptor.name)
            .ok_or_else(|| EvalError::UnknownFunction(descriptor.name.clone()))?;
        (function.body)(&call)
    }
}

/// 全局函数注册表实例
pub fn global_registry() -> Arc<FunctionRegistry> {
    static REGISTRY: OnceLock<Arc<FunctionRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Arc::new(FunctionRegistry::new()))
        .clone()
}
