use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::query::cost::CostModelConfig;

/// 求值核心的全部配置
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub evaluation: EvaluationConfig,
    pub cost: CostModelConfig,
    pub log: LogConfig,
}

/// 求值过程配置
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// 每累计这么多进度检查一次取消请求并上报进度
    pub cancellation_check_interval: u64,
    /// 单次路径搜索最多访问的 (状态, 顶点) 对数量，0 表示不限
    pub max_search_states: usize,
    /// `list(a..b)` 最多产生的元素个数
    pub max_range_length: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            cancellation_check_interval: 4096,
            max_search_states: 0,
            max_range_length: 10_000_000,
        }
    }
}

/// 日志配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub dir: String,
    pub file: String,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: "logs".to_string(),
            file: "graphquery".to_string(),
            max_file_size: 100 * 1024 * 1024, // 100MB
            max_files: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        if !config.cost.is_valid() {
            return Err("代价模型配置无效".into());
        }
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
