//! 代价模型
//!
//! 每个求值器一次性计算、之后只读的代价估算，供外部优化器使用

pub mod config;
pub mod estimate;
pub mod stats;

pub use config::CostModelConfig;
pub use estimate::CostEstimate;
pub use stats::GraphStatistics;
