//! 代价模型配置
//!
//! 各类节点的基础代价与默认选择率。估算只影响报告给优化器的数字，
//! 不影响求值结果

use serde::{Deserialize, Serialize};

/// 代价模型配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    /// 字面量、变量等简单节点的代价
    pub simple_cost: f64,

    /// 函数调用的默认代价（函数描述未给出时使用）
    pub function_cost: f64,

    /// 向结果集合插入一个元素的代价
    pub insert_cost: f64,

    /// 声明层每产生一个变量组合的代价
    pub combination_cost: f64,

    /// 自动机中每个状态的构造代价
    pub automaton_state_cost: f64,

    /// 搜索中访问一个 (状态, 顶点) 对的代价
    pub search_step_cost: f64,

    /// 布尔函数的默认选择率
    ///
    /// 函数描述未给出选择率时使用。默认值 0.5
    pub function_selectivity: f64,

    /// 量词表达式的默认选择率
    pub quantifier_selectivity: f64,

    /// 路径存在性判断的默认选择率
    pub path_existence_selectivity: f64,

    /// 统计信息中没有的类所用的默认频率
    pub default_class_frequency: f64,

    /// 无法估算时假定的取值域基数
    pub default_domain_cardinality: f64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            simple_cost: 1.0,
            function_cost: 2.0,
            insert_cost: 1.0,
            combination_cost: 1.0,
            automaton_state_cost: 5.0,
            search_step_cost: 1.0,
            function_selectivity: 0.5,
            quantifier_selectivity: 0.5,
            path_existence_selectivity: 0.1,
            default_class_frequency: 0.1,
            default_domain_cardinality: 10.0,
        }
    }
}

impl CostModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 检查配置是否合理：代价非负，选择率和频率位于 [0, 1]
    pub fn is_valid(&self) -> bool {
        let costs = [
            self.simple_cost,
            self.function_cost,
            self.insert_cost,
            self.combination_cost,
            self.automaton_state_cost,
            self.search_step_cost,
            self.default_domain_cardinality,
        ];
        let ratios = [
            self.function_selectivity,
            self.quantifier_selectivity,
            self.path_existence_selectivity,
            self.default_class_frequency,
        ];
        costs.iter().all(|c| *c >= 0.0) && ratios.iter().all(|r| (0.0..=1.0).contains(r))
    }
}
