//! 节点代价估算结果
//!
//! - 自身代价：对一个变量组合求值一次的代价
//! - 迭代代价：自身代价乘以节点所依赖变量的组合数
//! - 子树代价：迭代代价加上所有子节点的子树代价

/// 节点代价估算结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    /// 节点自身代价（不包含子节点）
    pub own_cost: f64,
    /// 按变量组合数放大后的代价
    pub iterated_cost: f64,
    /// 累计代价（包含所有子节点）
    pub subtree_cost: f64,
}

impl CostEstimate {
    pub fn new(own_cost: f64, iterated_cost: f64, subtree_cost: f64) -> Self {
        Self {
            own_cost,
            iterated_cost,
            subtree_cost,
        }
    }

    /// 叶子节点：没有子节点，也不依赖任何变量
    pub fn leaf(own_cost: f64) -> Self {
        Self {
            own_cost,
            iterated_cost: own_cost,
            subtree_cost: own_cost,
        }
    }

    pub fn zero() -> Self {
        Self::leaf(0.0)
    }

    /// 由自身代价、变量组合数和子节点的子树代价合成
    pub fn combine(own_cost: f64, variable_combinations: f64, child_subtree_costs: &[f64]) -> Self {
        let iterated_cost = own_cost * variable_combinations;
        let children: f64 = child_subtree_costs.iter().sum();
        Self {
            own_cost,
            iterated_cost,
            subtree_cost: iterated_cost + children,
        }
    }

    /// 自身代价在子树代价中所占比例
    pub fn cost_ratio(&self) -> f64 {
        if self.subtree_cost == 0.0 {
            0.0
        } else {
            self.own_cost / self.subtree_cost
        }
    }

    pub fn is_valid(&self) -> bool {
        self.own_cost >= 0.0 && self.iterated_cost >= 0.0 && self.subtree_cost >= 0.0
    }
}

impl Default for CostEstimate {
    fn default() -> Self {
        Self::zero()
    }
}
