//! 求值器
//!
//! 每个查询节点对应一个求值器，按节点种类静态分派到具体实现。
//! 求值器只保存与单次求值无关的内容：子节点引用和一次计算的代价估算；
//! 结果缓存在 `EvaluationContext` 中

pub mod basic;
pub mod comprehension;
pub mod construction;
pub mod declaration;
pub mod element_set;
pub mod function;
pub mod path;
pub mod quantified;

pub use basic::{
    ConditionalEvaluator, LetEvaluator, LiteralEvaluator, RootEvaluator, VariableEvaluator,
};
pub use comprehension::ComprehensionEvaluator;
pub use construction::{
    ConstructionEvaluator, ListRangeEvaluator, MapConstructionEvaluator,
    RecordConstructionEvaluator,
};
pub use declaration::{DeclarationEvaluator, DeclarationLayer, SimpleDeclarationEvaluator};
pub use element_set::ElementSetEvaluator;
pub use function::FunctionApplicationEvaluator;
pub use path::{PathDescriptionEvaluator, PathSearchEvaluator, SearchMode};
pub use quantified::QuantifiedEvaluator;

use std::sync::OnceLock;

use super::compiled::CompiledQuery;
use super::context::EvaluationContext;
use crate::core::error::{EvalError, EvalResult, QueryError, QueryErrorKind};
use crate::core::value::Value;
use crate::query::cost::CostEstimate;
use crate::query::node::{NodeId, NodeKind};

/// 具体求值器的公共能力：求值与代价估算
pub trait NodeEvaluator: Send + Sync {
    fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value>;

    /// 求值一次本节点自身的代价，不含子节点
    fn own_cost(&self, query: &CompiledQuery) -> f64;

    /// 结果元素个数的估计
    fn cardinality(&self, _query: &CompiledQuery) -> f64 {
        1.0
    }

    /// 作为布尔条件时为真的比例
    fn selectivity(&self, _query: &CompiledQuery) -> f64 {
        1.0
    }
}

#[derive(Debug)]
pub enum EvaluatorKind {
    Literal(LiteralEvaluator),
    Variable(VariableEvaluator),
    Function(FunctionApplicationEvaluator),
    Conditional(ConditionalEvaluator),
    Let(LetEvaluator),
    Root(RootEvaluator),
    Quantified(QuantifiedEvaluator),
    Declaration(DeclarationEvaluator),
    SimpleDeclaration(SimpleDeclarationEvaluator),
    Comprehension(ComprehensionEvaluator),
    Construction(ConstructionEvaluator),
    ListRange(ListRangeEvaluator),
    Record(RecordConstructionEvaluator),
    Map(MapConstructionEvaluator),
    ElementSet(ElementSetEvaluator),
    PathDescription(PathDescriptionEvaluator),
    PathSearch(PathSearchEvaluator),
}

impl EvaluatorKind {
    fn build(query: &CompiledQuery, node: NodeId, kind: &NodeKind) -> Option<Self> {
        let evaluator = match kind {
            NodeKind::Identifier(_) => return None,
            NodeKind::Literal(value) => Self::Literal(LiteralEvaluator::new(value.clone())),
            NodeKind::Variable(name) => Self::Variable(VariableEvaluator::new(name)),
            NodeKind::ThisVertex => Self::Variable(VariableEvaluator::new("thisVertex")),
            NodeKind::ThisEdge => Self::Variable(VariableEvaluator::new("thisEdge")),
            NodeKind::FunctionApplication { function, args } => Self::Function(
                FunctionApplicationEvaluator::new(query, node, function, args.clone()),
            ),
            NodeKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => Self::Conditional(ConditionalEvaluator {
                condition: *condition,
                then_branch: *then_branch,
                else_branch: *else_branch,
            }),
            NodeKind::Let { definitions, bound } => Self::Let(LetEvaluator {
                definitions: definitions.clone(),
                bound: *bound,
            }),
            NodeKind::Root {
                bound_variables,
                query: expression,
                store_as,
            } => Self::Root(RootEvaluator {
                bound_variables: bound_variables.clone(),
                query: *expression,
                store_as: store_as.clone(),
            }),
            NodeKind::Quantified {
                quantifier,
                declaration,
                bound,
            } => Self::Quantified(QuantifiedEvaluator {
                quantifier: *quantifier,
                declaration: *declaration,
                bound: *bound,
            }),
            NodeKind::Declaration {
                simple_declarations,
                constraints,
            } => Self::Declaration(DeclarationEvaluator {
                simple_declarations: simple_declarations.clone(),
                constraints: constraints.clone(),
            }),
            NodeKind::SimpleDeclaration { variables, domain } => {
                Self::SimpleDeclaration(SimpleDeclarationEvaluator {
                    variables: variables.clone(),
                    domain: *domain,
                })
            }
            NodeKind::Comprehension {
                kind,
                declaration,
                result,
                key,
                max_count,
            } => Self::Comprehension(ComprehensionEvaluator {
                kind: kind.clone(),
                declaration: *declaration,
                result: *result,
                key: *key,
                max_count: *max_count,
            }),
            NodeKind::Construction { kind, parts } => Self::Construction(ConstructionEvaluator {
                kind: *kind,
                parts: parts.clone(),
            }),
            NodeKind::ListRange { first, last } => Self::ListRange(ListRangeEvaluator {
                first: *first,
                last: *last,
            }),
            NodeKind::RecordConstruction { fields } => {
                Self::Record(RecordConstructionEvaluator {
                    fields: fields.clone(),
                })
            }
            NodeKind::MapConstruction { keys, values } => Self::Map(MapConstructionEvaluator {
                keys: keys.clone(),
                values: values.clone(),
            }),
            NodeKind::VertexSet(types) => Self::ElementSet(ElementSetEvaluator::vertices(types)),
            NodeKind::EdgeSet(types) => Self::ElementSet(ElementSetEvaluator::edges(types)),
            NodeKind::PathDescription(description) => {
                Self::PathDescription(PathDescriptionEvaluator::new(description.clone()))
            }
            NodeKind::PathExistence {
                start,
                path,
                target,
            } => Self::PathSearch(PathSearchEvaluator::new(
                SearchMode::Existence,
                Some(*start),
                *path,
                Some(*target),
            )),
            NodeKind::ForwardVertexSet { start, path } => Self::PathSearch(
                PathSearchEvaluator::new(SearchMode::Forward, Some(*start), *path, None),
            ),
            NodeKind::BackwardVertexSet { path, target } => Self::PathSearch(
                PathSearchEvaluator::new(SearchMode::Backward, None, *path, Some(*target)),
            ),
            NodeKind::PathExtraction {
                start,
                path,
                target,
            } => Self::PathSearch(PathSearchEvaluator::new(
                SearchMode::Extraction,
                Some(*start),
                *path,
                Some(*target),
            )),
        };
        Some(evaluator)
    }

    pub fn as_node_evaluator(&self) -> &dyn NodeEvaluator {
        match self {
            Self::Literal(e) => e,
            Self::Variable(e) => e,
            Self::Function(e) => e,
            Self::Conditional(e) => e,
            Self::Let(e) => e,
            Self::Root(e) => e,
            Self::Quantified(e) => e,
            Self::Declaration(e) => e,
            Self::SimpleDeclaration(e) => e,
            Self::Comprehension(e) => e,
            Self::Construction(e) => e,
            Self::ListRange(e) => e,
            Self::Record(e) => e,
            Self::Map(e) => e,
            Self::ElementSet(e) => e,
            Self::PathDescription(e) => e,
            Self::PathSearch(e) => e,
        }
    }
}

/// 一个查询节点的求值器
#[derive(Debug)]
pub struct Evaluator {
    node: NodeId,
    kind: EvaluatorKind,
    cost: OnceLock<CostEstimate>,
    cardinality: OnceLock<f64>,
    selectivity: OnceLock<f64>,
}

impl Evaluator {
    pub(crate) fn build(query: &CompiledQuery, node: NodeId) -> Option<Self> {
        let kind = query.graph().kind(node)?;
        let kind = EvaluatorKind::build(query, node, kind)?;
        Some(Self {
            node,
            kind,
            cost: OnceLock::new(),
            cardinality: OnceLock::new(),
            selectivity: OnceLock::new(),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> &EvaluatorKind {
        &self.kind
    }

    pub fn path_description(&self) -> Option<&PathDescriptionEvaluator> {
        match &self.kind {
            EvaluatorKind::PathDescription(e) => Some(e),
            _ => None,
        }
    }

    /// 本节点在上下文中的结果
    ///
    /// 首次访问时求值并缓存；变量总是读取当前绑定。出错时按本节点
    /// 被引用的位置收窄错误的候选位置
    pub fn get_result(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        let query = ctx.query();
        if let EvaluatorKind::Variable(variable) = &self.kind {
            return variable
                .current(ctx, self.node)
                .map_err(|e| self.locate(query, e));
        }
        if let Some(value) = ctx.cached(self.node) {
            let value = value.clone();
            ctx.record_cache_hit();
            return Ok(value);
        }

        let result = ctx
            .add_progress(self.own_cost(query))
            .and_then(|_| self.kind.as_node_evaluator().evaluate(ctx));
        match result {
            Ok(value) => {
                ctx.record_evaluation();
                ctx.store(self.node, value.clone());
                Ok(value)
            }
            Err(e) => Err(self.locate(query, e)),
        }
    }

    /// 直接求值，不读写缓存
    pub fn evaluate(&self, ctx: &mut EvaluationContext<'_>) -> EvalResult<Value> {
        self.kind.as_node_evaluator().evaluate(ctx)
    }

    fn locate(&self, query: &CompiledQuery, error: EvalError) -> EvalError {
        let spans = query.graph().reference_spans(self.node);
        let error = match error {
            EvalError::Query(err) if err.positions.is_empty() && !spans.is_empty() => {
                EvalError::Query(QueryError {
                    positions: spans.clone(),
                    ..err
                })
            }
            other => other,
        };
        error.narrowed(&spans)
    }

    pub fn cost_estimate(&self, query: &CompiledQuery) -> CostEstimate {
        *self.cost.get_or_init(|| {
            let own = self.kind.as_node_evaluator().own_cost(query);
            let combinations = query.variable_combinations(self.node);
            let children: Vec<f64> = query
                .graph()
                .child_edges(self.node)
                .filter(|edge| !edge.relation.is_binding())
                .map(|edge| query.subtree_cost(edge.child))
                .collect();
            CostEstimate::combine(own, combinations, &children)
        })
    }

    pub fn own_cost(&self, query: &CompiledQuery) -> f64 {
        self.cost_estimate(query).own_cost
    }

    pub fn subtree_cost(&self, query: &CompiledQuery) -> f64 {
        self.cost_estimate(query).subtree_cost
    }

    pub fn cardinality(&self, query: &CompiledQuery) -> f64 {
        *self
            .cardinality
            .get_or_init(|| self.kind.as_node_evaluator().cardinality(query))
    }

    pub fn selectivity(&self, query: &CompiledQuery) -> f64 {
        *self
            .selectivity
            .get_or_init(|| self.kind.as_node_evaluator().selectivity(query).clamp(0.0, 1.0))
    }
}

/// 期望布尔值：null 视为假
pub(crate) fn truth(value: &Value, what: &str) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(QueryError::new(
            QueryErrorKind::TypeMismatch,
            format!("{} 必须是布尔值, 实际 {}", what, other.type_name()),
        )
        .into()),
    }
}
