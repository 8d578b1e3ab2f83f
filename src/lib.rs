//! GraphQuery - evaluation core of a graph query language
//!
//! A memoizing evaluator over compiled query graphs, with declaration-layer
//! iteration, a cost model for an external optimizer, and regular path
//! expressions compiled to automata for reachability search on a loaded
//! property graph.

pub mod automaton;
pub mod config;
pub mod core;
pub mod expression;
pub mod graph;
pub mod query;
pub mod utils;

pub use crate::core::error::{EvalError, EvalResult, QueryError, QueryErrorKind};
pub use crate::core::value::Value;
pub use crate::expression::{evaluate, evaluate_with_options, CompiledQuery, EvaluateOptions};
