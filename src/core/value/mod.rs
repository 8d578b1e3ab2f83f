//! 值类型模块

pub mod comparison;
pub mod types;

pub use types::{Table, Value};
