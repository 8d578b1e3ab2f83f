//! 路径自动机
//!
//! 正则路径描述先编译为 NFA，再经子集构造得到 DFA，
//! 最后在数据图上做 (状态, 顶点) 的广度优先搜索

pub mod dfa;
pub mod nfa;
pub mod search;
pub mod transition;

pub use dfa::{Dfa, DfaState, DfaTransition};
pub use nfa::Nfa;
pub use search::{find_path, is_reachable, reachable_vertices, GuardContext};
pub use transition::{EdgeGuard, Guard, Transition, VertexGuard};
