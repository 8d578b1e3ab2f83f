pub mod error;
pub mod span;
pub mod value;
pub mod vertex_edge_path;

// 错误和结果类型
pub use error::{EvalError, EvalResult, QueryError, QueryErrorKind};

// 核心数据类型
pub use span::{Position, Span};
pub use value::{Table, Value};
pub use vertex_edge_path::{EdgeDirection, EdgeId, Path, Step, VertexId};
