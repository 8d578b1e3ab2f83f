//! 查询源码位置
//!
//! 查询图中的每条入边都可以携带一个源码跨度，表示该引用在查询文本中的位置。
//! 求值出错时，错误会沿调用链逐层收窄这些候选位置。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 源码中的一个点，行列均从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// 行号和列号都大于 0 时有效
    pub fn is_valid(&self) -> bool {
        self.line > 0 && self.column > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.column)
    }
}

/// 源码跨度，起止位置都包含在内
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 从四个坐标创建跨度
    pub fn from_coords(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start: Position::new(start_line, start_col),
            end: Position::new(end_line, end_col),
        }
    }

    /// 单行跨度的便捷构造，`offset` 为起始列，`length` 为字符数
    pub fn on_line(line: usize, offset: usize, length: usize) -> Self {
        Self::from_coords(line, offset, line, offset + length.saturating_sub(1))
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// 当前跨度是否完整包含 `other`
    pub fn encloses(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// 合并为覆盖两者的最小跨度
    pub fn merge(&self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{} - {}:{}]",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}
