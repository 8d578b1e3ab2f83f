//! 类型限制
//!
//! 查询中以名字书写的类型限制，例如 `{Person, ^Robot!}`。
//! 名字到模式类的解析推迟到求值时进行，见 `graph::schema::TypeCollection`

use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个类型限制项
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    /// 只匹配该类本身，不包含子类
    pub exact: bool,
    /// 排除而非接受
    pub excluded: bool,
}

/// 一组类型限制项
///
/// 没有任何接受项时接受所有类型（再减去排除项）
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRestriction {
    pub entries: Vec<TypeEntry>,
}

impl TypeRestriction {
    pub fn new() -> Self {
        Self::default()
    }

    /// 接受 `name` 及其子类
    pub fn accept(mut self, name: impl Into<String>) -> Self {
        self.entries.push(TypeEntry {
            name: name.into(),
            exact: false,
            excluded: false,
        });
        self
    }

    /// 只接受 `name` 本身
    pub fn accept_exact(mut self, name: impl Into<String>) -> Self {
        self.entries.push(TypeEntry {
            name: name.into(),
            exact: true,
            excluded: false,
        });
        self
    }

    /// 排除 `name` 及其子类
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.entries.push(TypeEntry {
            name: name.into(),
            exact: false,
            excluded: true,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn accepted(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter().filter(|e| !e.excluded)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &TypeEntry> {
        self.entries.iter().filter(|e| e.excluded)
    }
}

impl fmt::Display for TypeRestriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if entry.excluded {
                write!(f, "^")?;
            }
            write!(f, "{}", entry.name)?;
            if entry.exact {
                write!(f, "!")?;
            }
        }
        write!(f, "}}")
    }
}
