//! 图模式
//!
//! 顶点类与边类构成的继承层次，以及按名字解析后的类型集合

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::error::{EvalError, EvalResult};
use crate::query::types::TypeRestriction;

/// 模式中的类标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge,
}

/// 类定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ElementKind,
    pub supers: Vec<ClassId>,
    /// 边类起点一端的角色名
    pub alpha_role: Option<String>,
    /// 边类终点一端的角色名
    pub omega_role: Option<String>,
}

/// 图模式：类的集合及其继承关系
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex_class(&mut self, name: &str, supers: &[&str]) -> EvalResult<ClassId> {
        self.add_class(name, ElementKind::Vertex, supers, None, None)
    }

    pub fn add_edge_class(
        &mut self,
        name: &str,
        supers: &[&str],
        alpha_role: Option<&str>,
        omega_role: Option<&str>,
    ) -> EvalResult<ClassId> {
        self.add_class(
            name,
            ElementKind::Edge,
            supers,
            alpha_role.map(str::to_string),
            omega_role.map(str::to_string),
        )
    }

    fn add_class(
        &mut self,
        name: &str,
        kind: ElementKind,
        supers: &[&str],
        alpha_role: Option<String>,
        omega_role: Option<String>,
    ) -> EvalResult<ClassId> {
        if self.by_name.contains_key(name) {
            return Err(EvalError::internal(format!("类 {} 重复定义", name)));
        }
        let supers = supers
            .iter()
            .map(|s| {
                self.class_by_name(s)
                    .ok_or_else(|| EvalError::UnknownType(s.to_string()))
            })
            .collect::<EvalResult<Vec<_>>>()?;

        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassInfo {
            name: name.to_string(),
            kind,
            supers,
            alpha_role,
            omega_role,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn class(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.0 as usize)
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        self.class(id).map(|c| c.name.as_str()).unwrap_or("?")
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassInfo)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// `sub` 是否为 `sup` 或其（传递）子类
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        let mut stack = vec![sub];
        let mut seen = vec![false; self.classes.len()];
        while let Some(current) = stack.pop() {
            let Some(info) = self.class(current) else {
                continue;
            };
            for &parent in &info.supers {
                if parent == sup {
                    return true;
                }
                let idx = parent.0 as usize;
                if idx < seen.len() && !seen[idx] {
                    seen[idx] = true;
                    stack.push(parent);
                }
            }
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ResolvedEntry {
    class: ClassId,
    exact: bool,
}

impl ResolvedEntry {
    fn matches(&self, schema: &Schema, class: ClassId) -> bool {
        if self.exact {
            self.class == class
        } else {
            schema.is_subclass(class, self.class)
        }
    }
}

/// 已按模式解析的类型集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypeCollection {
    allowed: Vec<ResolvedEntry>,
    forbidden: Vec<ResolvedEntry>,
}

impl TypeCollection {
    /// 接受一切类型的集合
    pub fn all() -> Self {
        Self::default()
    }

    /// 解析类型限制；模式中不存在的类名报 `UnknownType`
    pub fn resolve(restriction: &TypeRestriction, schema: &Schema) -> EvalResult<Self> {
        let mut collection = Self::default();
        for entry in &restriction.entries {
            let class = schema
                .class_by_name(&entry.name)
                .ok_or_else(|| EvalError::UnknownType(entry.name.clone()))?;
            let resolved = ResolvedEntry {
                class,
                exact: entry.exact,
            };
            if entry.excluded {
                collection.forbidden.push(resolved);
            } else {
                collection.allowed.push(resolved);
            }
        }
        Ok(collection)
    }

    pub fn accepts(&self, schema: &Schema, class: ClassId) -> bool {
        if self.forbidden.iter().any(|e| e.matches(schema, class)) {
            return false;
        }
        self.allowed.is_empty() || self.allowed.iter().any(|e| e.matches(schema, class))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_empty() && self.forbidden.is_empty()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}
