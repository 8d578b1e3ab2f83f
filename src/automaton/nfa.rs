//! 非确定有限自动机及其组合子
//!
//! 每个组合子都只产生一个开始状态和一个接受状态，
//! 组合时按偏移量拼接子自动机的状态编号

use serde::{Deserialize, Serialize};

use super::transition::{EdgeGuard, Guard, Transition, VertexGuard};
use crate::core::error::{EvalResult, QueryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nfa {
    pub state_count: usize,
    pub transitions: Vec<Transition>,
    pub start: usize,
    pub accept: usize,
}

impl Nfa {
    /// 单步：新开始状态经一条守卫转移到新接受状态
    pub fn step(guard: Guard) -> Self {
        Self {
            state_count: 2,
            transitions: vec![Transition::guarded(0, 1, guard)],
            start: 0,
            accept: 1,
        }
    }

    pub fn edge_step(guard: EdgeGuard) -> Self {
        Self::step(Guard::Edge(guard))
    }

    pub fn vertex_step(guard: VertexGuard) -> Self {
        Self::step(Guard::Vertex(guard))
    }

    /// 只接受空路径
    pub fn empty() -> Self {
        Self {
            state_count: 1,
            transitions: Vec::new(),
            start: 0,
            accept: 0,
        }
    }

    /// 把 `other` 的状态并入 `self`，返回偏移量
    fn absorb(&mut self, other: Nfa) -> usize {
        let offset = self.state_count;
        self.state_count += other.state_count;
        self.transitions
            .extend(other.transitions.into_iter().map(|t| Transition {
                from: t.from + offset,
                to: t.to + offset,
                guard: t.guard,
            }));
        offset
    }

    fn add_state(&mut self) -> usize {
        self.state_count += 1;
        self.state_count - 1
    }

    /// 顺序组合：前一个的接受状态经 epsilon 连到后一个的开始状态
    pub fn sequence(parts: Vec<Nfa>) -> Self {
        let mut iter = parts.into_iter();
        let Some(mut result) = iter.next() else {
            return Self::empty();
        };
        for part in iter {
            let (start, accept) = (part.start, part.accept);
            let offset = result.absorb(part);
            result
                .transitions
                .push(Transition::epsilon(result.accept, start + offset));
            result.accept = accept + offset;
        }
        result
    }

    /// 选择组合：语言为各分支语言的并
    pub fn alternative(parts: Vec<Nfa>) -> Self {
        let mut result = Self {
            state_count: 2,
            transitions: Vec::new(),
            start: 0,
            accept: 1,
        };
        for part in parts {
            let (start, accept) = (part.start, part.accept);
            let offset = result.absorb(part);
            result
                .transitions
                .push(Transition::epsilon(result.start, start + offset));
            result
                .transitions
                .push(Transition::epsilon(accept + offset, result.accept));
        }
        result
    }

    /// 转置：反转每条转移并交换开始与接受状态
    pub fn transposed(self) -> Self {
        Self {
            state_count: self.state_count,
            transitions: self
                .transitions
                .into_iter()
                .map(|t| Transition {
                    from: t.to,
                    to: t.from,
                    guard: t.guard.map(|g| g.reversed()),
                })
                .collect(),
            start: self.accept,
            accept: self.start,
        }
    }

    /// 迭代：`at_least_once` 为真时是 `p+`，否则是 `p*`
    pub fn iterated(self, at_least_once: bool) -> Self {
        let mut result = Self {
            state_count: 2,
            transitions: Vec::new(),
            start: 0,
            accept: 1,
        };
        let (start, accept) = (self.start, self.accept);
        let offset = result.absorb(self);
        result
            .transitions
            .push(Transition::epsilon(result.start, start + offset));
        result
            .transitions
            .push(Transition::epsilon(accept + offset, result.accept));
        result
            .transitions
            .push(Transition::epsilon(accept + offset, start + offset));
        if !at_least_once {
            result
                .transitions
                .push(Transition::epsilon(result.start, result.accept));
        }
        result
    }

    /// 可选：语言再并上空路径
    pub fn optional(self) -> Self {
        let mut result = Self::alternative(vec![self]);
        result
            .transitions
            .push(Transition::epsilon(result.start, result.accept));
        result
    }

    /// 幂：`n` 个副本的顺序组合
    pub fn exponentiated(self, exponent: u32) -> EvalResult<Self> {
        if exponent == 0 {
            return Err(QueryError::invalid_argument("路径描述的指数必须至少为 1").into());
        }
        let parts = (0..exponent).map(|_| self.clone()).collect();
        Ok(Self::sequence(parts))
    }

    /// 中间顶点：两段路径之间的顶点必须满足 `guard`
    pub fn intermediate_vertex(first: Nfa, guard: VertexGuard, second: Nfa) -> Self {
        Self::sequence(vec![first, Self::vertex_step(guard), second])
    }

    /// 起点限制：新开始状态经顶点守卫进入原开始状态
    pub fn restrict_start(mut self, guard: VertexGuard) -> Self {
        let start = self.add_state();
        self.transitions
            .push(Transition::guarded(start, self.start, Guard::Vertex(guard)));
        self.start = start;
        self
    }

    /// 终点限制：原接受状态经顶点守卫进入新接受状态
    pub fn restrict_goal(mut self, guard: VertexGuard) -> Self {
        let accept = self.add_state();
        self.transitions
            .push(Transition::guarded(self.accept, accept, Guard::Vertex(guard)));
        self.accept = accept;
        self
    }

    /// 从某状态出发的转移
    pub fn outgoing(&self, state: usize) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.from == state)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::vertex_edge_path::EdgeDirection;
    use crate::query::types::TypeRestriction;
    use std::collections::BTreeSet;

    /// 测试用的路径符号：遍历方向与边类名
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Symbol(pub EdgeDirection, pub &'static str);

    fn guard_matches(guard: &Guard, symbol: Symbol) -> bool {
        let edge = match guard {
            Guard::Edge(g) | Guard::ReversedEdge(g) => g,
            Guard::Vertex(_) => return false,
        };
        edge.direction.admits(symbol.0)
            && (edge.types.is_empty() || edge.types.accepted().any(|e| e.name == symbol.1))
    }

    fn closure(nfa: &Nfa, states: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut result = states.clone();
        let mut stack: Vec<usize> = states.iter().copied().collect();
        while let Some(s) = stack.pop() {
            for t in nfa.outgoing(s).filter(|t| t.is_epsilon()) {
                if result.insert(t.to) {
                    stack.push(t.to);
                }
            }
        }
        result
    }

    /// 在符号串上模拟 NFA
    pub(crate) fn accepts(nfa: &Nfa, word: &[Symbol]) -> bool {
        let mut current = closure(nfa, &BTreeSet::from([nfa.start]));
        for &symbol in word {
            let next: BTreeSet<usize> = current
                .iter()
                .flat_map(|&s| nfa.outgoing(s))
                .filter(|t| t.guard.as_ref().is_some_and(|g| guard_matches(g, symbol)))
                .map(|t| t.to)
                .collect();
            current = closure(nfa, &next);
        }
        current.contains(&nfa.accept)
    }

    pub(crate) fn letter(direction: EdgeDirection, class: &str) -> Nfa {
        Nfa::edge_step(
            EdgeGuard::any(direction).with_types(TypeRestriction::new().accept(class)),
        )
    }

    const ALPHABET: [Symbol; 4] = [
        Symbol(EdgeDirection::Out, "A"),
        Symbol(EdgeDirection::Out, "B"),
        Symbol(EdgeDirection::In, "A"),
        Symbol(EdgeDirection::In, "B"),
    ];

    fn words(max_len: usize) -> Vec<Vec<Symbol>> {
        let mut all = vec![vec![]];
        let mut frontier = vec![vec![]];
        for _ in 0..max_len {
            let mut next = Vec::new();
            for w in &frontier {
                for &s in &ALPHABET {
                    let mut longer: Vec<Symbol> = w.clone();
                    longer.push(s);
                    next.push(longer);
                }
            }
            all.extend(next.iter().cloned());
            frontier = next;
        }
        all
    }

    fn fragments() -> Vec<Nfa> {
        vec![
            letter(EdgeDirection::Out, "A"),
            Nfa::sequence(vec![
                letter(EdgeDirection::Out, "A"),
                letter(EdgeDirection::In, "B"),
            ]),
            letter(EdgeDirection::Out, "B").iterated(false),
            Nfa::alternative(vec![
                letter(EdgeDirection::In, "A"),
                letter(EdgeDirection::Out, "B"),
            ]),
        ]
    }

    #[test]
    fn test_sequence_is_concatenation() {
        for a in fragments() {
            for b in fragments() {
                let seq = Nfa::sequence(vec![a.clone(), b.clone()]);
                for w in words(4) {
                    let expected = (0..=w.len())
                        .any(|i| accepts(&a, &w[..i]) && accepts(&b, &w[i..]));
                    assert_eq!(accepts(&seq, &w), expected, "word {:?}", w);
                }
            }
        }
    }

    #[test]
    fn test_alternative_is_union() {
        for a in fragments() {
            for b in fragments() {
                let alt = Nfa::alternative(vec![a.clone(), b.clone()]);
                for w in words(3) {
                    assert_eq!(accepts(&alt, &w), accepts(&a, &w) || accepts(&b, &w));
                }
            }
        }
    }

    #[test]
    fn test_transposed_is_reversal() {
        for a in fragments() {
            let t = a.clone().transposed();
            for w in words(3) {
                let reversed: Vec<Symbol> = w
                    .iter()
                    .rev()
                    .map(|s| Symbol(s.0.reversed(), s.1))
                    .collect();
                assert_eq!(accepts(&t, &w), accepts(&a, &reversed), "word {:?}", w);
            }
        }
    }

    #[test]
    fn test_iteration_and_option() {
        let a = Symbol(EdgeDirection::Out, "A");
        let plus = letter(EdgeDirection::Out, "A").iterated(true);
        assert!(!accepts(&plus, &[]));
        assert!(accepts(&plus, &[a, a, a]));

        let star = letter(EdgeDirection::Out, "A").iterated(false);
        assert!(accepts(&star, &[]));

        let opt = letter(EdgeDirection::Out, "A").optional();
        assert!(accepts(&opt, &[]));
        assert!(accepts(&opt, &[a]));
        assert!(!accepts(&opt, &[a, a]));
    }

    #[test]
    fn test_exponentiation() {
        let a = Symbol(EdgeDirection::Out, "A");
        let cube = letter(EdgeDirection::Out, "A")
            .exponentiated(3)
            .expect("构造幂路径失败");
        assert!(accepts(&cube, &[a, a, a]));
        assert!(!accepts(&cube, &[a, a]));
        assert!(letter(EdgeDirection::Out, "A").exponentiated(0).is_err());
    }
}
