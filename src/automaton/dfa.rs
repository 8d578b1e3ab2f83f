//! 确定化
//!
//! 基于 epsilon 闭包的子集构造。每个 DFA 状态对应一个 NFA 状态集合，
//! 从它出发、守卫相同的 NFA 转移合并成一条 DFA 转移。
//!
//! 守卫不同但可能同时满足的转移（例如 `-->` 与 `-->{Road}`）无法在构造时
//! 区分，搜索时把一条边满足的全部守卫的目标集合取并集，再经
//! [`Dfa::find`] / [`Dfa::subset_state`] 归到唯一的子集状态

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

use super::nfa::Nfa;
use super::transition::Guard;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfaTransition {
    pub guard: Guard,
    /// 目标 NFA 状态集合，已取 epsilon 闭包
    pub targets: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfaState {
    pub nfa_states: BTreeSet<usize>,
    pub accepting: bool,
    pub transitions: Vec<DfaTransition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dfa {
    pub states: Vec<DfaState>,
    pub start: usize,
    accept: usize,
    /// 每个 NFA 状态出发的带守卫转移：(守卫, 目标的 epsilon 闭包)
    moves: Vec<Vec<(Guard, BTreeSet<usize>)>>,
    index: HashMap<BTreeSet<usize>, usize>,
}

fn epsilon_closure(nfa: &Nfa, adjacency: &[Vec<usize>], seeds: BTreeSet<usize>) -> BTreeSet<usize> {
    let mut closure = seeds;
    let mut stack: Vec<usize> = closure.iter().copied().collect();
    while let Some(state) = stack.pop() {
        for &ti in &adjacency[state] {
            let t = &nfa.transitions[ti];
            if t.is_epsilon() && closure.insert(t.to) {
                stack.push(t.to);
            }
        }
    }
    closure
}

impl Dfa {
    /// 构造从开始状态出发、每次只满足一个守卫时可达的全部子集状态
    pub fn from_nfa(nfa: &Nfa) -> Self {
        let mut adjacency = vec![Vec::new(); nfa.state_count];
        for (i, t) in nfa.transitions.iter().enumerate() {
            adjacency[t.from].push(i);
        }
        let moves = adjacency
            .iter()
            .map(|outgoing| {
                outgoing
                    .iter()
                    .filter_map(|&ti| {
                        let t = &nfa.transitions[ti];
                        let guard = t.guard.clone()?;
                        Some((guard, epsilon_closure(nfa, &adjacency, BTreeSet::from([t.to]))))
                    })
                    .collect()
            })
            .collect();

        let start_set = epsilon_closure(nfa, &adjacency, BTreeSet::from([nfa.start]));
        let mut dfa = Self {
            states: Vec::new(),
            start: 0,
            accept: nfa.accept,
            moves,
            index: HashMap::new(),
        };

        let mut queue = VecDeque::new();
        dfa.insert(start_set);
        queue.push_back(0usize);
        while let Some(current) = queue.pop_front() {
            let targets: Vec<BTreeSet<usize>> = dfa.states[current]
                .transitions
                .iter()
                .map(|t| t.targets.clone())
                .collect();
            for set in targets {
                if !dfa.index.contains_key(&set) {
                    queue.push_back(dfa.insert(set));
                }
            }
        }

        log::debug!(
            "确定化完成: {} 个 NFA 状态 -> {} 个 DFA 状态",
            nfa.state_count,
            dfa.states.len()
        );
        dfa
    }

    fn insert(&mut self, set: BTreeSet<usize>) -> usize {
        let id = self.states.len();
        self.index.insert(set.clone(), id);
        let state = self.subset_state(set);
        self.states.push(state);
        id
    }

    /// 任意 NFA 状态集合对应的 DFA 状态，守卫相同的转移合并，保持首次出现的顺序
    pub fn subset_state(&self, set: BTreeSet<usize>) -> DfaState {
        let mut transitions: Vec<DfaTransition> = Vec::new();
        for &s in &set {
            let Some(moves) = self.moves.get(s) else {
                continue;
            };
            for (guard, targets) in moves {
                match transitions.iter_mut().find(|t| &t.guard == guard) {
                    Some(t) => t.targets.extend(targets.iter().copied()),
                    None => transitions.push(DfaTransition {
                        guard: guard.clone(),
                        targets: targets.clone(),
                    }),
                }
            }
        }
        DfaState {
            accepting: set.contains(&self.accept),
            nfa_states: set,
            transitions,
        }
    }

    /// 已构造的子集状态编号
    pub fn find(&self, set: &BTreeSet<usize>) -> Option<usize> {
        self.index.get(set).copied()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn is_accepting(&self, state: usize) -> bool {
        self.states.get(state).is_some_and(|s| s.accepting)
    }

    pub fn transitions(&self, state: usize) -> &[DfaTransition] {
        self.states
            .get(state)
            .map(|s| s.transitions.as_slice())
            .unwrap_or(&[])
    }
}
