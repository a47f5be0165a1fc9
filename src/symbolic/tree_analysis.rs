//! # Tree Analysis Module
//!
//! Traversal and generic rewriting of [`Entity`] trees, plus the flatten/group/rebuild
//! helpers the canonical-sort and optimize rules are assembled from.
//!
//! ## Traversal
//! - `iter()` - depth-first pre-order enumeration (node, then its descendants left to right)
//! - `replace(transform)` - bottom-up rewrite; children first, then the rebuilt node itself
//! - `substitute(x, value)` / `substitute_all(map)` - structural replacement
//! - `contains(x)` - O(1) for plain variables, linear scan otherwise
//!
//! ## Flatten / group / rebuild
//! - `linear_summands()` flattens nested `Sum`/`Difference` nodes, a subtrahend `t`
//!   becomes `-1 * t`
//! - `linear_factors()` flattens nested `Product`/`Quotient` nodes, a divisor `t`
//!   becomes `t ^ -1`
//! - `groups_by_level()` splits terms into groups of equal [`SortLevel`] keys, in the order
//!   of their first occurrence; `group_by_level()` is the same reordering as one flat list
//! - `multi_hang_linear()` rebuilds a left-leaning chain, `multi_hang_binary()` a balanced tree

use crate::symbolic::constants::ConstantRegistry;
use crate::symbolic::symbolic_engine::{Entity, EntityKind};
use itertools::Itertools;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use strum_macros::{Display, EnumIter, EnumString};

/// How aggressively the canonical sort treats two terms as "the same kind".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum SortLevel {
    /// full structural hash
    #[strum(serialize = "exact")]
    Exact,
    /// structural hash with numeric literal values erased
    #[strum(serialize = "shape")]
    Shape,
    /// sorted set of free variables
    #[strum(serialize = "loose")]
    Loose,
}

/// Depth-first pre-order iterator over a tree.
pub struct PreOrder {
    stack: Vec<Entity>,
}

impl Iterator for PreOrder {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let node = self.stack.pop()?;
        self.stack
            .extend(node.direct_children().iter().rev().cloned());
        Some(node)
    }
}

impl Entity {
    //___________________________________TRAVERSAL____________________________________

    pub fn iter(&self) -> PreOrder {
        PreOrder {
            stack: vec![self.clone()],
        }
    }

    /// Bottom-up rewrite. Nodes whose children all come back unchanged are reused as they are,
    /// so a no-op transform returns a pointer-equal tree.
    pub fn replace(&self, transform: impl Fn(&Entity) -> Entity) -> Entity {
        self.replace_with(&transform)
    }

    fn replace_with<F: Fn(&Entity) -> Entity + ?Sized>(&self, transform: &F) -> Entity {
        let children = self.direct_children();
        if children.is_empty() {
            return transform(self);
        }
        let new_children: Vec<Entity> = children
            .iter()
            .map(|child| child.replace_with(transform))
            .collect();
        let unchanged = new_children
            .iter()
            .zip(children)
            .all(|(new, old)| new.ptr_eq(old));
        let rebuilt = if unchanged {
            self.clone()
        } else {
            self.with_children(&new_children)
        };
        transform(&rebuilt)
    }

    /// Replaces every subtree structurally equal to `x` with `value`.
    pub fn substitute(&self, x: &Entity, value: &Entity) -> Entity {
        self.replace(|node| {
            if node == x {
                value.clone()
            } else {
                node.clone()
            }
        })
    }

    pub fn substitute_all(&self, replacements: &HashMap<Entity, Entity>) -> Entity {
        if replacements.is_empty() {
            return self.clone();
        }
        self.replace(|node| match replacements.get(node) {
            Some(value) => value.clone(),
            None => node.clone(),
        })
    }

    /// Plain variables are looked up in the cached free-variable set; anything else
    /// (including reserved constants) is found by a structural scan.
    pub fn contains(&self, x: &Entity) -> bool {
        match x.kind() {
            EntityKind::Var(name) if !ConstantRegistry::global().is_reserved(name) => {
                self.free_variables().contains(name)
            }
            _ => self.iter().any(|node| node == *x),
        }
    }

    /// No free variables and no calculus or tensor nodes.
    pub fn can_be_evaluated(&self) -> bool {
        self.free_variables().is_empty()
            && !self.iter().any(|node| {
                matches!(
                    node.kind(),
                    EntityKind::Derivative(..)
                        | EntityKind::Integral(..)
                        | EntityKind::Limit(..)
                        | EntityKind::Tensor { .. }
                )
            })
    }

    //___________________________________SORT KEYS____________________________________

    pub fn sort_key(&self, level: SortLevel) -> u64 {
        let mut hasher = DefaultHasher::new();
        match level {
            SortLevel::Exact => self.hash(&mut hasher),
            SortLevel::Shape => self.hash_shape(&mut hasher),
            SortLevel::Loose => {
                for name in self.free_variables() {
                    name.hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    fn hash_shape<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self.kind()).hash(state);
        match self.kind() {
            EntityKind::Num(_) => {}
            EntityKind::Var(name) => name.hash(state),
            EntityKind::Derivative(_, _, order) | EntityKind::Integral(_, _, order) => {
                order.hash(state)
            }
            EntityKind::Limit(_, _, _, approach) => approach.hash(state),
            EntityKind::Tensor { shape, .. } => shape.hash(state),
            _ => {}
        }
        for child in self.direct_children() {
            child.hash_shape(state);
        }
    }

    //___________________________________FLATTEN____________________________________

    /// Terms of a nested `Sum`/`Difference` chain.
    pub fn linear_summands(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        flatten_sum(self, false, &mut out);
        out
    }

    /// Factors of a nested `Product`/`Quotient` chain.
    pub fn linear_factors(&self) -> Vec<Entity> {
        let mut out = Vec::new();
        flatten_product(self, false, &mut out);
        out
    }
}

fn flatten_sum(expr: &Entity, negate: bool, out: &mut Vec<Entity>) {
    match expr.kind() {
        EntityKind::Sum(a, b) => {
            flatten_sum(a, negate, out);
            flatten_sum(b, negate, out);
        }
        EntityKind::Difference(a, b) => {
            flatten_sum(a, negate, out);
            flatten_sum(b, !negate, out);
        }
        _ if negate => out.push(-expr),
        _ => out.push(expr.clone()),
    }
}

fn flatten_product(expr: &Entity, invert: bool, out: &mut Vec<Entity>) {
    match expr.kind() {
        EntityKind::Product(a, b) => {
            flatten_product(a, invert, out);
            flatten_product(b, invert, out);
        }
        EntityKind::Quotient(a, b) => {
            flatten_product(a, invert, out);
            flatten_product(b, !invert, out);
        }
        _ if invert => out.push(expr.pow(&Entity::int(-1))),
        _ => out.push(expr.clone()),
    }
}

/// Splits terms into runs of equal `level` keys. Groups appear in the order of their first
/// member and keep the relative order of their members.
pub fn groups_by_level(terms: &[Entity], level: SortLevel) -> Vec<Vec<Entity>> {
    let keys: Vec<u64> = terms.iter().map(|term| term.sort_key(level)).collect();
    let mut first_seen: HashMap<u64, usize> = HashMap::new();
    for key in &keys {
        let next = first_seen.len();
        first_seen.entry(*key).or_insert(next);
    }
    let chunks = terms
        .iter()
        .zip(keys)
        .sorted_by_key(|(_, key)| first_seen[key])
        .chunk_by(|(_, key)| *key);
    let groups: Vec<Vec<Entity>> = chunks
        .into_iter()
        .map(|(_, group)| group.map(|(term, _)| term.clone()).collect())
        .collect();
    groups
}

/// Stable reordering that makes terms with equal keys adjacent.
pub fn group_by_level(terms: &[Entity], level: SortLevel) -> Vec<Entity> {
    groups_by_level(terms, level).concat()
}

/// Left-leaning chain `((t0 op t1) op t2) ...`; `None` for an empty list.
pub fn multi_hang_linear(
    terms: &[Entity],
    join: impl Fn(&Entity, &Entity) -> Entity,
) -> Option<Entity> {
    let (first, rest) = terms.split_first()?;
    Some(rest.iter().fold(first.clone(), |acc, term| join(&acc, term)))
}

/// Balanced binary tree over the terms, preserving their order; `None` for an empty list.
pub fn multi_hang_binary(
    terms: &[Entity],
    join: &impl Fn(&Entity, &Entity) -> Entity,
) -> Option<Entity> {
    match terms.len() {
        0 => None,
        1 => Some(terms[0].clone()),
        n => {
            let (left, right) = terms.split_at(n / 2);
            Some(join(
                &multi_hang_binary(left, join)?,
                &multi_hang_binary(right, join)?,
            ))
        }
    }
}

/// Distinct variable names in order of first appearance, pre-order.
pub fn variables_in_order(expr: &Entity) -> Vec<String> {
    let mut seen = HashSet::new();
    expr.iter()
        .filter_map(|node| node.as_var().map(str::to_string))
        .filter(|name| !ConstantRegistry::global().is_reserved(name))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
