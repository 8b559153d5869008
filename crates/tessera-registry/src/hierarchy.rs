//! Class hierarchy queries.
//!
//! Classes form a DAG through their `parents` lists (multiple inheritance is
//! allowed). Queries here walk that DAG breadth-first so "distance" means the
//! shortest inheritance path.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::warn;

use tessera_core::ItemId;

use crate::EntityGraph;

impl EntityGraph {
    /// Whether `ancestor` is a (transitive) parent of `class`.
    ///
    /// A class is not its own parent.
    pub fn has_parent(&self, class: ItemId, ancestor: ItemId) -> bool {
        self.inheritance_distance(class, ancestor)
            .is_some_and(|d| d > 0)
    }

    /// Length of the shortest parent path from `class` to `ancestor`.
    ///
    /// Zero when they are the same class, `None` when unrelated.
    pub fn inheritance_distance(&self, class: ItemId, ancestor: ItemId) -> Option<u32> {
        if class == ancestor {
            return Some(0);
        }
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([(class, 0u32)]);
        seen.insert(class);
        while let Some((current, depth)) = queue.pop_front() {
            let Some(entity) = self.class(current) else {
                continue;
            };
            for &parent in &entity.parents {
                if parent == ancestor {
                    return Some(depth + 1);
                }
                if seen.insert(parent) {
                    queue.push_back((parent, depth + 1));
                } else if parent == class {
                    warn!(class = %self.item(class).name(), "inheritance cycle");
                }
            }
        }
        None
    }

    /// Every ancestor of `class`, nearest first, each listed once.
    pub fn ancestors(&self, class: ItemId) -> Vec<ItemId> {
        let mut seen = FxHashSet::default();
        seen.insert(class);
        let mut order = Vec::new();
        let mut queue = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            let Some(entity) = self.class(current) else {
                continue;
            };
            for &parent in &entity.parents {
                if seen.insert(parent) {
                    order.push(parent);
                    queue.push_back(parent);
                }
            }
        }
        order
    }

    /// `class` followed by its ancestors.
    pub fn class_and_ancestors(&self, class: ItemId) -> Vec<ItemId> {
        let mut all = vec![class];
        all.extend(self.ancestors(class));
        all
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{Class, ItemHeader, ItemKind, ScopeOwner};

    use super::*;

    fn class(graph: &mut EntityGraph, name: &str, parents: &[ItemId]) -> ItemId {
        let module = tessera_core::ModuleId::new(0);
        let root = graph.module(module).scope;
        let scope = graph.new_scope(root, ScopeOwner::Block);
        let mut entity = Class::new(scope);
        entity.parents = parents.to_vec();
        let id = graph.add_item(ItemHeader::new(name, root, module), ItemKind::Class(entity));
        graph.set_scope_owner(scope, ScopeOwner::Class(id));
        id
    }

    fn chain() -> (EntityGraph, ItemId, ItemId, ItemId) {
        let mut graph = EntityGraph::new();
        graph.new_module("main", "main.tsr", "");
        let c = class(&mut graph, "C", &[]);
        let b = class(&mut graph, "B", &[c]);
        let a = class(&mut graph, "A", &[b]);
        (graph, a, b, c)
    }

    #[test]
    fn distances_follow_the_chain() {
        let (graph, a, b, c) = chain();
        assert_eq!(graph.inheritance_distance(a, a), Some(0));
        assert_eq!(graph.inheritance_distance(a, b), Some(1));
        assert_eq!(graph.inheritance_distance(a, c), Some(2));
        assert_eq!(graph.inheritance_distance(c, a), None);
    }

    #[test]
    fn has_parent_is_strict() {
        let (graph, a, _, c) = chain();
        assert!(graph.has_parent(a, c));
        assert!(!graph.has_parent(a, a));
        assert!(!graph.has_parent(c, a));
    }

    #[test]
    fn diamond_is_listed_once() {
        let mut graph = EntityGraph::new();
        graph.new_module("main", "main.tsr", "");
        let base = class(&mut graph, "Base", &[]);
        let left = class(&mut graph, "Left", &[base]);
        let right = class(&mut graph, "Right", &[base]);
        let bottom = class(&mut graph, "Bottom", &[left, right]);
        assert_eq!(graph.ancestors(bottom), vec![left, right, base]);
        assert_eq!(graph.inheritance_distance(bottom, base), Some(2));
    }
}
