//! A generic name-prefix trie backing both the FIB and Measurements tables'
//! longest-prefix-match lookups.
//!
//! Each node corresponds to one name component on the path from the root
//! (the empty name `/`); a node may or may not hold a `V` payload — nodes
//! without one exist purely as waypoints on the way to a deeper node that
//! does (mirroring NFD's NameTree, where a node can exist for a PIT entry's
//! bucket without an associated FIB/Measurements entry). Parent links are
//! `Weak` so a node with no payload, no children, and no referring table
//! entry is free to be pruned without creating a cycle.

use rust_udcn_common::ndn::{Name, NameComponent};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub struct Node<V> {
    pub value: Option<V>,
    children: HashMap<NameComponent, Rc<RefCell<Node<V>>>>,
    parent: Option<Weak<RefCell<Node<V>>>>,
}

impl<V> Node<V> {
    fn new(parent: Option<Weak<RefCell<Node<V>>>>) -> Self {
        Self {
            value: None,
            children: HashMap::new(),
            parent,
        }
    }

    pub fn parent(&self) -> Option<Rc<RefCell<Node<V>>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_leaf_without_value(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }
}

pub struct NameTree<V> {
    root: Rc<RefCell<Node<V>>>,
}

impl<V> NameTree<V> {
    pub fn new() -> Self {
        Self {
            root: Rc::new(RefCell::new(Node::new(None))),
        }
    }

    pub fn root(&self) -> Rc<RefCell<Node<V>>> {
        self.root.clone()
    }

    /// Returns the node for `name`, creating intermediate nodes (without a
    /// value) along the way if absent.
    pub fn get_or_insert(&self, name: &Name) -> Rc<RefCell<Node<V>>> {
        let mut current = self.root.clone();
        for component in name.components() {
            let next = {
                let mut node = current.borrow_mut();
                node.children
                    .entry(component.clone())
                    .or_insert_with(|| {
                        Rc::new(RefCell::new(Node::new(Some(Rc::downgrade(&current)))))
                    })
                    .clone()
            };
            current = next;
        }
        current
    }

    /// Returns the node for `name` if it exists, without creating it.
    pub fn get(&self, name: &Name) -> Option<Rc<RefCell<Node<V>>>> {
        let mut current = self.root.clone();
        for component in name.components() {
            let next = current.borrow().children.get(component).cloned()?;
            current = next;
        }
        Some(current)
    }

    /// Walks from the root toward `name`, returning the deepest node
    /// encountered whose `value` satisfies `predicate`. Stops descending
    /// once the trie has no further matching child.
    pub fn longest_prefix_match(
        &self,
        name: &Name,
        predicate: impl Fn(&V) -> bool,
    ) -> Option<Rc<RefCell<Node<V>>>> {
        let mut current = self.root.clone();
        let mut best: Option<Rc<RefCell<Node<V>>>> = None;
        if current.borrow().value.as_ref().is_some_and(&predicate) {
            best = Some(current.clone());
        }
        for component in name.components() {
            let next = current.borrow().children.get(component).cloned();
            match next {
                Some(node) => {
                    if node.borrow().value.as_ref().is_some_and(&predicate) {
                        best = Some(node.clone());
                    }
                    current = node;
                }
                None => break,
            }
        }
        best
    }

    /// Removes `name`'s node if it has no value and no children, then walks
    /// up pruning any now-empty ancestors (but never the root).
    pub fn erase(&self, name: &Name) {
        let Some(node) = self.get(name) else { return };
        self.prune_upward(node, name);
    }

    fn prune_upward(&self, node: Rc<RefCell<Node<V>>>, name: &Name) {
        if !node.borrow().is_leaf_without_value() {
            return;
        }
        if name.is_empty() {
            return; // never prune the root
        }
        let last = name.get(name.len() - 1).expect("name has at least one component");
        let parent_name = name.prefix(name.len() - 1);
        if let Some(parent) = node.borrow().parent() {
            parent.borrow_mut().children.remove(last);
            self.prune_upward(parent, &parent_name);
        }
    }
}

impl<V> Default for NameTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_insert_creates_path() {
        let tree: NameTree<u32> = NameTree::new();
        let node = tree.get_or_insert(&Name::from_string("/a/b/c"));
        node.borrow_mut().value = Some(42);
        assert_eq!(
            tree.get(&Name::from_string("/a/b/c")).unwrap().borrow().value,
            Some(42)
        );
    }

    #[test]
    fn get_returns_none_for_absent_path() {
        let tree: NameTree<u32> = NameTree::new();
        tree.get_or_insert(&Name::from_string("/a/b"));
        assert!(tree.get(&Name::from_string("/a/b/c")).is_none());
    }

    #[test]
    fn longest_prefix_match_finds_deepest_valued_ancestor() {
        let tree: NameTree<u32> = NameTree::new();
        tree.get_or_insert(&Name::from_string("/a")).borrow_mut().value = Some(1);
        tree.get_or_insert(&Name::from_string("/a/b/c")).borrow_mut().value = Some(3);
        // /a/b has no value: an intermediate waypoint only.

        let found = tree
            .longest_prefix_match(&Name::from_string("/a/b/c/d"), |_| true)
            .unwrap();
        assert_eq!(found.borrow().value, Some(3));

        let found = tree
            .longest_prefix_match(&Name::from_string("/a/b"), |_| true)
            .unwrap();
        assert_eq!(found.borrow().value, Some(1));
    }

    #[test]
    fn longest_prefix_match_respects_predicate() {
        let tree: NameTree<u32> = NameTree::new();
        tree.get_or_insert(&Name::from_string("/a")).borrow_mut().value = Some(1);
        tree.get_or_insert(&Name::from_string("/a/b")).borrow_mut().value = Some(2);

        let found = tree
            .longest_prefix_match(&Name::from_string("/a/b"), |v| *v < 2)
            .unwrap();
        assert_eq!(found.borrow().value, Some(1));
    }

    #[test]
    fn longest_prefix_match_on_empty_tree_returns_none() {
        let tree: NameTree<u32> = NameTree::new();
        assert!(tree
            .longest_prefix_match(&Name::from_string("/a/b"), |_| true)
            .is_none());
    }

    #[test]
    fn erase_prunes_empty_ancestors_but_not_root() {
        let tree: NameTree<u32> = NameTree::new();
        tree.get_or_insert(&Name::from_string("/a/b")).borrow_mut().value = Some(1);
        tree.erase(&Name::from_string("/a/b"));
        assert!(tree.get(&Name::from_string("/a/b")).is_none());
        assert!(tree.get(&Name::from_string("/a")).is_none());
        // root is always reachable
        assert!(tree.get(&Name::from_string("/")).is_some() || Name::from_string("/").is_empty());
    }

    #[test]
    fn erase_keeps_ancestor_with_value_or_other_children() {
        let tree: NameTree<u32> = NameTree::new();
        tree.get_or_insert(&Name::from_string("/a")).borrow_mut().value = Some(1);
        tree.get_or_insert(&Name::from_string("/a/b")).borrow_mut().value = Some(2);
        tree.erase(&Name::from_string("/a/b"));
        assert!(tree.get(&Name::from_string("/a")).is_some());
    }

    #[test]
    fn parent_upgrades_to_ancestor_node() {
        let tree: NameTree<u32> = NameTree::new();
        let child = tree.get_or_insert(&Name::from_string("/a/b"));
        let parent = child.borrow().parent().unwrap();
        assert!(tree
            .get(&Name::from_string("/a"))
            .is_some_and(|n| Rc::ptr_eq(&n, &parent)));
    }
}
